//! Observation packets
//!
//! A packet is what the driver hands to the record consumer after each
//! successful poll: the remapped observations plus a timestamp and the unit
//! system they are expressed in.

use crate::config::SensorMap;
use crate::core::protocol::{Observations, UnitSystem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single observation packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Seconds since the Unix epoch, rounded
    pub timestamp: i64,
    /// Unit system of all values
    pub unit_system: UnitSystem,
    /// Field name to value; `None` when the station had no valid reading
    #[serde(flatten)]
    pub fields: BTreeMap<String, Option<f64>>,
}

impl Packet {
    /// Build a packet from parsed observations, renaming them through `map`
    pub fn from_observations(data: &Observations, map: &SensorMap, now: DateTime<Utc>) -> Self {
        let fields = data
            .iter()
            .map(|(name, value)| (map.field_for(name).to_string(), *value))
            .collect();

        Self {
            timestamp: round_to_seconds(now),
            unit_system: UnitSystem::MetricWx,
            fields,
        }
    }

    /// Value of a field, `None` when missing or invalid
    pub fn value(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied().flatten()
    }

    /// Whether the packet carries a field, valid or not
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

fn round_to_seconds(now: DateTime<Utc>) -> i64 {
    (now.timestamp_millis() + 500).div_euclid(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn observations() -> Observations {
        let mut data = Observations::new();
        data.insert("temperature", Some(16.0));
        data.insert("wind_dir_min", None);
        data.insert("rain_duration", Some(0.0));
        data
    }

    #[test]
    fn test_fields_are_remapped() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let packet = Packet::from_observations(&observations(), &SensorMap::default(), now);

        assert_eq!(packet.timestamp, 1_700_000_000);
        assert_eq!(packet.unit_system, UnitSystem::MetricWx);
        assert_eq!(packet.value("outTemp"), Some(16.0));
        assert!(packet.contains("wind_dir_min"));
        assert_eq!(packet.value("wind_dir_min"), None);
        assert_eq!(packet.value("rain_duration"), Some(0.0));
        assert!(!packet.contains("temperature"));
    }

    #[test]
    fn test_timestamp_rounds_to_nearest_second() {
        let early = Utc.timestamp_millis_opt(1_700_000_000_499).unwrap();
        let late = Utc.timestamp_millis_opt(1_700_000_000_500).unwrap();
        assert_eq!(round_to_seconds(early), 1_700_000_000);
        assert_eq!(round_to_seconds(late), 1_700_000_001);
    }

    #[test]
    fn test_serializes_flat() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let packet = Packet::from_observations(&observations(), &SensorMap::empty(), now);
        let json = serde_json::to_value(&packet).unwrap();

        assert_eq!(json["timestamp"], 1_700_000_000);
        assert_eq!(json["unit_system"], "METRICWX");
        assert_eq!(json["temperature"], 16.0);
        assert!(json["wind_dir_min"].is_null());
    }
}
