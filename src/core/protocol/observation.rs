//! Observation abbreviations
//!
//! Every field in a data message is keyed by a two letter abbreviation.
//! [`OBSERVATIONS`] is the one place that says which abbreviations the
//! driver understands and what they are called once decoded.

/// Abbreviation to canonical observation name.
///
/// Grouped by the message that normally carries the field.
pub const OBSERVATIONS: &[(&[u8], &str)] = &[
    // aR1: wind message
    (b"Dn", "wind_dir_min"),
    (b"Dm", "wind_dir_avg"),
    (b"Dx", "wind_dir_max"),
    (b"Sn", "wind_speed_min"),
    (b"Sm", "wind_speed_avg"),
    (b"Sx", "wind_speed_max"),
    // aR2: pressure, temperature, humidity message
    (b"Ta", "temperature"),
    (b"Ua", "humidity"),
    (b"Pa", "pressure"),
    // aR3: precipitation message
    (b"Rc", "rain"),
    (b"Rd", "rain_duration"),
    (b"Ri", "rain_intensity"),
    (b"Hc", "hail"),
    (b"Hd", "hail_duration"),
    (b"Hi", "hail_intensity"),
    (b"Rp", "rain_intensity_peak"),
    (b"Hp", "hail_intensity_peak"),
    // aR5: supervisor message
    (b"Th", "heating_temperature"),
    (b"Vh", "heating_voltage"),
    (b"Vs", "supply_voltage"),
    (b"Vr", "reference_voltage"),
    (b"Id", "information"),
];

/// Abbreviation of the free-text station information field
pub const INFORMATION: &[u8] = b"Id";

/// Look up the canonical name for an abbreviation
pub fn lookup(abbr: &[u8]) -> Option<&'static str> {
    OBSERVATIONS
        .iter()
        .find(|(a, _)| *a == abbr)
        .map(|(_, name)| *name)
}

/// Semantic category that decides how a unit tag is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Air or heater temperature
    Temperature,
    /// Wind speed
    WindSpeed,
    /// Barometric pressure
    Pressure,
    /// Rain accumulation, duration and intensity
    Rain,
    /// Hail accumulation, duration and intensity
    Hail,
}

impl Category {
    /// Category of a canonical observation name, if it has one.
    ///
    /// Directions, humidity and voltages have no category and are never
    /// unit-converted.
    pub fn of(name: &str) -> Option<Self> {
        if name.contains("temperature") {
            Some(Self::Temperature)
        } else if name.contains("wind_speed") {
            Some(Self::WindSpeed)
        } else if name.contains("pressure") {
            Some(Self::Pressure)
        } else if name.contains("rain") {
            Some(Self::Rain)
        } else if name.contains("hail") {
            Some(Self::Hail)
        } else {
            None
        }
    }
}

/// Whether a rain or hail field measures time rather than amount
pub fn is_duration(name: &str) -> bool {
    name.contains("duration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(b"Dm"), Some("wind_dir_avg"));
        assert_eq!(lookup(b"Ta"), Some("temperature"));
        assert_eq!(lookup(b"Rc"), Some("rain"));
        assert_eq!(lookup(b"Xx"), None);
        assert_eq!(lookup(b"ta"), None);
    }

    #[test]
    fn test_table_is_one_to_one() {
        for (i, (abbr, name)) in OBSERVATIONS.iter().enumerate() {
            assert_eq!(abbr.len(), 2);
            for (other_abbr, other_name) in &OBSERVATIONS[i + 1..] {
                assert_ne!(abbr, other_abbr);
                assert_ne!(name, other_name);
            }
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(Category::of("temperature"), Some(Category::Temperature));
        assert_eq!(Category::of("heating_temperature"), Some(Category::Temperature));
        assert_eq!(Category::of("wind_speed_max"), Some(Category::WindSpeed));
        assert_eq!(Category::of("pressure"), Some(Category::Pressure));
        assert_eq!(Category::of("rain_intensity_peak"), Some(Category::Rain));
        assert_eq!(Category::of("hail_duration"), Some(Category::Hail));
        assert_eq!(Category::of("wind_dir_avg"), None);
        assert_eq!(Category::of("humidity"), None);
        assert_eq!(Category::of("supply_voltage"), None);
    }
}
