//! Unit normalization
//!
//! The station appends a unit tag to every value. The same letter means
//! different things per category (`M` is m/s for wind, mmHg for pressure and
//! millimetres for rain), so conversion is keyed on (category, unit).
//! Everything is normalized to the METRICWX system: Celsius, m/s, hPa,
//! millimetres, seconds and hits/cm².

use super::observation::{is_duration, Category};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metres per second in one km/h
pub const MPS_PER_KPH: f64 = 0.277778;
/// Metres per second in one mph
pub const MPS_PER_MPH: f64 = 0.44704;
/// Metres per second in one knot
pub const MPS_PER_KNOT: f64 = 0.514444;
/// Millibar per pascal
pub const MBAR_PER_PASCAL: f64 = 0.01;
/// Millibar per bar
pub const MBAR_PER_BAR: f64 = 1000.0;
/// Millibar per mmHg
pub const MBAR_PER_MMHG: f64 = 1.333_223_874_15;
/// Millibar per inHg
pub const MBAR_PER_INHG: f64 = 33.8639;
/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;
/// Square centimetres per square inch
pub const CM2_PER_IN2: f64 = 6.4516;

/// Unit tag meaning "no valid reading"
pub const INVALID: u8 = b'#';

/// Unit system of emitted packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitSystem {
    /// Metric with wind in m/s and rain in mm
    #[serde(rename = "METRICWX")]
    MetricWx,
}

impl UnitSystem {
    /// Numeric identifier used by archive consumers
    pub fn code(&self) -> u8 {
        match self {
            Self::MetricWx => 0x11,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MetricWx => write!(f, "METRICWX"),
        }
    }
}

/// Convert `value` reported with `unit` for observation `name` into METRICWX.
///
/// Unknown units for a known category are passed through unchanged with a
/// diagnostic. Observations without a category are returned as-is.
pub fn normalize(name: &str, value: f64, unit: u8) -> f64 {
    let Some(category) = Category::of(name) else {
        return value;
    };

    match convert(category, is_duration(name), value, unit) {
        Some(converted) => converted,
        None => {
            tracing::info!("unknown unit '{}' for {}", char::from(unit), name);
            value
        }
    }
}

fn convert(category: Category, duration: bool, value: f64, unit: u8) -> Option<f64> {
    let converted = match (category, unit) {
        // [T] C=celsius F=fahrenheit
        (Category::Temperature, b'C') => value,
        (Category::Temperature, b'F') => (value - 32.0) * 5.0 / 9.0,
        // [U] M=m/s K=km/h S=mph N=knots
        (Category::WindSpeed, b'M') => value,
        (Category::WindSpeed, b'K') => value * MPS_PER_KPH,
        (Category::WindSpeed, b'S') => value * MPS_PER_MPH,
        (Category::WindSpeed, b'N') => value * MPS_PER_KNOT,
        // [P] H=hPa P=pascal B=bar M=mmHg I=inHg
        (Category::Pressure, b'H') => value,
        (Category::Pressure, b'P') => value * MBAR_PER_PASCAL,
        (Category::Pressure, b'B') => value * MBAR_PER_BAR,
        (Category::Pressure, b'M') => value * MBAR_PER_MMHG,
        (Category::Pressure, b'I') => value * MBAR_PER_INHG,
        // [U] precip M=(mm s mm/h) I=(in s in/h)
        (Category::Rain, b'M' | b's') => value,
        (Category::Rain, b'I') if duration => value,
        (Category::Rain, b'I') => value * MM_PER_INCH,
        // [S] hail M=(hits/cm² s hits/cm²h) I=(hits/in² s hits/in²h) H=hits
        (Category::Hail, b'M' | b's' | b'H') => value,
        (Category::Hail, b'I') if duration => value,
        (Category::Hail, b'I') => value * CM2_PER_IN2,
        _ => return None,
    };
    Some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_temperature() {
        assert_close(normalize("temperature", 21.5, b'C'), 21.5);
        assert_close(normalize("temperature", 212.0, b'F'), 100.0);
        assert_close(normalize("heating_temperature", 32.0, b'F'), 0.0);
    }

    #[test]
    fn test_wind_speed() {
        assert_close(normalize("wind_speed_avg", 4.0, b'M'), 4.0);
        assert_close(normalize("wind_speed_avg", 36.0, b'K'), 36.0 * 0.277778);
        assert_close(normalize("wind_speed_max", 10.0, b'S'), 4.4704);
        assert_close(normalize("wind_speed_min", 10.0, b'N'), 5.14444);
    }

    #[test]
    fn test_pressure() {
        assert_close(normalize("pressure", 1018.1, b'H'), 1018.1);
        assert_close(normalize("pressure", 101_325.0, b'P'), 1013.25);
        assert_close(normalize("pressure", 1.0, b'B'), 1000.0);
        assert_close(normalize("pressure", 760.0, b'M'), 760.0 * 1.33322387415);
        assert_close(normalize("pressure", 29.92, b'I'), 29.92 * 33.8639);
        assert!((normalize("pressure", 29.92, b'I') - 1013.2).abs() < 0.05);
    }

    #[test]
    fn test_rain() {
        assert_close(normalize("rain", 1.5, b'M'), 1.5);
        assert_close(normalize("rain", 1.0, b'I'), 25.4);
        assert_close(normalize("rain_intensity", 0.5, b'I'), 12.7);
        assert_close(normalize("rain_duration", 30.0, b's'), 30.0);
        assert_close(normalize("rain_duration", 30.0, b'I'), 30.0);
    }

    #[test]
    fn test_hail() {
        assert_close(normalize("hail", 2.0, b'M'), 2.0);
        assert_close(normalize("hail", 1.0, b'I'), 6.4516);
        assert_close(normalize("hail_intensity_peak", 2.0, b'I'), 12.9032);
        assert_close(normalize("hail_duration", 10.0, b'I'), 10.0);
        assert_close(normalize("hail", 3.0, b'H'), 3.0);
    }

    #[test]
    fn test_unknown_unit_passes_through() {
        assert_close(normalize("temperature", 21.0, b'K'), 21.0);
        assert_close(normalize("pressure", 1000.0, b'X'), 1000.0);
        assert_close(normalize("rain", 1.0, b'H'), 1.0);
    }

    #[test]
    fn test_uncategorized_fields_are_untouched() {
        assert_close(normalize("wind_dir_avg", 106.0, b'D'), 106.0);
        assert_close(normalize("humidity", 50.0, b'P'), 50.0);
        assert_close(normalize("supply_voltage", 15.2, b'V'), 15.2);
        assert_close(normalize("heating_voltage", 0.0, b'N'), 0.0);
    }

    #[test]
    fn test_unit_system() {
        assert_eq!(UnitSystem::MetricWx.code(), 0x11);
        assert_eq!(UnitSystem::MetricWx.to_string(), "METRICWX");
        assert_eq!(
            serde_json::to_string(&UnitSystem::MetricWx).unwrap(),
            "\"METRICWX\""
        );
    }
}
