//! Driver settings and sensor map

use crate::core::transport::{SerialConfig, SerialParity, TcpConfig, Transport, TransportType};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Protocol selector not recognised
    #[error("unknown protocol '{0}'")]
    UnknownProtocol(String),

    /// Platform has no configuration directory
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for this schema
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be written as TOML
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Communication protocol of the station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Protocol {
    /// ASCII over a serial line
    #[default]
    Serial,
    /// NMEA 0183
    Nmea,
    /// SDI-12
    Sdi12,
    /// ASCII through a TCP serial port server
    Tcp,
}

impl Protocol {
    /// Transport type used by this protocol
    pub fn transport_type(&self) -> TransportType {
        match self {
            Self::Serial => TransportType::Serial,
            Self::Nmea => TransportType::Nmea,
            Self::Sdi12 => TransportType::Sdi12,
            Self::Tcp => TransportType::Tcp,
        }
    }

    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Nmea => "nmea",
            Self::Sdi12 => "sdi12",
            Self::Tcp => "tcp",
        }
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "nmea" => Ok(Self::Nmea),
            "sdi12" => Ok(Self::Sdi12),
            "tcp" => Ok(Self::Tcp),
            other => Err(ConfigError::UnknownProtocol(other.to_string())),
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Protocol> for String {
    fn from(protocol: Protocol) -> Self {
        protocol.name().to_string()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Packet field name to canonical observation name.
///
/// Entries keep the order they were configured in. When several fields map
/// to the same observation the first one wins. Observations without an
/// entry keep their canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorMap(Vec<(String, String)>);

impl SensorMap {
    /// Empty map: every observation keeps its canonical name
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Map `field` to `observation`, keeping the position of an existing field
    pub fn insert(&mut self, field: &str, observation: &str) {
        match self.0.iter_mut().find(|(f, _)| f == field) {
            Some((_, obs)) => *obs = observation.to_string(),
            None => self.0.push((field.to_string(), observation.to_string())),
        }
    }

    /// Packet field name for a canonical observation name
    pub fn field_for<'a>(&'a self, observation: &'a str) -> &'a str {
        self.0
            .iter()
            .find(|(_, obs)| obs.as_str() == observation)
            .map_or(observation, |(field, _)| field.as_str())
    }
}

impl Serialize for SensorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, obs) in &self.0 {
            map.serialize_entry(field, obs)?;
        }
        map.end()
    }
}

struct SensorMapVisitor;

impl<'de> Visitor<'de> for SensorMapVisitor {
    type Value = SensorMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a table of field = \"observation\" entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SensorMap, A::Error> {
        let mut map = SensorMap::empty();
        while let Some((field, obs)) = access.next_entry::<String, String>()? {
            map.insert(&field, &obs);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for SensorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SensorMapVisitor)
    }
}

impl Default for SensorMap {
    fn default() -> Self {
        let pairs = [
            ("windDir", "wind_dir_avg"),
            ("windSpeed", "wind_speed_avg"),
            ("windGustDir", "wind_dir_max"),
            ("windGust", "wind_speed_max"),
            ("outTemp", "temperature"),
            ("outHumidity", "humidity"),
            ("pressure", "pressure"),
            ("rain_total", "rain"),
            ("rainRate", "rain_intensity"),
            ("hail", "hail"),
            ("hailRate", "hail_intensity"),
            ("heatingTemp", "heating_temperature"),
            ("heatingVoltage", "heating_voltage"),
            ("supplyVoltage", "supply_voltage"),
            ("referenceVoltage", "reference_voltage"),
        ];
        Self(
            pairs
                .iter()
                .map(|(field, obs)| (field.to_string(), obs.to_string()))
                .collect(),
        )
    }
}

/// Driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Station model, WXT510 or WXT520
    pub model: String,
    /// Communication protocol
    pub protocol: Protocol,
    /// Serial port the station is connected to
    pub port: String,
    /// Baud rate; the protocol default when unset
    pub baud: Option<u32>,
    /// Device address
    pub address: u32,
    /// Host of the TCP serial port server
    pub tcp_host: String,
    /// Port of the TCP serial port server
    pub tcp_port: u16,
    /// Connect and read timeout in seconds
    pub timeout_secs: u64,
    /// Seconds between polls, 0 to poll back to back
    pub poll_interval: u64,
    /// Read attempts per poll before giving up; 0 is treated as 1
    pub max_tries: u32,
    /// Seconds to wait between failed attempts
    pub retry_wait: u64,
    /// Packet field names
    pub sensor_map: SensorMap,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            model: "WXT520".to_string(),
            protocol: Protocol::Serial,
            port: "/dev/ttyUSB0".to_string(),
            baud: None,
            address: 0,
            tcp_host: "localhost".to_string(),
            tcp_port: 5000,
            timeout_secs: 3,
            poll_interval: 1,
            max_tries: 5,
            retry_wait: 10,
            sensor_map: SensorMap::default(),
        }
    }
}

impl DriverConfig {
    /// Load config from the default location, or defaults if it does not exist
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = super::config_file().ok_or(ConfigError::NoConfigDir)?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = super::config_file().ok_or(ConfigError::NoConfigDir)?;
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        self.save_to(&config_path)
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Effective baud rate
    pub fn baud_rate(&self) -> u32 {
        self.baud
            .unwrap_or_else(|| self.protocol.transport_type().default_baud())
    }

    /// Transport configuration for the selected protocol
    pub fn transport(&self) -> Transport {
        let serial = SerialConfig::new(&self.port, self.baud_rate()).timeout(self.timeout_secs);
        match self.protocol {
            Protocol::Serial => Transport::Serial(serial),
            Protocol::Nmea => Transport::Nmea(serial),
            Protocol::Sdi12 => Transport::Sdi12(serial.data_bits(7).parity(SerialParity::Even)),
            Protocol::Tcp => Transport::Tcp(
                TcpConfig::new(&self.tcp_host, self.tcp_port).timeout(self.timeout_secs),
            ),
        }
    }

    /// Seconds between polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Wait between failed attempts
    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_from_str() {
        assert_eq!("serial".parse::<Protocol>().unwrap(), Protocol::Serial);
        assert_eq!("TCP".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!(" sdi12 ".parse::<Protocol>().unwrap(), Protocol::Sdi12);
        let err = "modbus".parse::<Protocol>().unwrap_err();
        assert_eq!(err.to_string(), "unknown protocol 'modbus'");
    }

    #[test]
    fn test_default_baud_follows_protocol() {
        let mut config = DriverConfig::default();
        assert_eq!(config.baud_rate(), 19200);
        config.protocol = Protocol::Nmea;
        assert_eq!(config.baud_rate(), 4800);
        config.protocol = Protocol::Sdi12;
        assert_eq!(config.baud_rate(), 1200);
        config.baud = Some(9600);
        assert_eq!(config.baud_rate(), 9600);
    }

    #[test]
    fn test_transport_selection() {
        let mut config = DriverConfig::default();
        match config.transport() {
            Transport::Serial(serial) => {
                assert_eq!(serial.port, "/dev/ttyUSB0");
                assert_eq!(serial.baud_rate, 19200);
                assert_eq!(serial.timeout_secs, 3);
            }
            other => panic!("unexpected transport {:?}", other),
        }

        config.protocol = Protocol::Tcp;
        config.tcp_host = "10.0.0.5".to_string();
        match config.transport() {
            Transport::Tcp(tcp) => {
                assert_eq!(tcp.host, "10.0.0.5");
                assert_eq!(tcp.port, 5000);
            }
            other => panic!("unexpected transport {:?}", other),
        }
    }

    #[test]
    fn test_sensor_map() {
        let map = SensorMap::default();
        assert_eq!(map.field_for("temperature"), "outTemp");
        assert_eq!(map.field_for("rain"), "rain_total");
        assert_eq!(map.field_for("pressure"), "pressure");
        assert_eq!(map.field_for("rain_duration"), "rain_duration");
        assert_eq!(SensorMap::empty().field_for("temperature"), "temperature");
    }

    #[test]
    fn test_sensor_map_first_configured_field_wins() {
        let config: DriverConfig = toml::from_str(
            r#"
            [sensor_map]
            zWind = "wind_dir_avg"
            aWind = "wind_dir_avg"
            "#,
        )
        .unwrap();
        assert_eq!(config.sensor_map.field_for("wind_dir_avg"), "zWind");

        let mut map = SensorMap::empty();
        map.insert("gustB", "wind_speed_max");
        map.insert("gustA", "wind_speed_max");
        map.insert("gustB", "wind_speed_max");
        assert_eq!(map.field_for("wind_speed_max"), "gustB");
    }

    #[test]
    fn test_sensor_map_order_survives_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wxt5x0.toml");

        let mut config = DriverConfig::default();
        config.sensor_map = SensorMap::empty();
        config.sensor_map.insert("zTemp", "temperature");
        config.sensor_map.insert("aTemp", "temperature");
        config.save_to(&path).unwrap();

        let loaded = DriverConfig::load_from(&path).unwrap();
        assert_eq!(loaded.sensor_map.field_for("temperature"), "zTemp");
        assert_eq!(loaded.sensor_map, config.sensor_map);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DriverConfig = toml::from_str(
            r#"
            protocol = "tcp"
            tcp_host = "serial-server.local"
            tcp_port = 4001
            max_tries = 3

            [sensor_map]
            outTemp = "heating_temperature"
            "#,
        )
        .unwrap();

        assert_eq!(config.protocol, Protocol::Tcp);
        assert_eq!(config.tcp_port, 4001);
        assert_eq!(config.max_tries, 3);
        assert_eq!(config.retry_wait, 10);
        assert_eq!(config.model, "WXT520");
        assert_eq!(config.sensor_map.field_for("heating_temperature"), "outTemp");
        assert_eq!(config.sensor_map.field_for("temperature"), "temperature");
    }

    #[test]
    fn test_unknown_protocol_in_file() {
        let err = toml::from_str::<DriverConfig>("protocol = \"carrier-pigeon\"").unwrap_err();
        assert!(err.to_string().contains("unknown protocol 'carrier-pigeon'"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wxt5x0.toml");

        let mut config = DriverConfig::default();
        config.protocol = Protocol::Tcp;
        config.address = 2;
        config.baud = Some(9600);
        config.sensor_map.insert("windChill", "heating_temperature");
        config.save_to(&path).unwrap();

        let loaded = DriverConfig::load_from(&path).unwrap();
        assert_eq!(loaded.protocol, Protocol::Tcp);
        assert_eq!(loaded.address, 2);
        assert_eq!(loaded.baud, Some(9600));
        assert_eq!(loaded.sensor_map, config.sensor_map);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DriverConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
