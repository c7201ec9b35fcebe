//! Polling driver
//!
//! Drives a [`Station`] on a fixed interval, turns each composite message
//! into a [`Packet`] and derives per-poll rainfall from the cumulative rain
//! counter. Transient I/O failures are retried; running out of attempts
//! ends the packet sequence with [`DriverError::RetriesExceeded`].
//!
//! The poll cycle is an explicit state machine:
//!
//! ```text
//! Requesting --ok--> Idle --poll_interval--> Requesting
//!     |  ^
//!   err  retry_wait
//!     v  |
//!  RetryWait            (attempts exhausted) --> Terminated
//! ```

use crate::config::{ConfigError, DriverConfig, SensorMap};
use crate::core::packet::Packet;
use crate::core::protocol::{parser, Station};
use crate::core::transport::{create_transport, TransportError, TransportType};
use chrono::Utc;
use futures::Stream;
use std::time::Duration;
use thiserror::Error;

/// Packet field carrying the cumulative rain counter
pub const RAIN_TOTAL: &str = "rain_total";

/// Packet field carrying rainfall since the previous poll
pub const RAIN: &str = "rain";

/// Driver error types
#[derive(Error, Debug)]
pub enum DriverError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Selected protocol is not implemented
    #[error("{0} support not implemented")]
    NotSupported(TransportType),

    /// The transport could not be opened
    #[error("Connection failed: {0}")]
    Connection(#[source] TransportError),

    /// Every read attempt of a poll failed
    #[error("Read failed after {attempts} tries: {last}")]
    RetriesExceeded {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        #[source]
        last: TransportError,
    },

    /// A single station command failed
    #[error(transparent)]
    Transport(TransportError),
}

impl From<TransportError> for DriverError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotSupported(kind) => Self::NotSupported(kind),
            err if err.is_connection_error() => Self::Connection(err),
            err => Self::Transport(err),
        }
    }
}

/// Polling behaviour
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Wait after each yielded packet; zero polls back to back
    pub poll_interval: Duration,
    /// Read attempts per poll; 0 is treated as 1
    pub max_tries: u32,
    /// Wait between failed attempts
    pub retry_wait: Duration,
    /// Packet field names
    pub sensor_map: SensorMap,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&DriverConfig::default())
    }
}

impl From<&DriverConfig> for PollSettings {
    fn from(config: &DriverConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_tries: config.max_tries,
            retry_wait: config.retry_wait(),
            sensor_map: config.sensor_map.clone(),
        }
    }
}

/// Rainfall derived from the station's cumulative counter
#[derive(Debug, Clone, Default)]
pub struct RainCounter {
    last_total: Option<f64>,
}

impl RainCounter {
    /// Create a counter with no reference reading
    pub fn new() -> Self {
        Self::default()
    }

    /// Last cumulative reading seen
    pub fn last_total(&self) -> Option<f64> {
        self.last_total
    }

    /// Rain since the previous reading. A present `total` becomes the
    /// reference for the next call.
    pub fn update(&mut self, total: Option<f64>) -> Option<f64> {
        let delta = delta_rain(total, self.last_total);
        if total.is_some() {
            self.last_total = total;
        }
        delta
    }
}

/// Rain between two cumulative readings.
///
/// A counter that went backwards was reset or wrapped, so everything it
/// holds now fell since the previous reading.
pub fn delta_rain(rain: Option<f64>, last_rain: Option<f64>) -> Option<f64> {
    let (Some(rain), Some(last_rain)) = (rain, last_rain) else {
        tracing::info!(
            "skipping rain measurement: rain={:?} last_rain={:?}",
            rain,
            last_rain
        );
        return None;
    };

    if rain < last_rain {
        tracing::info!(
            "rain counter wraparound detected: rain={} last_rain={}",
            rain,
            last_rain
        );
        return Some(rain);
    }
    Some(rain - last_rain)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    /// Request a composite message; `attempt` counts from 1
    Requesting { attempt: u32 },
    /// Attempt `attempt` failed, waiting to retry
    RetryWait { attempt: u32 },
    /// Waiting out the poll interval
    Idle,
    /// Attempts exhausted, no more packets
    Terminated,
}

/// Polling driver for one station
pub struct Driver {
    station: Station,
    model: String,
    settings: PollSettings,
    state: PollState,
    rain: RainCounter,
}

impl Driver {
    /// Build the transport from `config` and open it
    pub async fn connect(config: &DriverConfig) -> Result<Self, DriverError> {
        tracing::info!("driver version is {}", crate::VERSION);

        let transport = create_transport(config.transport())?;
        let station = Station::new(transport, config.address);
        Self::open(station, &config.model, PollSettings::from(config)).await
    }

    /// Open `station` and wrap it in a driver
    pub async fn open(
        mut station: Station,
        model: &str,
        settings: PollSettings,
    ) -> Result<Self, DriverError> {
        tracing::info!("opening {} on {}", model, station.connection_info());
        station.open().await.map_err(DriverError::Connection)?;

        Ok(Self {
            station,
            model: model.to_string(),
            settings,
            state: PollState::Requesting { attempt: 1 },
            rain: RainCounter::new(),
        })
    }

    /// Station model name
    pub fn hardware_name(&self) -> &str {
        &self.model
    }

    /// The protocol client, for one-off commands
    pub fn station(&mut self) -> &mut Station {
        &mut self.station
    }

    /// Rain counter state
    pub fn rain_counter(&self) -> &RainCounter {
        &self.rain
    }

    /// Close the transport. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), DriverError> {
        self.station.close().await.map_err(DriverError::Transport)
    }

    /// Poll until the next packet is ready.
    ///
    /// Returns `Ok(None)` once the driver has terminated. The error that
    /// terminates it is returned exactly once.
    pub async fn next_packet(&mut self) -> Result<Option<Packet>, DriverError> {
        let max_tries = self.settings.max_tries.max(1);

        loop {
            let state = self.state;
            match state {
                PollState::Terminated => return Ok(None),
                PollState::Idle => {
                    if !self.settings.poll_interval.is_zero() {
                        tokio::time::sleep(self.settings.poll_interval).await;
                    }
                    self.state = PollState::Requesting { attempt: 1 };
                }
                PollState::RetryWait { attempt } => {
                    tracing::debug!("Waiting {:?}", self.settings.retry_wait);
                    tokio::time::sleep(self.settings.retry_wait).await;
                    self.state = PollState::Requesting {
                        attempt: attempt + 1,
                    };
                }
                PollState::Requesting { attempt } => match self.poll_once().await {
                    Ok(packet) => {
                        self.state = PollState::Idle;
                        if packet.is_some() {
                            return Ok(packet);
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed attempt {} of {} to read data: {}",
                            attempt,
                            max_tries,
                            e
                        );
                        if attempt >= max_tries {
                            tracing::error!("Read failed after {} tries", attempt);
                            self.state = PollState::Terminated;
                            return Err(DriverError::RetriesExceeded {
                                attempts: attempt,
                                last: e,
                            });
                        }
                        self.state = PollState::RetryWait { attempt };
                    }
                },
            }
        }
    }

    /// Lazy sequence of packets.
    ///
    /// Ends after yielding the error that terminates the driver. Stop
    /// pulling and call [`Driver::close`] to shut down early.
    pub fn packets(&mut self) -> impl Stream<Item = Result<Packet, DriverError>> + '_ {
        futures::stream::unfold(self, |driver| async move {
            match driver.next_packet().await {
                Ok(Some(packet)) => Some((Ok(packet), driver)),
                Ok(None) => None,
                Err(e) => Some((Err(e), driver)),
            }
        })
    }

    async fn poll_once(&mut self) -> Result<Option<Packet>, TransportError> {
        let raw = self.station.get_composite().await?;
        tracing::debug!("raw: {}", hex::encode_upper(&raw));

        let data = parser::parse(&raw);
        tracing::debug!("parsed: {:?}", data);

        if data.is_empty() {
            return Ok(None);
        }

        let mut packet = Packet::from_observations(&data, &self.settings.sensor_map, Utc::now());
        if let Some(&total) = packet.fields.get(RAIN_TOTAL) {
            let delta = self.rain.update(total);
            packet.fields.insert(RAIN.to_string(), delta);
        }
        tracing::debug!("mapped: {:?}", packet);

        Ok(Some(packet))
    }
}
