//! # WXT5x0 Core Library
//!
//! Driver for Vaisala WXT510/WXT520 weather transmitters using the ASCII
//! polled protocol over:
//! - Serial ports (RS-232, RS-485, RS-422)
//! - TCP serial port servers
//!
//! ## Features
//!
//! - Addressed command client for wind, PTH, precipitation, supervisor and
//!   composite messages
//! - Tolerant data message parser with unit normalization to METRICWX
//! - Polling loop with bounded retries and rain counter deltas
//! - CRC integrity tag helpers
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use wxt5x0_core::{Driver, DriverConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DriverConfig::default();
//!     let mut driver = Driver::connect(&config).await?;
//!
//!     {
//!         let packets = driver.packets();
//!         futures::pin_mut!(packets);
//!         while let Some(packet) = packets.next().await {
//!             println!("{:?}", packet?);
//!         }
//!     }
//!
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{ConfigError, DriverConfig, Protocol, SensorMap};
pub use crate::core::driver::{delta_rain, Driver, DriverError, PollSettings, RainCounter};
pub use crate::core::packet::Packet;
pub use crate::core::protocol::{crc_tag, parse, Message, Observations, Station, UnitSystem};
pub use crate::core::transport::{
    create_transport, SerialConfig, TcpConfig, Transport, TransportError, TransportTrait,
    TransportType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
