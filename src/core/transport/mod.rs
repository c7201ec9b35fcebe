//! Transport layer for station connections
//!
//! Supports:
//! - Serial ports (RS-232, RS-485, RS-422 in ASCII mode)
//! - Raw TCP connections to a serial port server
//!
//! NMEA 0183 and SDI-12 are declared so that configuration can name them,
//! but creating either transport fails with [`TransportError::NotSupported`].

mod serial;
mod tcp;

pub use serial::{list_ports, SerialConfig, SerialParity, SerialTransport};
pub use tcp::{read_until_terminator, TcpConfig, TcpTransport};

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Transport configuration
#[derive(Debug, Clone)]
pub enum Transport {
    /// ASCII protocol over a local serial line
    Serial(SerialConfig),
    /// NMEA 0183 over a serial line (not implemented)
    Nmea(SerialConfig),
    /// SDI-12 over a serial line (not implemented)
    Sdi12(SerialConfig),
    /// ASCII protocol over a TCP serial port server
    Tcp(TcpConfig),
}

impl Transport {
    /// Get transport type
    pub fn transport_type(&self) -> TransportType {
        match self {
            Self::Serial(_) => TransportType::Serial,
            Self::Nmea(_) => TransportType::Nmea,
            Self::Sdi12(_) => TransportType::Sdi12,
            Self::Tcp(_) => TransportType::Tcp,
        }
    }
}

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// ASCII over serial
    Serial,
    /// NMEA 0183
    Nmea,
    /// SDI-12
    Sdi12,
    /// ASCII over TCP
    Tcp,
}

impl TransportType {
    /// Line terminator the station uses on this transport
    pub fn terminator(&self) -> &'static [u8] {
        match self {
            Self::Serial | Self::Tcp => b"\r\n",
            Self::Sdi12 => b"!",
            Self::Nmea => b"",
        }
    }

    /// Factory default baud rate of the station for this protocol.
    ///
    /// ASCII defaults to 19200 8N1, NMEA to 4800 8N1 and SDI-12 to 1200 7E1.
    /// TCP has no baud rate of its own; the serial server decides.
    pub fn default_baud(&self) -> u32 {
        match self {
            Self::Serial => 19200,
            Self::Nmea => 4800,
            Self::Sdi12 => 1200,
            Self::Tcp => 0,
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "Serial"),
            Self::Nmea => write!(f, "NMEA"),
            Self::Sdi12 => write!(f, "SDI-12"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection timeout
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Protocol has no transport implementation
    #[error("{0} support not implemented")]
    NotSupported(TransportType),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

impl TransportError {
    /// Whether this error happened while establishing the channel
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::Timeout(_)
                | Self::PortNotFound(_)
                | Self::PermissionDenied(_)
        )
    }
}

/// Byte-oriented duplex channel to a station.
///
/// All methods suspend the caller until the operation completes; there is
/// no background reader. `read_until` never fails on a timeout, it hands
/// back whatever arrived so far and callers treat short reads as no data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportTrait: Send {
    /// Establish the underlying channel
    async fn open(&mut self) -> Result<(), TransportError>;

    /// Release the channel. Safe to call when never opened or already closed.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the channel is open
    fn is_open(&self) -> bool;

    /// Send raw bytes
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read until `terminator` is the suffix of the received bytes.
    ///
    /// The returned buffer includes the terminator. On timeout or channel
    /// closure the buffer is short or empty.
    async fn read_until(&mut self, terminator: &[u8]) -> Result<Bytes, TransportError>;

    /// Get transport type
    fn transport_type(&self) -> TransportType;

    /// Get connection info string
    fn connection_info(&self) -> String;
}

/// Create a transport instance from configuration.
///
/// The transport is returned closed; call [`TransportTrait::open`] on it.
pub fn create_transport(config: Transport) -> Result<Box<dyn TransportTrait>, TransportError> {
    match config {
        Transport::Serial(cfg) => Ok(Box::new(SerialTransport::new(cfg))),
        Transport::Tcp(cfg) => Ok(Box::new(TcpTransport::new(cfg))),
        Transport::Nmea(_) => Err(TransportError::NotSupported(TransportType::Nmea)),
        Transport::Sdi12(_) => Err(TransportError::NotSupported(TransportType::Sdi12)),
    }
}
