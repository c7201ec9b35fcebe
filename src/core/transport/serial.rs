//! Serial port transport implementation

use super::{TransportError, TransportTrait, TransportType};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::Instant;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerialParity {
    /// No parity
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Serial port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (7, 8)
    pub data_bits: u8,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Read timeout in seconds
    pub timeout_secs: u64,
}

impl SerialConfig {
    /// Create a new serial configuration with 8N1 framing
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            timeout_secs: 3,
        }
    }

    /// Set data bits
    #[must_use]
    pub fn data_bits(mut self, bits: u8) -> Self {
        self.data_bits = bits;
        self
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: SerialParity) -> Self {
        self.parity = parity;
        self
    }

    /// Set read timeout
    #[must_use]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new("/dev/ttyUSB0", TransportType::Serial.default_baud())
    }
}

/// Serial port transport
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<BufReader<SerialStream>>,
}

impl SerialTransport {
    /// Create a new serial transport
    pub fn new(config: SerialConfig) -> Self {
        Self { config, port: None }
    }
}

#[async_trait]
impl TransportTrait for SerialTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        tracing::debug!("open serial port {}", self.config.port);

        let data_bits = match self.config.data_bits {
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };

        let stop_bits = match self.config.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };

        let parity = match self.config.parity {
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
            SerialParity::None => Parity::None,
        };

        let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .open_native_async()
            .map_err(|e| match e.kind() {
                tokio_serial::ErrorKind::NoDevice => {
                    TransportError::PortNotFound(self.config.port.clone())
                }
                tokio_serial::ErrorKind::Io(ErrorKind::NotFound) => {
                    TransportError::PortNotFound(self.config.port.clone())
                }
                tokio_serial::ErrorKind::Io(ErrorKind::PermissionDenied) => {
                    TransportError::PermissionDenied(self.config.port.clone())
                }
                _ => TransportError::ConnectionFailed(e.to_string()),
            })?;

        self.port = Some(BufReader::new(stream));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_some() {
            tracing::debug!("close serial port {}", self.config.port);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;

        let stream = port.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_until(&mut self, terminator: &[u8]) -> Result<Bytes, TransportError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;

        // Without a terminator there is no line to wait for.
        let Some(&last) = terminator.last() else {
            return Ok(super::read_until_terminator(port, terminator, timeout).await?);
        };

        let deadline = Instant::now() + timeout;
        let mut buffer = Vec::with_capacity(256);

        loop {
            // Bytes read before a timeout stay in `buffer`.
            match tokio::time::timeout_at(deadline, port.read_until(last, &mut buffer)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {
                    if buffer.ends_with(terminator) {
                        break;
                    }
                }
                Ok(Err(e)) if e.kind() == ErrorKind::TimedOut => break,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    tracing::debug!("read timed out after {} bytes", buffer.len());
                    break;
                }
            }
        }

        Ok(Bytes::from(buffer))
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Serial
    }

    fn connection_info(&self) -> String {
        format!(
            "{} @ {} baud ({}{}{})",
            self.config.port,
            self.config.baud_rate,
            self.config.data_bits,
            match self.config.parity {
                SerialParity::None => "N",
                SerialParity::Odd => "O",
                SerialParity::Even => "E",
            },
            self.config.stop_bits,
        )
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, TransportError> {
    serialport::available_ports().map_err(|e| TransportError::IoError(e.into()))
}
