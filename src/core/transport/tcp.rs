//! TCP transport implementation
//!
//! Talks to the station through a TCP serial port server. TCP is a byte
//! stream without framing, so responses are read one byte at a time and the
//! terminator is matched against the tail of the accumulated buffer.

use super::{TransportError, TransportTrait, TransportType};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

/// TCP connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    /// Host address of the serial port server
    pub host: String,
    /// Port number
    pub port: u16,
    /// Connect and read timeout in seconds
    pub timeout_secs: u64,
}

impl TcpConfig {
    /// Create a new TCP configuration
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout_secs: 3,
        }
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self::new("localhost", 5000)
    }
}

/// TCP transport
pub struct TcpTransport {
    config: TcpConfig,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create a new TCP transport
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }
}

#[async_trait]
impl TransportTrait for TcpTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        tracing::debug!("open TCP connection to {}", addr);

        let stream = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            TcpStream::connect(&addr),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.config.timeout_secs))?
        .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", addr, e)))?;

        stream.set_nodelay(true).map_err(TransportError::IoError)?;

        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!(
                "close TCP connection to {}:{}",
                self.config.host,
                self.config.port
            );
            stream.shutdown().await.ok();
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_until(&mut self, terminator: &[u8]) -> Result<Bytes, TransportError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        Ok(read_until_terminator(stream, terminator, timeout).await?)
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    fn connection_info(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

/// Read single bytes from `reader` until `terminator` ends the buffer.
///
/// Stops early, without error, when `timeout` elapses or the peer closes
/// the stream. An empty terminator never matches, so the read runs until
/// one of those happens.
pub async fn read_until_terminator<R>(
    reader: &mut R,
    terminator: &[u8],
    timeout: Duration,
) -> std::io::Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut buffer = BytesMut::with_capacity(256);

    loop {
        match tokio::time::timeout_at(deadline, reader.read_u8()).await {
            Ok(Ok(byte)) => {
                buffer.put_u8(byte);
                if !terminator.is_empty() && buffer.ends_with(terminator) {
                    break;
                }
            }
            Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                tracing::debug!("stream closed after {} bytes", buffer.len());
                break;
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::debug!("read timed out after {} bytes", buffer.len());
                break;
            }
        }
    }

    Ok(buffer.freeze())
}
