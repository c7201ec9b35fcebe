//! Station protocol client
//!
//! Frames commands as `<address><command><terminator>`, sends them over a
//! [`TransportTrait`] and reads back one terminated response line.

use crate::core::transport::{TransportError, TransportTrait, TransportType};
use bytes::Bytes;

/// Data message requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// aR1: wind
    Wind,
    /// aR2: pressure, temperature, humidity
    Pth,
    /// aR3: precipitation
    Precip,
    /// aR5: supervisor
    Supervisor,
    /// aR0: union of the above, where the model supports it
    Composite,
}

impl Message {
    /// Command body for the request
    pub fn command(&self) -> &'static [u8] {
        match self {
            Self::Wind => b"R1",
            Self::Pth => b"R2",
            Self::Precip => b"R3",
            Self::Supervisor => b"R5",
            Self::Composite => b"R0",
        }
    }
}

/// Protocol client for one station on one transport
pub struct Station {
    transport: Box<dyn TransportTrait>,
    address: u32,
    terminator: &'static [u8],
}

impl Station {
    /// Wrap a transport. The terminator follows the transport type.
    pub fn new(transport: Box<dyn TransportTrait>, address: u32) -> Self {
        let terminator = transport.transport_type().terminator();
        Self {
            transport,
            address,
            terminator,
        }
    }

    /// Device address used to frame commands
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Transport type of the underlying channel
    pub fn transport_type(&self) -> TransportType {
        self.transport.transport_type()
    }

    /// Connection info of the underlying channel
    pub fn connection_info(&self) -> String {
        self.transport.connection_info()
    }

    /// Open the transport
    pub async fn open(&mut self) -> Result<(), TransportError> {
        self.transport.open().await
    }

    /// Close the transport. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.transport.close().await
    }

    /// Check if the transport is open
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Build an addressed command frame
    pub fn frame(&self, cmd: &[u8]) -> Vec<u8> {
        let mut frame = self.address.to_string().into_bytes();
        frame.extend_from_slice(cmd);
        frame.extend_from_slice(self.terminator);
        frame
    }

    /// Send an addressed command without waiting for a response
    pub async fn send_cmd(&mut self, cmd: &[u8]) -> Result<(), TransportError> {
        let frame = self.frame(cmd);
        self.transport.write(&frame).await
    }

    /// Send an addressed command and read one response line.
    ///
    /// NUL bytes the firmware sometimes emits are removed. A timeout yields
    /// a short or empty line rather than an error.
    pub async fn get_data(&mut self, cmd: &[u8]) -> Result<Bytes, TransportError> {
        self.send_cmd(cmd).await?;
        self.read_line().await
    }

    async fn read_line(&mut self) -> Result<Bytes, TransportError> {
        let line = self.transport.read_until(self.terminator).await?;
        Ok(strip_nul(line))
    }

    /// Request a data message
    pub async fn get_message(&mut self, message: Message) -> Result<Bytes, TransportError> {
        self.get_data(message.command()).await
    }

    /// Request the wind message
    pub async fn get_wind(&mut self) -> Result<Bytes, TransportError> {
        self.get_message(Message::Wind).await
    }

    /// Request the pressure, temperature and humidity message
    pub async fn get_pth(&mut self) -> Result<Bytes, TransportError> {
        self.get_message(Message::Pth).await
    }

    /// Request the precipitation message
    pub async fn get_precip(&mut self) -> Result<Bytes, TransportError> {
        self.get_message(Message::Precip).await
    }

    /// Request the supervisor message
    pub async fn get_supervisor(&mut self) -> Result<Bytes, TransportError> {
        self.get_message(Message::Supervisor).await
    }

    /// Request the composite message
    pub async fn get_composite(&mut self) -> Result<Bytes, TransportError> {
        self.get_message(Message::Composite).await
    }

    /// Send the bare address and read the acknowledgement
    pub async fn get_ack(&mut self) -> Result<Bytes, TransportError> {
        self.get_data(b"").await
    }

    /// Ask any station on the line for its address. The query is unaddressed.
    pub async fn get_address(&mut self) -> Result<Bytes, TransportError> {
        let mut frame = b"?".to_vec();
        frame.extend_from_slice(self.terminator);
        self.transport.write(&frame).await?;
        self.read_line().await
    }

    /// Change the station address. Later commands use the new address.
    pub async fn set_address(&mut self, address: u32) -> Result<(), TransportError> {
        self.send_cmd(format!("A{}", address).as_bytes()).await?;
        self.address = address;
        Ok(())
    }

    /// Reset the station
    pub async fn reset(&mut self) -> Result<(), TransportError> {
        self.send_cmd(b"XZ").await
    }

    /// Reset the precipitation counters
    pub async fn precip_counter_reset(&mut self) -> Result<(), TransportError> {
        self.send_cmd(b"XZRU").await
    }

    /// Reset the precipitation intensity
    pub async fn precip_intensity_reset(&mut self) -> Result<(), TransportError> {
        self.send_cmd(b"XZRI").await
    }

    /// Restart all measurements
    pub async fn measurement_reset(&mut self) -> Result<(), TransportError> {
        self.send_cmd(b"XZM").await
    }

    /// Switch to ASCII automatic mode
    pub async fn set_automatic_mode(&mut self) -> Result<(), TransportError> {
        self.send_cmd(b"XU,M=R").await
    }

    /// Switch to ASCII polled mode
    pub async fn set_polled_mode(&mut self) -> Result<(), TransportError> {
        self.send_cmd(b"XU,M=P").await
    }
}

fn strip_nul(line: Bytes) -> Bytes {
    if line.contains(&0) {
        line.iter().copied().filter(|&b| b != 0).collect()
    } else {
        line
    }
}
