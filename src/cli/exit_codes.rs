//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::ConfigError;
use crate::core::driver::DriverError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// Read timeout
    pub const TIMEOUT: u8 = 4;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Protocol not implemented
    pub const NOT_SUPPORTED: u8 = 9;

    /// User cancelled
    pub const CANCELLED: u8 = 11;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;

    /// Station stopped answering
    pub const RETRIES_EXCEEDED: u8 = 18;
}

const ALL_CODES: [u8; 10] = [0, 1, 3, 4, 7, 8, 9, 11, 14, 18];

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Success without output
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Success with a message for stdout
    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success(Some(msg.into()))
    }

    /// Error with an explicit exit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Interrupted by the user
    pub fn cancelled() -> Self {
        Self::Error(ExitCodes::CANCELLED, "Interrupted".to_string())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) => Some(msg),
            Self::Error(_, msg) => Some(msg),
            _ => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

fn transport_code(err: &TransportError) -> u8 {
    match err {
        TransportError::PortNotFound(_) => ExitCodes::PORT_NOT_FOUND,
        TransportError::PermissionDenied(_) => ExitCodes::PERMISSION_DENIED,
        TransportError::Timeout(_) => ExitCodes::TIMEOUT,
        TransportError::ConnectionFailed(_) | TransportError::NotConnected => {
            ExitCodes::CONNECTION_FAILED
        }
        TransportError::NotSupported(_) => ExitCodes::NOT_SUPPORTED,
        TransportError::IoError(e) => io_code(e.kind()),
    }
}

fn io_code(kind: std::io::ErrorKind) -> u8 {
    use std::io::ErrorKind;

    match kind {
        ErrorKind::NotFound => ExitCodes::PORT_NOT_FOUND,
        ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => ExitCodes::CONNECTION_FAILED,
        ErrorKind::TimedOut => ExitCodes::TIMEOUT,
        _ => ExitCodes::ERROR,
    }
}

impl From<&DriverError> for CliResult {
    fn from(err: &DriverError) -> Self {
        let code = match err {
            DriverError::Config(_) => ExitCodes::CONFIG_ERROR,
            DriverError::NotSupported(_) => ExitCodes::NOT_SUPPORTED,
            DriverError::Connection(e) => match transport_code(e) {
                ExitCodes::ERROR => ExitCodes::CONNECTION_FAILED,
                code => code,
            },
            DriverError::RetriesExceeded { .. } => ExitCodes::RETRIES_EXCEEDED,
            DriverError::Transport(e) => transport_code(e),
        };

        Self::Error(code, err.to_string())
    }
}

impl From<DriverError> for CliResult {
    fn from(err: DriverError) -> Self {
        Self::from(&err)
    }
}

impl From<ConfigError> for CliResult {
    fn from(err: ConfigError) -> Self {
        Self::Error(ExitCodes::CONFIG_ERROR, err.to_string())
    }
}

impl From<std::io::Error> for CliResult {
    fn from(err: std::io::Error) -> Self {
        Self::Error(io_code(err.kind()), err.to_string())
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        3 => "Connection failed",
        4 => "Read timeout",
        7 => "Permission denied",
        8 => "Configuration error",
        9 => "Protocol not supported",
        11 => "Operation cancelled",
        14 => "Port not found",
        18 => "Station not responding",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in ALL_CODES {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}
