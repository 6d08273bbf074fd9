pub mod backend;
pub mod channel;
pub mod config;
mod line_discipline;
pub mod translate;

pub use backend::{discover_ports, Backend, Device, NativeBackend, ScriptStats, ScriptedBackend};
pub use channel::SerialChannel;
pub use config::{
    BaudRate, DataBits, FlowControl, LineSettings, Parity, SerialConfig, StartBits, StopBits,
    DEFAULT_XOFF_CHAR, DEFAULT_XON_CHAR,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialDeviceInfo {
    pub port_name: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Fieldless view of [`SerialError`], convenient for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedValue,
    OperationNotSupported,
    InvalidState,
    InvalidAccess,
    InvalidArgument,
    FileNotFound,
    AccessDenied,
    AlreadyExists,
    ReadOnly,
    CreateFailed,
    IoError,
    OutOfMemory,
    DeviceError,
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Unsupported {setting}: {value}")]
    UnsupportedValue { setting: &'static str, value: String },

    #[error("Operation not supported: {0}")]
    OperationNotSupported(&'static str),

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Invalid access: {0}")]
    InvalidAccess(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Port not found: {port}: {message}")]
    FileNotFound { port: String, message: String },

    #[error("Access denied: {port}: {message}")]
    AccessDenied { port: String, message: String },

    #[error("Already exists: {port}: {message}")]
    AlreadyExists { port: String, message: String },

    #[error("Read only: {port}: {message}")]
    ReadOnly { port: String, message: String },

    #[error("Cannot open: {port}: {message}")]
    CreateFailed { port: String, message: String },

    #[error("IO error: {port}: {message}")]
    IoError { port: String, message: String },

    #[error("Out of memory: {port}: {message}")]
    OutOfMemory { port: String, message: String },

    #[error("Device error: {port}: {message}")]
    DeviceError { port: String, message: String },
}

impl SerialError {
    /// Builds the OS-level variant for `kind`. Validation kinds have no OS
    /// counterpart and collapse to `DeviceError`.
    pub fn os(kind: ErrorKind, port: &str, message: impl Into<String>) -> Self {
        let port = port.to_string();
        let message = message.into();
        match kind {
            ErrorKind::FileNotFound => SerialError::FileNotFound { port, message },
            ErrorKind::AccessDenied => SerialError::AccessDenied { port, message },
            ErrorKind::AlreadyExists => SerialError::AlreadyExists { port, message },
            ErrorKind::ReadOnly => SerialError::ReadOnly { port, message },
            ErrorKind::CreateFailed => SerialError::CreateFailed { port, message },
            ErrorKind::IoError => SerialError::IoError { port, message },
            ErrorKind::OutOfMemory => SerialError::OutOfMemory { port, message },
            _ => SerialError::DeviceError { port, message },
        }
    }

    pub(crate) fn unsupported(setting: &'static str, value: impl std::fmt::Debug) -> Self {
        SerialError::UnsupportedValue {
            setting,
            value: format!("{:?}", value),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SerialError::UnsupportedValue { .. } => ErrorKind::UnsupportedValue,
            SerialError::OperationNotSupported(_) => ErrorKind::OperationNotSupported,
            SerialError::InvalidState(_) => ErrorKind::InvalidState,
            SerialError::InvalidAccess(_) => ErrorKind::InvalidAccess,
            SerialError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SerialError::FileNotFound { .. } => ErrorKind::FileNotFound,
            SerialError::AccessDenied { .. } => ErrorKind::AccessDenied,
            SerialError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            SerialError::ReadOnly { .. } => ErrorKind::ReadOnly,
            SerialError::CreateFailed { .. } => ErrorKind::CreateFailed,
            SerialError::IoError { .. } => ErrorKind::IoError,
            SerialError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            SerialError::DeviceError { .. } => ErrorKind::DeviceError,
        }
    }
}

pub type Result<T> = std::result::Result<T, SerialError>;
