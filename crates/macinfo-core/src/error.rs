//! Error types for macinfo

use thiserror::Error;

/// macinfo error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Offset {offset:#x} is outside the section ({len:#x} bytes)")]
    OutOfBounds { offset: u64, len: u64 },

    #[error("Malformed macro info at {offset:#x}: {message}")]
    Malformed { offset: u64, message: String },

    #[error("Unknown macro info opcode {opcode:#04x} at {offset:#x}")]
    UnknownOpcode { opcode: u8, offset: u64 },

    #[error("Object file error: {0}")]
    Object(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to lock macro table")]
    Lock,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Malformed`] for the given section offset
    pub fn malformed(offset: u64, message: impl Into<String>) -> Self {
        Error::Malformed {
            offset,
            message: message.into(),
        }
    }
}

/// Result type alias for macinfo
pub type Result<T> = std::result::Result<T, Error>;
