/// Error types for adb operations
use thiserror::Error;

use crate::exec::DecodeError;

#[derive(Debug, Error)]
pub enum AdbError {
    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Undecodable output from `{command}`: {source}")]
    Decode {
        command: String,
        #[source]
        source: DecodeError,
    },

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Invalid command `{command}`: {reason}")]
    InvalidCommand { command: String, reason: String },

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, AdbError>;
