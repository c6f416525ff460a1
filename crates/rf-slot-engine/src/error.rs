//! Error types for the slot round engine

use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Invalid pay table '{input}': {reason}")]
    InvalidPayTable { input: String, reason: String },

    #[error("Malformed line path '{input}': {reason}")]
    MalformedPath { input: String, reason: String },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Duplicate symbol name: {0}")]
    DuplicateSymbol(String),

    #[error("Reel {reel} strip has {len} symbols, needs at least {required}")]
    StripTooShort {
        reel: usize,
        len: usize,
        required: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SlotError {
    fn from(err: serde_json::Error) -> Self {
        SlotError::Parse(err.to_string())
    }
}

impl From<serde_yml::Error> for SlotError {
    fn from(err: serde_yml::Error) -> Self {
        SlotError::Parse(err.to_string())
    }
}

/// Result type alias
pub type SlotResult<T> = Result<T, SlotError>;
