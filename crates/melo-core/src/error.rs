//! Error types for melody generation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Invalid argument for metric '{metric}': {reason}")]
    InvalidArgument { metric: String, reason: String },

    #[error("Sequence length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Population is empty")]
    EmptyPopulation,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid note code: {0}")]
    InvalidNote(i32),

    #[error("Scale has no pitches")]
    EmptyScale,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
