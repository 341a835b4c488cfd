// src/error.rs
use crate::landmarks::Hand;
use thiserror::Error;

/// Errors produced by the gesture store, the recognizer and the training flow.
///
/// No-match is not an error: `Recognizer::recognize` returns `Ok(None)`.
#[derive(Error, Debug)]
pub enum Error {
    /// The persisted document exists but cannot be decoded.
    #[error("corrupt gesture storage: {0}")]
    CorruptStorage(String),

    #[error("unsupported gesture storage version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Reading or writing the durable slot failed.
    #[error("gesture storage I/O failed: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("invalid sample: {hand} hand has {len} landmarks, expected 21")]
    InvalidSample { hand: Hand, len: usize },

    #[error("invalid sample: {hand} hand landmark {index} has a non-finite coordinate")]
    NonFiniteLandmark { hand: Hand, index: usize },

    #[error("gesture pattern has no samples")]
    EmptyPattern,

    #[error("gesture name must not be empty")]
    EmptyName,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for the conditions a loader recovers from by starting with an empty library.
    pub fn is_corrupt_storage(&self) -> bool {
        matches!(self, Error::CorruptStorage(_) | Error::UnsupportedVersion { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
