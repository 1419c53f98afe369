//! Error types for payload decoding in thingy-types.

use thiserror::Error;

/// Errors that can occur when decoding a sensor payload.
///
/// This error type is platform-agnostic and carries no BLE details
/// (those belong in thingy-core).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload was shorter than the decoder requires.
    #[error("Payload too short: expected at least {expected} bytes, got {actual}")]
    InsufficientBytes {
        /// Minimum number of bytes the decoder reads.
        expected: usize,
        /// Number of bytes actually received.
        actual: usize,
    },

    /// The payload had the right size but an unusable value.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl ParseError {
    /// Shorthand for [`ParseError::InsufficientBytes`].
    pub fn insufficient(expected: usize, actual: usize) -> Self {
        Self::InsufficientBytes { expected, actual }
    }
}

/// Result type alias using thingy-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
