//! Ingestion error types
//!
//! A `ParseError` is always recoverable: the offending line is dropped and
//! ingestion continues with the next one.

use thiserror::Error;

/// Reasons a line is rejected by the record parser
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// First field runs past six characters
    #[error("geohash key is longer than 6 characters")]
    KeyTooLong,

    /// Day field contains something other than a decimal digit
    #[error("invalid byte {byte:#04x} in day field")]
    InvalidDay { byte: u8 },

    /// Time field contains something other than digits and ':'
    #[error("invalid byte {byte:#04x} in time field")]
    InvalidTime { byte: u8 },
}

impl ParseError {
    /// Short stable name, used as a counter label
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::KeyTooLong => "key_too_long",
            ParseError::InvalidDay { .. } => "invalid_day",
            ParseError::InvalidTime { .. } => "invalid_time",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ParseError::KeyTooLong.to_string(),
            "geohash key is longer than 6 characters"
        );
        assert_eq!(
            ParseError::InvalidDay { byte: b'x' }.to_string(),
            "invalid byte 0x78 in day field"
        );
    }
}
