//! Storage and index error types
//!
//! Defines all errors that can occur while storing and indexing records.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the record store and the indices built on it
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A named input could not be opened
    #[error("open file error: {path:?}: {source}")]
    InputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Allocation for the store, a block or a bucket failed
    #[error("no memory for {0}")]
    Exhausted(&'static str),

    /// A record field falls outside the domain the time index covers
    #[error("{field} value {value} is outside the indexable range")]
    SlotOutOfRange { field: &'static str, value: u32 },

    /// Requested slot range is empty or exceeds the resolution's slot count
    #[error("Invalid slot range {low}..={high} for {resolution} (slots: {slots})")]
    InvalidSlotRange {
        resolution: &'static str,
        low: usize,
        high: usize,
        slots: usize,
    },
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
