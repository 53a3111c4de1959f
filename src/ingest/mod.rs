//! Record ingestion
//!
//! - **parser**: line → [`Record`](crate::storage::Record)
//! - **reader**: files / stdin → lines
//! - **error**: per-line rejection reasons

mod error;
mod parser;
mod reader;

pub use error::ParseError;
pub use parser::{parse_leading_f64, parse_record};
pub use reader::{InputSet, STDIN_NAME};

use serde::Serialize;
use std::collections::BTreeMap;

/// Counters gathered during one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Lines handed to the parser
    pub lines_read: u64,
    /// Records appended to the store
    pub records_accepted: u64,
    /// Rejected lines, by [`ParseError::kind`]
    pub rejected: BTreeMap<&'static str, u64>,
    /// Records kept out of the geohash index by the allow-list
    pub geohash_excluded: u64,
}

impl IngestStats {
    pub fn record_rejection(&mut self, err: &ParseError) {
        *self.rejected.entry(err.kind()).or_insert(0) += 1;
    }

    /// Total rejected lines across all reasons
    pub fn rejected_total(&self) -> u64 {
        self.rejected.values().sum()
    }
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lines={}, accepted={}, rejected={}, geohash_excluded={}",
            self.lines_read,
            self.records_accepted,
            self.rejected_total(),
            self.geohash_excluded
        )
    }
}
