//! # Geodemand
//!
//! Geo-tagged demand indexing - ingest time-stamped geohash demand records
//! and retrieve them by day, hour, quarter-hour or geohash.
//!
//! ## Features
//!
//! - **Permissive ingestion**: `KEY,DAY,HH:MM,VALUE` lines, malformed rows skipped
//! - **Block chains**: fixed-capacity blocks of record ids, no per-record allocation
//! - **Time index**: day / hour / quarter-hour slot arrays over one year
//! - **Geohash index**: chained hash table with optional allow-list
//!
//! ## Modules
//!
//! - [`storage`]: Records and the append-only record store
//! - [`ingest`]: Line parser and input reader
//! - [`index`]: Block chains, time index, geohash index
//! - [`report`]: Record and summary rendering
//! - [`config`]: TOML configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geodemand::{IndexManager, InputSet, Reporter, ReportOptions};
//! use std::path::PathBuf;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut manager = IndexManager::new();
//!     manager.ingest(InputSet::open(&[PathBuf::from("demand.csv")])?)?;
//!
//!     let mut out = std::io::stdout();
//!     Reporter::new(&manager).render(&mut out, &ReportOptions::default())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod index;
pub mod ingest;
pub mod report;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{GeohashKey, Record, RecordId, RecordStore, StorageError, StorageResult};

pub use ingest::{parse_record, IngestStats, InputSet, ParseError};

pub use index::{
    BlockArena, BlockChain, GeohashBucket, GeohashIndex, IndexConfig, IndexManager, IndexStats,
    Resolution, TimeIndex, TimeSlot,
};

pub use report::{format_record, ReportFormat, ReportOptions, Reporter, SlotSummary, View};

pub use config::{Config, ConfigError, LogFormat, LoggingConfig};
