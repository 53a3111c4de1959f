//! Index Manager - owns the record store and both indices
//!
//! Runs the single ingestion pass:
//!
//! ```text
//! for each line:
//!   parse          → malformed? count it, warn, continue
//!   store.push     → RecordId
//!   time.insert    → day / hour / quarter slots (fatal if out of range)
//!   geohash.insert → bucket, or skipped when the allow-list excludes it
//! ```
//!
//! Any storage error (exhaustion, precondition violation, I/O) ends the
//! pass; no partially built index is handed back.

use crate::index::{GeohashIndex, IndexStats, Resolution, TimeIndex};
use crate::ingest::{parse_record, IngestStats, InputSet};
use crate::storage::{GeohashKey, Record, RecordId, RecordStore, StorageResult};

/// Configuration for the index manager
#[derive(Debug, Clone, Default)]
pub struct IndexConfig {
    /// Keys admitted to the geohash index; empty admits every key
    pub allow_list: Vec<GeohashKey>,
}

impl IndexConfig {
    pub fn with_allow_list(allow_list: Vec<GeohashKey>) -> Self {
        Self { allow_list }
    }
}

/// Coordinates the record store and both indices
pub struct IndexManager {
    store: RecordStore,
    time_index: TimeIndex,
    geohash_index: GeohashIndex,
    /// Allow-list mode: only pre-registered keys get geohash buckets
    filtering: bool,
    stats: IngestStats,
}

impl Default for IndexManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexManager {
    /// Create a manager that indexes every key
    pub fn new() -> Self {
        Self {
            store: RecordStore::new(),
            time_index: TimeIndex::new(),
            geohash_index: GeohashIndex::new(),
            filtering: false,
            stats: IngestStats::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: IndexConfig) -> StorageResult<Self> {
        let mut manager = Self::new();

        if !config.allow_list.is_empty() {
            for key in &config.allow_list {
                manager.geohash_index.preregister(key)?;
            }
            manager.filtering = true;
            tracing::info!(
                "Geohash allow-list active with {} keys",
                manager.geohash_index.bucket_count()
            );
        }

        Ok(manager)
    }

    // ==================== Ingestion ====================

    /// Read every line from `inputs` and index the ones that parse
    pub fn ingest(&mut self, inputs: InputSet) -> StorageResult<&IngestStats> {
        inputs.for_each_line(|line| self.ingest_line(line).map(|_| ()))?;

        tracing::info!("Ingestion complete: {}", self.stats);
        Ok(&self.stats)
    }

    /// Parse and index one line
    ///
    /// A malformed line is counted and skipped (`Ok(None)`).
    pub fn ingest_line(&mut self, line: &[u8]) -> StorageResult<Option<RecordId>> {
        self.stats.lines_read += 1;

        match parse_record(line) {
            Ok(record) => self.index_record(record).map(Some),
            Err(err) => {
                tracing::warn!(
                    "Skipping line {}: {} ({:?})",
                    self.stats.lines_read,
                    err,
                    String::from_utf8_lossy(line).trim_end()
                );
                self.stats.record_rejection(&err);
                Ok(None)
            }
        }
    }

    /// Store a parsed record and reference it from both indices
    pub fn index_record(&mut self, record: Record) -> StorageResult<RecordId> {
        let id = self.store.push(record)?;
        self.stats.records_accepted += 1;

        self.time_index.insert(id, &record)?;

        if !self.geohash_index.insert(id, &record, !self.filtering)? {
            self.stats.geohash_excluded += 1;
        }

        Ok(id)
    }

    // ==================== Accessors ====================

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn time_index(&self) -> &TimeIndex {
        &self.time_index
    }

    pub fn geohash_index(&self) -> &GeohashIndex {
        &self.geohash_index
    }

    pub fn ingest_stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Whether the geohash index runs in allow-list mode
    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    /// Snapshot of index occupancy
    pub fn index_stats(&self) -> IndexStats {
        IndexStats {
            records: self.store.len(),
            time_blocks: self.time_index.arena().block_count(),
            day_slots: self.time_index.occupied_slots(Resolution::Day),
            hour_slots: self.time_index.occupied_slots(Resolution::Hour),
            quarter_slots: self.time_index.occupied_slots(Resolution::Quarter),
            geohash_records: self.geohash_index.len(),
            geohash_blocks: self.geohash_index.arena().block_count(),
            buckets: self.geohash_index.bucket_count(),
            hash_slots: self.geohash_index.occupied_slots(),
            longest_bucket_chain: self.geohash_index.longest_chain(),
        }
    }
}
