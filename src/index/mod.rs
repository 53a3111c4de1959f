//! Geodemand Index Structures
//!
//! Two complementary indices over the same record store:
//!
//! - **TimeIndex**: day / hour / quarter-hour slot arrays
//! - **GeohashIndex**: chained hash table keyed by geohash
//!
//! Both store record references in [`BlockChain`]s, fixed-capacity blocks
//! linked newest to oldest.
//!
//! # Architecture
//!
//! ```text
//! line → parse → RecordStore.push → RecordId
//!                                      ├─► TimeIndex.insert    (3 slots)
//!                                      └─► GeohashIndex.insert (1 bucket)
//! ```

mod block;
mod geohash_index;
mod manager;
mod time_index;

pub use block::{Block, BlockArena, BlockChain, BlockId, Blocks, BLOCK_CAPACITY};
pub use geohash_index::{hash_bytes, hash_key, BucketId, GeohashBucket, GeohashIndex, TABLE_SIZE};
pub use manager::{IndexConfig, IndexManager};
pub use time_index::{
    Resolution, TimeIndex, TimeSlot, DAY_SLOTS, HOUR_SLOTS, HOURS_PER_DAY, MINUTES_PER_QUARTER,
    QUARTERS_PER_HOUR, QUARTER_SLOTS,
};

use serde::Serialize;

/// Statistics about index usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Records in the store
    pub records: usize,
    /// Blocks allocated by the time index
    pub time_blocks: usize,
    /// Non-empty day slots
    pub day_slots: usize,
    /// Non-empty hour slots
    pub hour_slots: usize,
    /// Non-empty quarter-hour slots
    pub quarter_slots: usize,
    /// Records referenced by the geohash index
    pub geohash_records: usize,
    /// Blocks allocated by the geohash index
    pub geohash_blocks: usize,
    /// Distinct geohash buckets
    pub buckets: usize,
    /// Hash table slots holding at least one bucket
    pub hash_slots: usize,
    /// Longest bucket chain in a single hash slot
    pub longest_bucket_chain: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Records:            {}", self.records)?;
        writeln!(
            f,
            "Time slots in use:  {} days, {} hours, {} quarters",
            self.day_slots, self.hour_slots, self.quarter_slots
        )?;
        writeln!(f, "Time blocks:        {}", self.time_blocks)?;
        writeln!(f, "Geohash records:    {}", self.geohash_records)?;
        writeln!(f, "Geohash buckets:    {}", self.buckets)?;
        writeln!(
            f,
            "Hash slots in use:  {} of {} (longest chain {})",
            self.hash_slots, TABLE_SIZE, self.longest_bucket_chain
        )?;
        write!(f, "Geohash blocks:     {}", self.geohash_blocks)
    }
}
