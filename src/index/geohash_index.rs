//! Geohash Index - chained hash table keyed by geohash
//!
//! A fixed table of [`TABLE_SIZE`] slots. Each slot heads a singly linked
//! chain of [`GeohashBucket`]s, one per distinct key hashing there, and each
//! bucket owns a [`BlockChain`] of the records carrying its key.
//!
//! # Filtering
//! Insertion takes an explicit `create_if_absent` flag. With it cleared,
//! only keys registered beforehand via [`GeohashIndex::preregister`] are
//! indexed and records for any other key are skipped. The same path thus
//! serves both "index everything" and allow-list runs.

use crate::index::{BlockArena, BlockChain};
use crate::storage::{GeohashKey, Record, RecordId, StorageError, StorageResult};

/// Number of hash table slots
pub const TABLE_SIZE: usize = 5000;

const HASH_BASE: i64 = 37;

/// Table slot for a key
pub fn hash_key(key: &GeohashKey) -> usize {
    hash_bytes(key.as_bytes())
}

/// Base-37 polynomial hash reduced to a table slot
///
/// The accumulator wraps on overflow and is masked to 63 bits before the
/// final modulo, so the result is always in `0..TABLE_SIZE`.
pub fn hash_bytes(bytes: &[u8]) -> usize {
    let h = bytes.iter().fold(0i64, |h, &b| {
        h.wrapping_mul(HASH_BASE).wrapping_add(b as i64)
    });
    ((h & i64::MAX) as u64 % TABLE_SIZE as u64) as usize
}

/// Position of a bucket inside the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketId(u32);

/// All records sharing one key
#[derive(Debug)]
pub struct GeohashBucket {
    key: GeohashKey,
    chain: BlockChain,
    next: Option<BucketId>,
}

impl GeohashBucket {
    pub fn key(&self) -> &GeohashKey {
        &self.key
    }

    pub fn chain(&self) -> BlockChain {
        self.chain
    }
}

/// Hash table of geohash buckets
pub struct GeohashIndex {
    table: Box<[Option<BucketId>]>,
    buckets: Vec<GeohashBucket>,
    arena: BlockArena,
    records: usize,
}

impl Default for GeohashIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl GeohashIndex {
    pub fn new() -> Self {
        Self {
            table: vec![None; TABLE_SIZE].into_boxed_slice(),
            buckets: Vec::new(),
            arena: BlockArena::new(),
            records: 0,
        }
    }

    /// Scan the key's slot chain for an existing bucket
    pub fn find_bucket(&self, key: &GeohashKey) -> Option<BucketId> {
        self.slot_chain(hash_key(key))
            .find(|(_, bucket)| bucket.key == *key)
            .map(|(id, _)| id)
    }

    /// Find the bucket for `key`, creating it at the head of its slot chain
    /// if missing and `create_if_absent` is set
    pub fn find_or_create_bucket(
        &mut self,
        key: &GeohashKey,
        create_if_absent: bool,
    ) -> StorageResult<Option<BucketId>> {
        if let Some(id) = self.find_bucket(key) {
            return Ok(Some(id));
        }
        if !create_if_absent {
            return Ok(None);
        }
        self.create_bucket(key).map(Some)
    }

    /// Register a key with an empty chain ahead of ingestion
    pub fn preregister(&mut self, key: &GeohashKey) -> StorageResult<BucketId> {
        match self.find_bucket(key) {
            Some(id) => Ok(id),
            None => self.create_bucket(key),
        }
    }

    fn create_bucket(&mut self, key: &GeohashKey) -> StorageResult<BucketId> {
        let slot = hash_key(key);
        let id = BucketId(
            u32::try_from(self.buckets.len()).map_err(|_| StorageError::Exhausted("bucket ids"))?,
        );
        self.buckets
            .try_reserve(1)
            .map_err(|_| StorageError::Exhausted("geohash bucket"))?;

        self.buckets.push(GeohashBucket {
            key: *key,
            chain: BlockChain::new(),
            next: self.table[slot],
        });
        self.table[slot] = Some(id);

        tracing::trace!("Created bucket for {} in slot {}", key, slot);
        Ok(id)
    }

    /// Append `id` to the bucket for `record.key`
    ///
    /// Returns `false` when no bucket exists and `create_if_absent` is
    /// cleared; the record is then left out of this index.
    pub fn insert(
        &mut self,
        id: RecordId,
        record: &Record,
        create_if_absent: bool,
    ) -> StorageResult<bool> {
        let Some(bucket) = self.find_or_create_bucket(&record.key, create_if_absent)? else {
            return Ok(false);
        };

        self.arena
            .append(&mut self.buckets[bucket.0 as usize].chain, id)?;
        self.records += 1;
        Ok(true)
    }

    pub fn bucket(&self, id: BucketId) -> &GeohashBucket {
        &self.buckets[id.0 as usize]
    }

    /// Bucket holding `key`, if any
    pub fn lookup(&self, key: &GeohashKey) -> Option<&GeohashBucket> {
        self.find_bucket(key).map(|id| self.bucket(id))
    }

    /// References for `key`, head block first; empty for unknown keys
    pub fn records_for(&self, key: &GeohashKey) -> impl Iterator<Item = RecordId> + '_ {
        let chain = self.lookup(key).map(|b| b.chain).unwrap_or_default();
        self.arena.iter(chain)
    }

    fn slot_chain(&self, slot: usize) -> impl Iterator<Item = (BucketId, &GeohashBucket)> + '_ {
        let mut cursor = self.table.get(slot).copied().flatten();
        std::iter::from_fn(move || {
            let id = cursor?;
            let bucket = self.bucket(id);
            cursor = bucket.next;
            Some((id, bucket))
        })
    }

    /// Buckets chained at one table slot, most recently created first
    pub fn buckets_in_slot(&self, slot: usize) -> impl Iterator<Item = &GeohashBucket> + '_ {
        self.slot_chain(slot).map(|(_, bucket)| bucket)
    }

    /// All buckets, slot order ascending then chain order
    pub fn buckets(&self) -> impl Iterator<Item = &GeohashBucket> + '_ {
        (0..TABLE_SIZE).flat_map(move |slot| self.buckets_in_slot(slot))
    }

    /// Visit every indexed reference with its bucket, in table order
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&GeohashBucket, RecordId),
    {
        for bucket in self.buckets() {
            self.arena.for_each(bucket.chain, |id| visitor(bucket, id));
        }
    }

    /// Block storage backing every bucket
    pub fn arena(&self) -> &BlockArena {
        &self.arena
    }

    /// Distinct keys with a bucket (registered or seen)
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Table slots with at least one bucket
    pub fn occupied_slots(&self) -> usize {
        self.table.iter().filter(|slot| slot.is_some()).count()
    }

    /// Longest bucket chain in any slot
    pub fn longest_chain(&self) -> usize {
        (0..TABLE_SIZE)
            .map(|slot| self.slot_chain(slot).count())
            .max()
            .unwrap_or(0)
    }

    /// Records indexed
    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}
