//! Record Store - append-only home of every parsed record
//!
//! Records are never mutated or removed once appended. Indices refer to
//! them by [`RecordId`], which stays valid across reallocation.

use crate::storage::{Record, RecordId, StorageError, StorageResult};

/// Logical capacity step used when the store grows
pub const STORE_GROWTH_STEP: usize = 500;

/// Growable, append-only sequence of records
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, growing by [`STORE_GROWTH_STEP`] when full
    pub fn push(&mut self, record: Record) -> StorageResult<RecordId> {
        let id = u32::try_from(self.records.len())
            .map_err(|_| StorageError::Exhausted("record ids"))?;

        if self.records.len() == self.records.capacity() {
            self.records
                .try_reserve_exact(STORE_GROWTH_STEP)
                .map_err(|_| StorageError::Exhausted("record store"))?;
        }

        self.records.push(record);
        Ok(RecordId(id))
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current allocated capacity in records
    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// Iterate records in ingestion order with their ids
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (RecordId(i as u32), r))
    }
}

impl std::ops::Index<RecordId> for RecordStore {
    type Output = Record;

    fn index(&self, id: RecordId) -> &Record {
        &self.records[id.index()]
    }
}
