//! Time Index - fixed slot arrays at three resolutions
//!
//! Every record is referenced from exactly one slot per resolution:
//!
//! ```text
//! day      [0..365)     day - 1
//! hour     [0..8760)    day_idx * 24 + hour
//! quarter  [0..35040)   hour_idx * 4 + minute / 15
//! ```
//!
//! Each slot is a [`BlockChain`] into the index's own [`BlockArena`].
//! A record whose fields fall outside the covered year is a precondition
//! violation and fails the insert without touching any slot.

use crate::index::{BlockArena, BlockChain};
use crate::storage::{Record, RecordId, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DAYS_PER_YEAR: usize = 365;
pub const HOURS_PER_DAY: usize = 24;
pub const QUARTERS_PER_HOUR: usize = 4;
pub const MINUTES_PER_QUARTER: usize = 15;

pub const DAY_SLOTS: usize = DAYS_PER_YEAR;
pub const HOUR_SLOTS: usize = DAY_SLOTS * HOURS_PER_DAY;
pub const QUARTER_SLOTS: usize = HOUR_SLOTS * QUARTERS_PER_HOUR;

/// Granularity of a time slot array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Day,
    Hour,
    Quarter,
}

impl Resolution {
    pub fn all() -> &'static [Resolution] {
        &[Resolution::Day, Resolution::Hour, Resolution::Quarter]
    }

    /// Number of slots at this resolution
    pub fn slots(self) -> usize {
        match self {
            Resolution::Day => DAY_SLOTS,
            Resolution::Hour => HOUR_SLOTS,
            Resolution::Quarter => QUARTER_SLOTS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Resolution::Day => "day",
            Resolution::Hour => "hour",
            Resolution::Quarter => "quarter",
        }
    }

    /// Human readable label for a slot, e.g. `day 5 09:15`
    pub fn label(self, slot: usize) -> String {
        match self {
            Resolution::Day => format!("day {}", slot + 1),
            Resolution::Hour => format!(
                "day {} {:02}h",
                slot / HOURS_PER_DAY + 1,
                slot % HOURS_PER_DAY
            ),
            Resolution::Quarter => {
                let hour = slot / QUARTERS_PER_HOUR;
                format!(
                    "day {} {:02}:{:02}",
                    hour / HOURS_PER_DAY + 1,
                    hour % HOURS_PER_DAY,
                    (slot % QUARTERS_PER_HOUR) * MINUTES_PER_QUARTER
                )
            }
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "d" => Ok(Resolution::Day),
            "hour" | "h" => Ok(Resolution::Hour),
            "quarter" | "quarter-hour" | "15m" | "q" => Ok(Resolution::Quarter),
            other => Err(format!(
                "Unknown resolution: {}. Use: day, hour, quarter",
                other
            )),
        }
    }
}

/// The three slots a record lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub day: usize,
    pub hour: usize,
    pub quarter: usize,
}

impl TimeSlot {
    /// Compute slots for a record, rejecting values outside the year
    ///
    /// Minutes are floor-divided into quarters; any minute in 0..60 is
    /// accepted.
    pub fn for_record(record: &Record) -> StorageResult<Self> {
        if record.day == 0 || record.day as usize > DAYS_PER_YEAR {
            return Err(StorageError::SlotOutOfRange {
                field: "day",
                value: record.day,
            });
        }
        if record.hour as usize >= HOURS_PER_DAY {
            return Err(StorageError::SlotOutOfRange {
                field: "hour",
                value: record.hour,
            });
        }
        if record.minute as usize >= QUARTERS_PER_HOUR * MINUTES_PER_QUARTER {
            return Err(StorageError::SlotOutOfRange {
                field: "minute",
                value: record.minute,
            });
        }

        let day = record.day as usize - 1;
        let hour = day * HOURS_PER_DAY + record.hour as usize;
        let quarter = hour * QUARTERS_PER_HOUR + record.minute as usize / MINUTES_PER_QUARTER;

        Ok(Self {
            day: check_bound(Resolution::Day, day)?,
            hour: check_bound(Resolution::Hour, hour)?,
            quarter: check_bound(Resolution::Quarter, quarter)?,
        })
    }

    pub fn get(&self, resolution: Resolution) -> usize {
        match resolution {
            Resolution::Day => self.day,
            Resolution::Hour => self.hour,
            Resolution::Quarter => self.quarter,
        }
    }
}

fn check_bound(resolution: Resolution, slot: usize) -> StorageResult<usize> {
    if slot < resolution.slots() {
        Ok(slot)
    } else {
        Err(StorageError::SlotOutOfRange {
            field: resolution.name(),
            value: u32::try_from(slot).unwrap_or(u32::MAX),
        })
    }
}

/// Multi-resolution time index over a record store
pub struct TimeIndex {
    day: Box<[BlockChain]>,
    hour: Box<[BlockChain]>,
    quarter: Box<[BlockChain]>,
    arena: BlockArena,
    records: usize,
}

impl Default for TimeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeIndex {
    pub fn new() -> Self {
        Self {
            day: vec![BlockChain::EMPTY; DAY_SLOTS].into_boxed_slice(),
            hour: vec![BlockChain::EMPTY; HOUR_SLOTS].into_boxed_slice(),
            quarter: vec![BlockChain::EMPTY; QUARTER_SLOTS].into_boxed_slice(),
            arena: BlockArena::new(),
            records: 0,
        }
    }

    /// Reference `id` from its day, hour and quarter slots
    pub fn insert(&mut self, id: RecordId, record: &Record) -> StorageResult<TimeSlot> {
        let slot = TimeSlot::for_record(record)?;

        self.arena.append(&mut self.day[slot.day], id)?;
        self.arena.append(&mut self.hour[slot.hour], id)?;
        self.arena.append(&mut self.quarter[slot.quarter], id)?;
        self.records += 1;

        Ok(slot)
    }

    fn slots(&self, resolution: Resolution) -> &[BlockChain] {
        match resolution {
            Resolution::Day => &self.day,
            Resolution::Hour => &self.hour,
            Resolution::Quarter => &self.quarter,
        }
    }

    /// Chain held by one slot, `None` if the slot does not exist
    pub fn chain(&self, resolution: Resolution, slot: usize) -> Option<BlockChain> {
        self.slots(resolution).get(slot).copied()
    }

    /// References held by one slot, head block first
    pub fn records(
        &self,
        resolution: Resolution,
        slot: usize,
    ) -> impl Iterator<Item = RecordId> + '_ {
        let chain = self.chain(resolution, slot).unwrap_or_default();
        self.arena.iter(chain)
    }

    /// Non-empty slots in `low..=high` with their chains
    pub fn slots_in_range(
        &self,
        resolution: Resolution,
        low: usize,
        high: usize,
    ) -> StorageResult<impl Iterator<Item = (usize, BlockChain)> + '_> {
        let slots = self.slots(resolution);
        if low > high || high >= slots.len() {
            return Err(StorageError::InvalidSlotRange {
                resolution: resolution.name(),
                low,
                high,
                slots: slots.len(),
            });
        }

        Ok(slots[low..=high]
            .iter()
            .enumerate()
            .filter(|(_, chain)| !chain.is_empty())
            .map(move |(offset, chain)| (low + offset, *chain)))
    }

    /// Visit every reference in slots `low..=high`, skipping empty slots
    pub fn for_each_in_range<F>(
        &self,
        resolution: Resolution,
        low: usize,
        high: usize,
        mut visitor: F,
    ) -> StorageResult<()>
    where
        F: FnMut(usize, RecordId),
    {
        for (slot, chain) in self.slots_in_range(resolution, low, high)? {
            self.arena.for_each(chain, |id| visitor(slot, id));
        }
        Ok(())
    }

    /// Block storage backing every slot
    pub fn arena(&self) -> &BlockArena {
        &self.arena
    }

    /// Number of slots holding at least one record
    pub fn occupied_slots(&self, resolution: Resolution) -> usize {
        self.slots(resolution)
            .iter()
            .filter(|chain| !chain.is_empty())
            .count()
    }

    /// Records inserted
    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, hour: u32, minute: u32) -> Record {
        Record::new("a1b2c3".parse().unwrap(), day, hour, minute, 1.0)
    }

    #[test]
    fn test_slot_placement() {
        let slot = TimeSlot::for_record(&record(5, 9, 15)).unwrap();
        assert_eq!(slot.day, 4);
        assert_eq!(slot.hour, 105);
        assert_eq!(slot.quarter, 421);
    }

    #[test]
    fn test_year_edges() {
        let first = TimeSlot::for_record(&record(1, 0, 0)).unwrap();
        assert_eq!((first.day, first.hour, first.quarter), (0, 0, 0));

        let last = TimeSlot::for_record(&record(365, 23, 59)).unwrap();
        assert_eq!(last.day, DAY_SLOTS - 1);
        assert_eq!(last.hour, HOUR_SLOTS - 1);
        assert_eq!(last.quarter, QUARTER_SLOTS - 1);
    }

    #[test]
    fn test_minutes_are_floor_divided() {
        let quarters: Vec<usize> = [0, 14, 15, 29, 44, 45, 59]
            .iter()
            .map(|&m| TimeSlot::for_record(&record(1, 0, m)).unwrap().quarter)
            .collect();
        assert_eq!(quarters, vec![0, 0, 1, 1, 2, 3, 3]);
    }

    #[test]
    fn test_out_of_range_fields_are_rejected() {
        for (rec, field) in [
            (record(0, 0, 0), "day"),
            (record(366, 0, 0), "day"),
            (record(1, 24, 0), "hour"),
            (record(1, 0, 60), "minute"),
        ] {
            match TimeSlot::for_record(&rec) {
                Err(StorageError::SlotOutOfRange { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected {} violation, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_rejected_insert_leaves_index_untouched() {
        let mut index = TimeIndex::new();
        assert!(index.insert(RecordId(0), &record(400, 1, 0)).is_err());

        assert!(index.is_empty());
        assert_eq!(index.arena().block_count(), 0);
        for &res in Resolution::all() {
            assert_eq!(index.occupied_slots(res), 0);
        }
    }

    #[test]
    fn test_record_reachable_once_per_resolution() {
        let mut index = TimeIndex::new();
        let records = [record(5, 9, 15), record(5, 9, 20), record(5, 10, 0), record(6, 0, 0)];
        for (i, r) in records.iter().enumerate() {
            index.insert(RecordId(i as u32), r).unwrap();
        }

        for (i, r) in records.iter().enumerate() {
            let id = RecordId(i as u32);
            let slot = TimeSlot::for_record(r).unwrap();

            for &res in Resolution::all() {
                let hits: usize = (0..res.slots())
                    .map(|s| index.records(res, s).filter(|&x| x == id).count())
                    .sum();
                assert_eq!(hits, 1, "record {} in {}", i, res);
                assert!(index.records(res, slot.get(res)).any(|x| x == id));
            }

            assert_eq!(slot.hour / HOURS_PER_DAY, slot.day);
            assert_eq!(slot.quarter / QUARTERS_PER_HOUR, slot.hour);
        }

        assert_eq!(index.len(), 4);
        assert_eq!(index.occupied_slots(Resolution::Day), 2);
        assert_eq!(index.occupied_slots(Resolution::Hour), 3);
        assert_eq!(index.occupied_slots(Resolution::Quarter), 3);
    }

    #[test]
    fn test_for_each_in_range_skips_empty_slots() {
        let mut index = TimeIndex::new();
        index.insert(RecordId(0), &record(2, 0, 0)).unwrap();
        index.insert(RecordId(1), &record(4, 0, 0)).unwrap();
        index.insert(RecordId(2), &record(4, 12, 0)).unwrap();
        index.insert(RecordId(3), &record(9, 0, 0)).unwrap();

        let mut visited = Vec::new();
        index
            .for_each_in_range(Resolution::Day, 0, 5, |slot, id| visited.push((slot, id.0)))
            .unwrap();

        assert_eq!(visited, vec![(1, 0), (3, 1), (3, 2)]);

        let slots: Vec<usize> = index
            .slots_in_range(Resolution::Day, 0, DAY_SLOTS - 1)
            .unwrap()
            .map(|(slot, _)| slot)
            .collect();
        assert_eq!(slots, vec![1, 3, 8]);
    }

    #[test]
    fn test_invalid_range() {
        let index = TimeIndex::new();
        assert!(matches!(
            index.for_each_in_range(Resolution::Hour, 10, 5, |_, _| {}),
            Err(StorageError::InvalidSlotRange { .. })
        ));
        assert!(index
            .for_each_in_range(Resolution::Day, 0, DAY_SLOTS, |_, _| {})
            .is_err());
        assert!(index
            .for_each_in_range(Resolution::Quarter, 0, QUARTER_SLOTS - 1, |_, _| {})
            .is_ok());
    }

    #[test]
    fn test_chain_lookup_out_of_bounds() {
        let index = TimeIndex::new();
        assert!(index.chain(Resolution::Day, DAY_SLOTS).is_none());
        assert_eq!(index.records(Resolution::Day, DAY_SLOTS).count(), 0);
        assert!(index.chain(Resolution::Day, 0).unwrap().is_empty());
    }

    #[test]
    fn test_resolution_parse_and_label() {
        assert_eq!("hour".parse::<Resolution>().unwrap(), Resolution::Hour);
        assert_eq!("Quarter".parse::<Resolution>().unwrap(), Resolution::Quarter);
        assert!("week".parse::<Resolution>().is_err());

        assert_eq!(Resolution::Day.label(4), "day 5");
        assert_eq!(Resolution::Hour.label(105), "day 5 09h");
        assert_eq!(Resolution::Quarter.label(421), "day 5 09:15");
    }
}
