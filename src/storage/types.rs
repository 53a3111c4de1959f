//! Core data types for demand records
//!
//! - `GeohashKey`: opaque fixed-width spatial key
//! - `Record`: one parsed demand observation
//! - `RecordId`: stable position of a record in the store

use serde::{Serialize, Serializer};
use std::fmt;

/// Maximum number of bytes in a geohash key
pub const GEOHASH_LEN: usize = 6;

/// Fixed-width spatial key, compared byte for byte
///
/// Keys shorter than [`GEOHASH_LEN`] are zero padded; the stored length
/// keeps `"ab"` and `"ab\0"` distinct.
///
/// Geohashes are ASCII. Other bytes are stored and indexed as read, but
/// [`Display`](fmt::Display) renders invalid UTF-8 lossily, so such a key
/// does not survive a report round trip.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GeohashKey {
    bytes: [u8; GEOHASH_LEN],
    len: u8,
}

impl GeohashKey {
    /// Build a key from raw bytes, or `None` if longer than [`GEOHASH_LEN`]
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        if raw.len() > GEOHASH_LEN {
            return None;
        }

        let mut bytes = [0u8; GEOHASH_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// Key bytes without padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::str::FromStr for GeohashKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes()).ok_or_else(|| {
            format!("geohash '{}' is longer than {} characters", s, GEOHASH_LEN)
        })
    }
}

impl fmt::Display for GeohashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for GeohashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeohashKey({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl Serialize for GeohashKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single demand observation
///
/// Immutable once appended to the [`RecordStore`](super::RecordStore).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Record {
    /// Spatial key (geohash, precision 6)
    pub key: GeohashKey,
    /// Day of year, 1-based
    pub day: u32,
    /// Hour of day
    pub hour: u32,
    /// Minute of hour
    pub minute: u32,
    /// Demand magnitude
    pub value: f64,
}

impl Record {
    pub fn new(key: GeohashKey, day: u32, hour: u32, minute: u32, value: f64) -> Self {
        Self {
            key,
            day,
            hour,
            minute,
            value,
        }
    }
}

/// Stable position of a record in the store
///
/// Indices hold these instead of references so the store may reallocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(pub u32);

impl RecordId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
