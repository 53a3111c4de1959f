//! Geodemand record storage
//!
//! - **types**: Core data structures (GeohashKey, Record, RecordId)
//! - **store**: Append-only record store every index points into
//! - **error**: Error types
//!
//! # Ownership
//!
//! ```text
//!   RecordStore (owns Records)
//!        ↑ RecordId            ↑ RecordId
//!   TimeIndex blocks      GeohashIndex blocks
//! ```

pub mod error;
pub mod store;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use store::{RecordStore, STORE_GROWTH_STEP};
pub use types::{GeohashKey, Record, RecordId, GEOHASH_LEN};
