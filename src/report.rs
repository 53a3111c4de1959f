//! Reporter - renders indexed records
//!
//! Walks either index and writes the referenced records in index order:
//! slots ascending (or buckets in table order), and within a slot the
//! newest block first unless chronological order is requested.
//!
//! Output formats:
//! - `records`: one `KEY,DD,HH:MM,VALUE` line per record
//! - `summary`: one aggregate line per non-empty slot or bucket
//! - `json`: the same aggregates as a JSON array

use crate::index::{BlockArena, BlockChain, IndexManager, Resolution};
use crate::storage::{GeohashKey, Record, RecordId, RecordStore, StorageResult};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;

/// Which index to walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Time,
    Geohash,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "time" => Ok(View::Time),
            "geohash" | "geo" => Ok(View::Geohash),
            other => Err(format!("Unknown view: {}. Use: time, geohash", other)),
        }
    }
}

/// Output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Records,
    Summary,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "records" => Ok(ReportFormat::Records),
            "summary" => Ok(ReportFormat::Summary),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!(
                "Unknown format: {}. Use: records, summary, json",
                other
            )),
        }
    }
}

/// What to report and how
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub view: View,
    pub resolution: Resolution,
    /// First slot (inclusive); defaults to 0
    pub from: Option<usize>,
    /// Last slot (inclusive); defaults to the resolution's last slot
    pub to: Option<usize>,
    /// Geohash view only: restrict to these keys, in this order
    pub keys: Vec<GeohashKey>,
    pub format: ReportFormat,
    /// Visit each chain oldest block first
    pub chronological: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            view: View::Time,
            resolution: Resolution::Day,
            from: None,
            to: None,
            keys: Vec::new(),
            format: ReportFormat::Records,
            chronological: false,
        }
    }
}

impl ReportOptions {
    /// Filters set on these options that the chosen view does not apply
    pub fn ignored_filters(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        match self.view {
            View::Time => {
                if !self.keys.is_empty() {
                    ignored.push("key");
                }
            }
            View::Geohash => {
                if self.from.is_some() {
                    ignored.push("from");
                }
                if self.to.is_some() {
                    ignored.push("to");
                }
            }
        }
        ignored
    }
}

/// Render one record as `KEY,DD,HH:MM,VALUE`
pub fn format_record(record: &Record) -> String {
    format!(
        "{},{:02},{:02}:{:02},{:.6}",
        record.key, record.day, record.hour, record.minute, record.value
    )
}

/// Aggregate over the records of one slot or bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotSummary {
    pub label: String,
    pub count: usize,
    pub total: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SlotSummary {
    /// Aggregate `ids`; `None` when there are no records
    pub fn from_records(label: String, ids: &[RecordId], store: &RecordStore) -> Option<Self> {
        if ids.is_empty() {
            return None;
        }

        let mut total = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &id in ids {
            let value = store[id].value;
            total += value;
            min = min.min(value);
            max = max.max(value);
        }

        Some(Self {
            label,
            count: ids.len(),
            total,
            min,
            max,
            mean: total / ids.len() as f64,
        })
    }
}

impl std::fmt::Display for SlotSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<14} count={} total={:.6} mean={:.6} min={:.6} max={:.6}",
            self.label, self.count, self.total, self.mean, self.min, self.max
        )
    }
}

/// A labelled run of record ids in traversal order
struct Group {
    label: String,
    ids: Vec<RecordId>,
}

/// Renders reports from a populated [`IndexManager`]
pub struct Reporter<'a> {
    manager: &'a IndexManager,
}

impl<'a> Reporter<'a> {
    pub fn new(manager: &'a IndexManager) -> Self {
        Self { manager }
    }

    /// Write the report described by `options` to `out`
    pub fn render<W: Write>(&self, out: &mut W, options: &ReportOptions) -> StorageResult<()> {
        for filter in options.ignored_filters() {
            tracing::warn!("--{} has no effect on the {:?} view", filter, options.view);
        }

        let groups = match options.view {
            View::Time => self.time_groups(options)?,
            View::Geohash => self.geohash_groups(options),
        };

        tracing::debug!("Rendering {} groups as {:?}", groups.len(), options.format);

        match options.format {
            ReportFormat::Records => self.write_records(out, &groups)?,
            ReportFormat::Summary => {
                for summary in self.summaries(&groups) {
                    writeln!(out, "{}", summary)?;
                }
            }
            ReportFormat::Json => {
                let summaries = self.summaries(&groups);
                serde_json::to_writer_pretty(&mut *out, &summaries)
                    .map_err(std::io::Error::from)?;
                writeln!(out)?;
            }
        }

        out.flush()?;
        Ok(())
    }

    /// Per-slot aggregates for a time range
    pub fn time_summaries(
        &self,
        resolution: Resolution,
        low: usize,
        high: usize,
    ) -> StorageResult<Vec<SlotSummary>> {
        let options = ReportOptions {
            resolution,
            from: Some(low),
            to: Some(high),
            ..ReportOptions::default()
        };
        Ok(self.summaries(&self.time_groups(&options)?))
    }

    /// Per-bucket aggregates for the whole geohash index
    pub fn geohash_summaries(&self) -> Vec<SlotSummary> {
        let options = ReportOptions {
            view: View::Geohash,
            ..ReportOptions::default()
        };
        self.summaries(&self.geohash_groups(&options))
    }

    fn time_groups(&self, options: &ReportOptions) -> StorageResult<Vec<Group>> {
        let index = self.manager.time_index();
        let res = options.resolution;
        let low = options.from.unwrap_or(0);
        let high = options.to.unwrap_or(res.slots() - 1);

        Ok(index
            .slots_in_range(res, low, high)?
            .map(|(slot, chain)| Group {
                label: res.label(slot),
                ids: collect_chain(index.arena(), chain, options.chronological),
            })
            .collect())
    }

    fn geohash_groups(&self, options: &ReportOptions) -> Vec<Group> {
        let index = self.manager.geohash_index();
        let arena = index.arena();

        if options.keys.is_empty() {
            return index
                .buckets()
                .map(|bucket| Group {
                    label: bucket.key().to_string(),
                    ids: collect_chain(arena, bucket.chain(), options.chronological),
                })
                .collect();
        }

        options
            .keys
            .iter()
            .filter_map(|key| match index.lookup(key) {
                Some(bucket) => Some(Group {
                    label: key.to_string(),
                    ids: collect_chain(arena, bucket.chain(), options.chronological),
                }),
                None => {
                    tracing::debug!("No bucket for geohash {}", key);
                    None
                }
            })
            .collect()
    }

    fn write_records<W: Write>(&self, out: &mut W, groups: &[Group]) -> StorageResult<()> {
        let store = self.manager.store();
        for group in groups {
            for &id in &group.ids {
                writeln!(out, "{}", format_record(&store[id]))?;
            }
        }
        Ok(())
    }

    fn summaries(&self, groups: &[Group]) -> Vec<SlotSummary> {
        let store = self.manager.store();
        groups
            .iter()
            .filter_map(|g| SlotSummary::from_records(g.label.clone(), &g.ids, store))
            .collect()
    }
}

fn collect_chain(arena: &BlockArena, chain: BlockChain, chronological: bool) -> Vec<RecordId> {
    let mut ids = Vec::with_capacity(arena.chain_len(chain));
    if chronological {
        arena.for_each_chronological(chain, |id| ids.push(id));
    } else {
        arena.for_each(chain, |id| ids.push(id));
    }
    ids
}
