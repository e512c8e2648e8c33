use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{FoldcastError, Result};

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const SEGMENT_COLUMN: &str = "segment";
pub const TARGET_COLUMN: &str = "target";
pub const FOLD_COLUMN: &str = "fold_number";

/// Per-segment feature values, keyed by segment name
pub type SegmentValues = BTreeMap<String, Vec<Option<f64>>>;

/// Per-metric, per-segment scores: `metric name -> segment -> value`
pub type MetricsTable = BTreeMap<String, BTreeMap<String, f64>>;

/// Inclusive time range covered by a train or test slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }
}

pub fn to_millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

pub fn from_millis(ms: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| FoldcastError::Dataset(format!("Invalid timestamp: {}", ms)))
}
