// src/models/report.rs

//! Run reporting: anomalies, per work item outcomes and run totals.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cursor, RecordScope};

/// A failed fetch attempt that the retry policy absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub source: RecordScope,
    pub work_item: String,
    pub cursor: Cursor,
    /// 1-based attempt number
    pub attempt: u32,
    pub message: String,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {} attempt {}: {}",
            self.source, self.work_item, self.cursor, self.attempt, self.message
        )
    }
}

/// How harvested records reach the gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Wait for every work item, then admit the merged batch once
    #[default]
    Gather,
    /// Admit each work item's records as soon as it completes
    Streaming,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Gather => f.write_str("gather"),
            MergeMode::Streaming => f.write_str("streaming"),
        }
    }
}

/// Outcome of one work item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemSummary {
    pub work_item: String,
    pub pages: u32,
    /// Fetch calls including retries
    pub fetches: u32,
    /// Raw entries extracted
    pub harvested: usize,
    pub normalized: usize,
    /// Entries dropped for a missing field
    pub skipped: usize,
    /// Records that passed the gate
    pub accepted: usize,
    pub anomalies: Vec<Anomaly>,
    /// Set when the work item failed as a whole
    pub fault: Option<String>,
    /// Stopped by the page cap
    pub truncated: bool,
}

/// Run-level report, also persisted as the latest run of a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub source: RecordScope,
    pub mode: MergeMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<WorkItemSummary>,
    /// Records that passed the gate
    pub accepted: usize,
    /// Records the sink actually inserted
    pub inserted: usize,
}

impl RunReport {
    pub fn failed_items(&self) -> usize {
        self.items.iter().filter(|i| i.fault.is_some()).count()
    }

    pub fn anomaly_count(&self) -> usize {
        self.items.iter().map(|i| i.anomalies.len()).sum()
    }

    pub fn harvested(&self) -> usize {
        self.items.iter().map(|i| i.harvested).sum()
    }
}
