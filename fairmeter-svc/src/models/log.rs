//! Session-scoped audit log entries
//!
//! Every harvesting step and sub-test records an ordered entry tagged with
//! the metric it concerns, so a result can be audited without scraping the
//! process log.

use serde::{Deserialize, Serialize};

/// Log severity for audit entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    /// A sub-test passed
    Success,
    /// A sub-test or metric failed
    Failure,
}

/// One ordered audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Metric identifier this entry concerns, e.g. "R1.1-01M"
    pub metric_id: String,
    pub severity: Severity,
    pub message: String,
}
