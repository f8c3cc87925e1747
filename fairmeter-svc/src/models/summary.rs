//! Aggregated assessment summary
//!
//! Keys in each map are FAIR categories ("F", "A", "I", "R"), principles
//! ("F1", "R1.3", ...), and the overall "FAIR" entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-category / per-principle / overall aggregates for one assessment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentSummary {
    /// Sum of earned scores per group
    pub score_earned: BTreeMap<String, f64>,
    /// Sum of total scores per group
    pub score_total: BTreeMap<String, f64>,
    /// earned/total * 100, rounded to 2 decimals
    pub score_percent: BTreeMap<String, f64>,
    /// Rounded mean maturity per group. A mean strictly between 0 and 1 is
    /// reported as 1 so partial credit never reads as "no maturity".
    pub maturity: BTreeMap<String, f64>,
    /// Number of metrics evaluated per group
    pub status_total: BTreeMap<String, u32>,
    /// Number of metrics with status "pass" per group
    pub status_passed: BTreeMap<String, u32>,
}
