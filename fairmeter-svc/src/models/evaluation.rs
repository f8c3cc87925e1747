//! Per-metric evaluation result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall verdict for one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// At least one sub-test passed
    Pass,
    /// No sub-test passed
    Fail,
}

/// Earned vs. total score for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub earned: f64,
    pub total: f64,
}

/// Verdict for a single configured sub-test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestVerdict {
    /// Sub-test status ("pass" or "fail")
    pub status: TestStatus,
    /// Score contributed by this sub-test (0 when failed)
    pub score_earned: f64,
}

/// Finalized result of evaluating one metric against a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Metric number (position within the metrics configuration)
    pub id: u32,
    /// Metric identifier, e.g. "F3-01M"
    pub metric_identifier: String,
    /// Human-readable metric name
    pub metric_name: String,
    /// Overall verdict
    pub test_status: TestStatus,
    /// Earned/total score
    pub score: Score,
    /// Maturity level 0-3: maximum configured maturity among passed sub-tests
    pub maturity: u8,
    /// Evaluator-specific structured output payload
    pub output: serde_json::Value,
    /// Per-sub-test verdicts, keyed by sub-test identifier
    pub metric_tests: BTreeMap<String, TestVerdict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TestStatus::Pass).unwrap(), "\"pass\"");
        assert_eq!(serde_json::to_string(&TestStatus::Fail).unwrap(), "\"fail\"");
    }
}
