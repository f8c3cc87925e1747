//! Evaluator framework: shared sub-test bookkeeping
//!
//! Every metric evaluator works the same way: open a scope for its metric
//! (absent from the configuration → the whole metric is skipped), run its
//! sub-tests in declared order, and hand the collected outcomes to the
//! reducer. Sub-test outcomes are immutable value records; score and
//! maturity are computed once, after all sub-tests ran, so no hidden
//! order-dependent mutation can creep in.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::metrics::{Metric, MetricTest};
use crate::models::{EvaluationResult, Score, Severity, TestStatus, TestVerdict};
use crate::session::AssessmentSession;

/// Outcome of one executed sub-test. Skipped (undefined) sub-tests produce
/// no outcome at all.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub test_id: String,
    pub passed: bool,
    /// Configured score weight, credited only when passed
    pub score: f64,
    /// Configured maturity level, credited only when passed
    pub maturity: u8,
}

/// A sub-test that exists in the active configuration
#[derive(Debug, Clone, Copy)]
pub struct DefinedTest<'a> {
    test: &'a MetricTest,
}

impl<'a> DefinedTest<'a> {
    pub fn id(&self) -> &'a str {
        &self.test.metric_test_identifier
    }

    /// Per-test requirement spec from the configuration, e.g. required file
    /// locations
    pub fn requirements(&self) -> Option<&'a Value> {
        self.test.metric_test_requirements.as_ref()
    }

    fn outcome(&self, passed: bool) -> TestOutcome {
        TestOutcome {
            test_id: self.test.metric_test_identifier.clone(),
            passed,
            score: self.test.metric_test_score,
            maturity: self.test.metric_test_maturity,
        }
    }
}

/// Evaluation scope for one metric: the metric's configuration plus logging
/// against the owning session.
pub struct MetricScope<'a> {
    session: &'a AssessmentSession,
    pub metric: &'a Metric,
}

impl<'a> MetricScope<'a> {
    /// Open a scope, or `None` when the active configuration does not define
    /// the metric (the evaluator is then skipped entirely, not failed).
    pub fn open(session: &'a AssessmentSession, metric_identifier: &str) -> Option<Self> {
        let metric = session.metrics().metric(metric_identifier)?;
        Some(Self { session, metric })
    }

    /// Look up a sub-test. `None` means the configuration version does not
    /// enumerate it: the caller skips the sub-test silently.
    pub fn test(&self, test_id: &str) -> Option<DefinedTest<'a>> {
        self.metric.test(test_id).map(|test| DefinedTest { test })
    }

    /// Record a passing sub-test
    pub fn pass(&self, test: DefinedTest<'_>, message: impl Into<String>) -> TestOutcome {
        self.session.log(
            &self.metric.metric_identifier,
            Severity::Success,
            format!("{} ({})", message.into(), test.id()),
        );
        test.outcome(true)
    }

    /// Record a failing sub-test. Failure is a boolean outcome, never an
    /// error: no score, no maturity, pipeline continues.
    pub fn fail(&self, test: DefinedTest<'_>, message: impl Into<String>) -> TestOutcome {
        self.session.log(
            &self.metric.metric_identifier,
            Severity::Warning,
            format!("{} ({})", message.into(), test.id()),
        );
        test.outcome(false)
    }

    /// Informational log line tagged with this metric
    pub fn info(&self, message: impl Into<String>) {
        self.session
            .log(&self.metric.metric_identifier, Severity::Info, message.into());
    }

    /// Reduce collected outcomes into the finalized result.
    ///
    /// - `score.earned` = sum of passed sub-test weights, bounded by the
    ///   metric total
    /// - `maturity` = maximum configured maturity among passed sub-tests
    ///   (0 when none passed) — never an average
    /// - `test_status` = pass iff any sub-test passed
    pub fn finish(&self, outcomes: Vec<TestOutcome>, output: Value) -> EvaluationResult {
        let total = self.metric.total_score;
        let earned: f64 = outcomes
            .iter()
            .filter(|o| o.passed)
            .map(|o| o.score)
            .sum::<f64>()
            .min(total);
        let maturity = outcomes
            .iter()
            .filter(|o| o.passed)
            .map(|o| o.maturity)
            .max()
            .unwrap_or(0);
        let any_passed = outcomes.iter().any(|o| o.passed);

        let metric_tests: BTreeMap<String, TestVerdict> = outcomes
            .iter()
            .map(|o| {
                (
                    o.test_id.clone(),
                    TestVerdict {
                        status: if o.passed { TestStatus::Pass } else { TestStatus::Fail },
                        score_earned: if o.passed { o.score } else { 0.0 },
                    },
                )
            })
            .collect();

        if !any_passed {
            self.session.log(
                &self.metric.metric_identifier,
                Severity::Failure,
                format!("{} failed: no sub-test passed", self.metric.metric_identifier),
            );
        }

        EvaluationResult {
            id: self.metric.metric_number,
            metric_identifier: self.metric.metric_identifier.clone(),
            metric_name: self.metric.metric_name.clone(),
            test_status: if any_passed { TestStatus::Pass } else { TestStatus::Fail },
            score: Score { earned, total },
            maturity,
            output,
            metric_tests,
        }
    }
}

/// One metric evaluator.
///
/// `evaluate` returns `None` when the active configuration does not define
/// the metric; otherwise it always returns a result, even when every
/// sub-test failed.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Metric identifier this evaluator covers, e.g. "R1.1-01M"
    fn metric_identifier(&self) -> &'static str;

    /// Sub-test identifiers this evaluator knows how to run. The loaded
    /// configuration is validated against this list at session start.
    fn known_tests(&self) -> &'static [&'static str];

    /// Run all sub-tests in declared order against the session
    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AssessmentSession, SessionOptions};
    use serde_json::json;

    fn session() -> AssessmentSession {
        AssessmentSession::new("https://example.org/ds", SessionOptions::default()).unwrap()
    }

    #[test]
    fn test_scope_open_unknown_metric() {
        let session = session();
        assert!(MetricScope::open(&session, "Z9-99X").is_none());
    }

    #[test]
    fn test_reduce_takes_max_maturity_not_average() {
        let session = session();
        let scope = MetricScope::open(&session, "F2-01M").unwrap();

        // F2-01M-1 (maturity 1) and F2-01M-3 (maturity 3) pass, -2 fails
        let outcomes = vec![
            scope.pass(scope.test("F2-01M-1").unwrap(), "partial elements"),
            scope.fail(scope.test("F2-01M-2").unwrap(), "required missing"),
            scope.pass(scope.test("F2-01M-3").unwrap(), "recommended present"),
        ];
        let result = scope.finish(outcomes, json!({}));

        assert_eq!(result.maturity, 3);
        assert_eq!(result.test_status, TestStatus::Pass);
        assert_eq!(result.score.earned, 1.0); // 0.5 + 0.5
        assert_eq!(result.score.total, 2.0);
    }

    #[test]
    fn test_maturity_is_monotone_over_outcomes() {
        let session = session();
        let scope = MetricScope::open(&session, "F2-01M").unwrap();

        let mut outcomes = Vec::new();
        let mut last_maturity = 0;
        for test_id in ["F2-01M-1", "F2-01M-2", "F2-01M-3"] {
            outcomes.push(scope.pass(scope.test(test_id).unwrap(), "ok"));
            let maturity = scope.finish(outcomes.clone(), json!({})).maturity;
            assert!(maturity >= last_maturity);
            last_maturity = maturity;
        }
    }

    #[test]
    fn test_all_failed_is_a_normal_result() {
        let session = session();
        let scope = MetricScope::open(&session, "R1.1-01M").unwrap();

        let outcomes = vec![
            scope.fail(scope.test("R1.1-01M-1").unwrap(), "no license"),
            scope.fail(scope.test("R1.1-01M-2").unwrap(), "no SPDX id"),
        ];
        let result = scope.finish(outcomes, json!({}));

        assert_eq!(result.test_status, TestStatus::Fail);
        assert_eq!(result.score.earned, 0.0);
        assert_eq!(result.maturity, 0);
        assert_eq!(result.metric_tests.len(), 2);
    }

    #[test]
    fn test_score_bounded_by_total() {
        let session = session();
        let scope = MetricScope::open(&session, "F3-01M").unwrap();

        // all four sub-tests pass; the sum of weights equals the total
        let outcomes: Vec<TestOutcome> = ["F3-01M-1", "F3-01M-2", "F3-01M-3", "F3-01M-4"]
            .iter()
            .map(|id| scope.pass(scope.test(id).unwrap(), "ok"))
            .collect();
        let result = scope.finish(outcomes, json!({}));

        assert!(result.score.earned <= result.score.total);
        assert_eq!(result.score.earned, 4.0);
    }
}
