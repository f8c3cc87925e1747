//! Accessible (A) metric evaluators

use async_trait::async_trait;
use serde_json::json;

use super::base::{Evaluator, MetricScope};
use crate::models::EvaluationResult;
use crate::session::AssessmentSession;

// ---------------------------------------------------------------------------
// A1-01M — data access level
// ---------------------------------------------------------------------------

pub struct DataAccessLevel;

#[async_trait]
impl Evaluator for DataAccessLevel {
    fn metric_identifier(&self) -> &'static str {
        "A1-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["A1-01M-1", "A1-01M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let access_level = session
            .merged()
            .get("access_level")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let canonical_term = access_level
            .as_deref()
            .and_then(|v| session.refdata().access_level_term(v));

        if let Some(test) = scope.test("A1-01M-1") {
            outcomes.push(match &access_level {
                Some(value) => scope.pass(test, format!("Access level declared: {}", value)),
                None => scope.fail(test, "No access level term in metadata"),
            });
        }

        if let Some(test) = scope.test("A1-01M-2") {
            outcomes.push(match canonical_term {
                Some(term) => scope.pass(
                    test,
                    format!("Access level maps to controlled vocabulary term '{}'", term),
                ),
                None => scope.fail(test, "Access level does not map to a controlled vocabulary"),
            });
        }

        let output = json!({
            "access_level": access_level,
            "access_level_term": canonical_term,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// A1-02M — metadata via standardized protocol
// ---------------------------------------------------------------------------

pub struct StandardizedProtocolMetadata;

#[async_trait]
impl Evaluator for StandardizedProtocolMetadata {
    fn metric_identifier(&self) -> &'static str {
        "A1-02M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["A1-02M-1"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let landing = session
            .landing_url()
            .unwrap_or_else(|| session.input_id());
        let scheme = url::Url::parse(landing)
            .ok()
            .map(|u| u.scheme().to_string());
        let standard = scheme
            .as_deref()
            .map(|s| session.refdata().is_standard_protocol(s))
            .unwrap_or(false);

        if let Some(test) = scope.test("A1-02M-1") {
            outcomes.push(if standard {
                scope.pass(
                    test,
                    format!("Landing page protocol '{}' is standard", scheme.as_deref().unwrap_or("")),
                )
            } else {
                scope.fail(test, "Landing page not reachable via a standard protocol")
            });
        }

        Some(scope.finish(outcomes, json!({ "landing_url": landing, "protocol": scheme })))
    }
}

// ---------------------------------------------------------------------------
// A1-03D — data via standardized protocol
// ---------------------------------------------------------------------------

pub struct StandardizedProtocolData;

#[async_trait]
impl Evaluator for StandardizedProtocolData {
    fn metric_identifier(&self) -> &'static str {
        "A1-03D"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["A1-03D-1"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let standard_protocols: Vec<String> = session
            .contents()
            .iter()
            .filter_map(|c| c["url"].as_str())
            .filter_map(|u| url::Url::parse(u).ok())
            .map(|u| u.scheme().to_string())
            .filter(|s| session.refdata().is_standard_protocol(s))
            .collect();

        if let Some(test) = scope.test("A1-03D-1") {
            outcomes.push(if !standard_protocols.is_empty() {
                scope.pass(
                    test,
                    format!("Data content reachable via standard protocol(s): {}", standard_protocols.join(", ")),
                )
            } else {
                scope.fail(test, "No data content URL uses a standard protocol")
            });
        }

        Some(scope.finish(outcomes, json!({ "protocols": standard_protocols })))
    }
}

// ---------------------------------------------------------------------------
// A2-01M — metadata preservation guarantee
// ---------------------------------------------------------------------------

pub struct MetadataPreservation;

#[async_trait]
impl Evaluator for MetadataPreservation {
    fn metric_identifier(&self) -> &'static str {
        "A2-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["A2-01M-1"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let record = session.repository_record();
        let preserved = record
            .map(|r| r.preservation_policy.is_some() || !r.certificates.is_empty())
            .unwrap_or(false);

        if let Some(test) = scope.test("A2-01M-1") {
            outcomes.push(if preserved {
                scope.pass(test, "Hosting repository declares a preservation policy or certificate")
            } else if record.is_none() {
                scope.fail(test, "No repository registry record to check preservation against")
            } else {
                scope.fail(test, "Repository registry record declares no preservation guarantee")
            });
        }

        let output = json!({
            "repository": record.map(|r| r.name.clone()),
            "preservation_policy": record.and_then(|r| r.preservation_policy.clone()),
            "certificates": record.map(|r| r.certificates.clone()).unwrap_or_default(),
        });
        Some(scope.finish(outcomes, output))
    }
}
