//! Interoperable (I) metric evaluators

use async_trait::async_trait;
use serde_json::json;

use super::base::{Evaluator, MetricScope};
use crate::models::EvaluationResult;
use crate::session::AssessmentSession;

// ---------------------------------------------------------------------------
// I1-01M — formal metadata representation
// ---------------------------------------------------------------------------

pub struct FormalMetadata;

#[async_trait]
impl Evaluator for FormalMetadata {
    fn metric_identifier(&self) -> &'static str {
        "I1-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["I1-01M-1", "I1-01M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let formal_embedded: Vec<String> = session
            .sources()
            .iter()
            .filter(|(method, format)| !method.is_external() && format.is_formal())
            .map(|(_, format)| format!("{:?}", format))
            .collect();
        let formal_external: Vec<String> = session
            .sources()
            .iter()
            .filter(|(method, format)| method.is_external() && format.is_formal())
            .map(|(_, format)| format!("{:?}", format))
            .collect();

        if let Some(test) = scope.test("I1-01M-1") {
            outcomes.push(if !formal_embedded.is_empty() {
                scope.pass(
                    test,
                    format!("Formal metadata embedded as {}", formal_embedded.join(", ")),
                )
            } else {
                scope.fail(test, "No graph-serializable metadata embedded in the landing page")
            });
        }

        if let Some(test) = scope.test("I1-01M-2") {
            outcomes.push(if !formal_external.is_empty() {
                scope.pass(
                    test,
                    format!("Formal metadata negotiated as {}", formal_external.join(", ")),
                )
            } else {
                scope.fail(test, "No formal metadata available via negotiation or typed links")
            });
        }

        let output = json!({
            "embedded": formal_embedded,
            "external": formal_external,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// I2-01M — semantic vocabularies
// ---------------------------------------------------------------------------

pub struct SemanticVocabulary;

#[async_trait]
impl Evaluator for SemanticVocabulary {
    fn metric_identifier(&self) -> &'static str {
        "I2-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["I2-01M-1", "I2-01M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let refdata = session.refdata();
        let non_default: Vec<&String> = session
            .namespaces()
            .iter()
            .filter(|ns| !refdata.is_default_namespace(ns))
            .collect();
        let recognized: Vec<&String> = non_default
            .iter()
            .filter(|ns| refdata.is_vocab_namespace(ns))
            .copied()
            .collect();

        if let Some(test) = scope.test("I2-01M-1") {
            outcomes.push(if !non_default.is_empty() {
                scope.pass(
                    test,
                    format!("{} namespace(s) beyond the defaults in use", non_default.len()),
                )
            } else {
                scope.fail(test, "Only default namespaces present in metadata")
            });
        }

        if let Some(test) = scope.test("I2-01M-2") {
            outcomes.push(if !recognized.is_empty() {
                scope.pass(
                    test,
                    format!("Registered vocabulary namespace(s) found: {}", recognized.len()),
                )
            } else {
                scope.fail(test, "No namespace matches a registered semantic vocabulary")
            });
        }

        let output = json!({
            "namespaces": non_default,
            "recognized_vocabularies": recognized,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// I3-01M — related resources
// ---------------------------------------------------------------------------

pub struct RelatedResources;

#[async_trait]
impl Evaluator for RelatedResources {
    fn metric_identifier(&self) -> &'static str {
        "I3-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["I3-01M-1", "I3-01M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let related = session.related_resources();
        let typed: Vec<&serde_json::Value> = related
            .iter()
            .filter(|r| {
                r["relation_type"].as_str().is_some() && r["related_resource"].as_str().is_some()
            })
            .collect();

        if let Some(test) = scope.test("I3-01M-1") {
            outcomes.push(if !related.is_empty() {
                scope.pass(test, format!("{} related resource(s) declared", related.len()))
            } else {
                scope.fail(test, "No related resources in metadata")
            });
        }

        if let Some(test) = scope.test("I3-01M-2") {
            outcomes.push(if !typed.is_empty() {
                scope.pass(
                    test,
                    format!("{} relation(s) carry a machine-readable relation type", typed.len()),
                )
            } else {
                scope.fail(test, "No machine-readable relation types on related resources")
            });
        }

        Some(scope.finish(outcomes, json!({ "related_resources": related })))
    }
}
