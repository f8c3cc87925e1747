//! Reusable (R) metric evaluators

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base::{Evaluator, MetricScope};
use crate::models::EvaluationResult;
use crate::session::AssessmentSession;

// ---------------------------------------------------------------------------
// R1-01MD — data content metadata
// ---------------------------------------------------------------------------

pub struct DataContentMetadata;

#[async_trait]
impl Evaluator for DataContentMetadata {
    fn metric_identifier(&self) -> &'static str {
        "R1-01MD"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["R1-01MD-1", "R1-01MD-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let contents = session.contents();
        let has_info = |c: &&Value| {
            c["type"].as_str().is_some() || !c["size"].is_null() || c["url"].as_str().is_some()
        };
        let any_described = contents.iter().any(has_info);
        let all_verifiable = !contents.is_empty()
            && contents
                .iter()
                .all(|c| c["type"].as_str().is_some() && !c["size"].is_null());

        if let Some(test) = scope.test("R1-01MD-1") {
            outcomes.push(if any_described {
                scope.pass(test, "Content information (size, type or URL) specified")
            } else {
                scope.fail(test, "No content information in metadata")
            });
        }

        if let Some(test) = scope.test("R1-01MD-2") {
            outcomes.push(if all_verifiable {
                scope.pass(test, "Every content entry carries size and type descriptors")
            } else {
                scope.fail(test, "Content entries missing verifiable size/type descriptors")
            });
        }

        let output = json!({
            "content_entries": contents.len(),
            "all_verifiable": all_verifiable,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// R1.1-01M — license
// ---------------------------------------------------------------------------

pub struct License;

#[async_trait]
impl Evaluator for License {
    fn metric_identifier(&self) -> &'static str {
        "R1.1-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["R1.1-01M-1", "R1.1-01M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let licenses: Vec<String> = match session.merged().get("license") {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        let spdx_ids: Vec<&str> = licenses
            .iter()
            .filter_map(|l| session.refdata().license_lookup(l))
            .map(|entry| entry.license_id.as_str())
            .collect();

        if let Some(test) = scope.test("R1.1-01M-1") {
            outcomes.push(if !licenses.is_empty() {
                scope.pass(test, format!("License information given: {}", licenses.join(", ")))
            } else {
                scope.fail(test, "No license information in metadata")
            });
        }

        if let Some(test) = scope.test("R1.1-01M-2") {
            outcomes.push(if !spdx_ids.is_empty() {
                scope.pass(test, format!("License maps to SPDX id {}", spdx_ids.join(", ")))
            } else {
                scope.fail(test, "License does not map to a standard SPDX id")
            });
        }

        let output = json!({
            "license": licenses,
            "spdx_ids": spdx_ids,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// R1.2-01M — provenance
// ---------------------------------------------------------------------------

pub struct Provenance;

#[async_trait]
impl Evaluator for Provenance {
    fn metric_identifier(&self) -> &'static str {
        "R1.2-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["R1.2-01M-1", "R1.2-01M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let merged = session.merged();
        let mut facts: Vec<&str> = Vec::new();
        if merged.get("creator").is_some()
            && (merged.get("created_date").is_some() || merged.get("publication_date").is_some())
        {
            facts.push("creation");
        }
        if merged.get("provenance_general").is_some() {
            facts.push("derivation");
        }
        if merged.get("modified_date").is_some() {
            facts.push("modification");
        }

        let provenance_namespaces: Vec<&String> = session
            .namespaces()
            .iter()
            .filter(|ns| session.refdata().is_provenance_namespace(ns))
            .collect();

        if let Some(test) = scope.test("R1.2-01M-1") {
            outcomes.push(if !facts.is_empty() {
                scope.pass(test, format!("Provenance facts declared: {}", facts.join(", ")))
            } else {
                scope.fail(test, "No creation or derivation facts in metadata")
            });
        }

        if let Some(test) = scope.test("R1.2-01M-2") {
            outcomes.push(if !provenance_namespaces.is_empty() {
                scope.pass(test, "Provenance vocabulary namespace in use")
            } else {
                scope.fail(test, "No provenance vocabulary in metadata")
            });
        }

        let output = json!({
            "facts": facts,
            "provenance_namespaces": provenance_namespaces,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// R1.3-01M — community metadata standards
// ---------------------------------------------------------------------------

pub struct CommunityStandards;

#[async_trait]
impl Evaluator for CommunityStandards {
    fn metric_identifier(&self) -> &'static str {
        "R1.3-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["R1.3-01M-1", "R1.3-01M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let refdata = session.refdata();

        // standards detectable from the harvested metadata itself
        let mut detected: Vec<String> = session
            .namespaces()
            .iter()
            .filter_map(|ns| refdata.standard_by_uri(ns))
            .map(|s| s.name.clone())
            .collect();
        detected.sort();
        detected.dedup();

        // standards the hosting repository endorses, per its registry record
        let endorsed: Vec<String> = session
            .repository_record()
            .map(|record| {
                record
                    .metadata_standards
                    .iter()
                    .filter_map(|name| refdata.standard_by_name(name))
                    .map(|s| s.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        if let Some(test) = scope.test("R1.3-01M-1") {
            outcomes.push(if !detected.is_empty() {
                scope.pass(
                    test,
                    format!("Community standard(s) detected: {}", detected.join(", ")),
                )
            } else {
                scope.fail(test, "No community metadata standard detectable in metadata")
            });
        }

        if let Some(test) = scope.test("R1.3-01M-2") {
            outcomes.push(if !endorsed.is_empty() {
                scope.pass(
                    test,
                    format!("Repository endorses: {}", endorsed.join(", ")),
                )
            } else {
                scope.fail(test, "Hosting repository endorses no recognized metadata standard")
            });
        }

        let output = json!({
            "detected_standards": detected,
            "endorsed_standards": endorsed,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// R1.3-02D — file format
// ---------------------------------------------------------------------------

pub struct FileFormat;

#[async_trait]
impl Evaluator for FileFormat {
    fn metric_identifier(&self) -> &'static str {
        "R1.3-02D"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["R1.3-02D-1", "R1.3-02D-2", "R1.3-02D-3"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let mime_types: Vec<&str> = session
            .contents()
            .iter()
            .filter_map(|c| c["type"].as_str())
            .collect();
        let classified: Vec<_> = mime_types
            .iter()
            .filter_map(|mime| session.refdata().file_format(mime))
            .collect();

        if mime_types.is_empty() {
            scope.info("No file format (MIME type) information in metadata");
        }

        let checks = [
            ("R1.3-02D-1", "scientific", classified.iter().any(|f| f.scientific)),
            ("R1.3-02D-2", "long-term", classified.iter().any(|f| f.long_term)),
            ("R1.3-02D-3", "open", classified.iter().any(|f| f.open)),
        ];

        for (test_id, label, passed) in checks {
            if let Some(test) = scope.test(test_id) {
                outcomes.push(if passed {
                    scope.pass(test, format!("Data available in a {} file format", label))
                } else {
                    scope.fail(test, format!("No {} file format among data contents", label))
                });
            }
        }

        let output = json!({
            "mime_types": mime_types,
            "classified": classified.iter().map(|f| f.mime.clone()).collect::<Vec<String>>(),
        });
        Some(scope.finish(outcomes, output))
    }
}
