//! Findable (F) metric evaluators

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use super::base::{Evaluator, MetricScope, TestOutcome};
use crate::helpers::identifier::IdentifierHelper;
use crate::models::EvaluationResult;
use crate::session::AssessmentSession;

/// Core descriptive elements every record should carry
const CORE_REQUIRED: &[&str] = &[
    "title",
    "object_identifier",
    "creator",
    "publisher",
    "publication_date",
    "object_type",
];

/// Additional elements a well-described record carries
const CORE_RECOMMENDED: &[&str] = &["summary", "keywords", "license"];

/// DOI badge in markdown documentation: the link target is the DOI URL
static DOI_BADGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[!\[DOI\]\(https://[^\)]+\)\]\((https://[^\)]+)\)").expect("valid DOI badge regex")
});

/// The best candidate for "the metadata identifier" of the assessed resource
fn metadata_identifier(session: &AssessmentSession) -> String {
    session
        .merged()
        .get("object_identifier")
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.first().and_then(|i| i.as_str()).map(str::to_string),
            _ => None,
        })
        .or_else(|| session.pid_url().map(str::to_string))
        .unwrap_or_else(|| session.input_id().to_string())
}

/// Required file locations from a sub-test's requirement spec
fn required_locations(requirements: Option<&Value>) -> Vec<String> {
    requirements
        .and_then(|r| r["required"]["location"].as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// F1-01M — metadata identifier uniqueness
// ---------------------------------------------------------------------------

pub struct UniqueIdentifierMetadata;

#[async_trait]
impl Evaluator for UniqueIdentifierMetadata {
    fn metric_identifier(&self) -> &'static str {
        "F1-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["F1-01M-1"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let candidate = metadata_identifier(session);
        let info = IdentifierHelper::detect(&candidate);

        if let Some(test) = scope.test("F1-01M-1") {
            outcomes.push(if info.valid {
                scope.pass(
                    test,
                    format!(
                        "Metadata identifier follows the {} syntax",
                        info.scheme.map(|s| s.to_string()).unwrap_or_default()
                    ),
                )
            } else {
                scope.fail(test, format!("No unique identifier syntax recognized in {}", candidate))
            });
        }

        let output = json!({
            "identifier": candidate,
            "scheme": info.scheme,
            "normalized": info.normalized,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// F1-01D — data identifier uniqueness
// ---------------------------------------------------------------------------

pub struct UniqueIdentifierData;

#[async_trait]
impl Evaluator for UniqueIdentifierData {
    fn metric_identifier(&self) -> &'static str {
        "F1-01D"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["F1-01D-1"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let valid_urls: Vec<&str> = session
            .contents()
            .iter()
            .filter_map(|c| c["url"].as_str())
            .filter(|u| IdentifierHelper::detect(u).valid)
            .collect();

        if let Some(test) = scope.test("F1-01D-1") {
            outcomes.push(if !valid_urls.is_empty() {
                scope.pass(
                    test,
                    format!("{} data identifier(s) follow a unique identifier syntax", valid_urls.len()),
                )
            } else {
                scope.fail(test, "No data (content) identifier with recognizable syntax")
            });
        }

        Some(scope.finish(outcomes, json!({ "content_identifiers": valid_urls })))
    }
}

// ---------------------------------------------------------------------------
// F1-02M — metadata identifier persistence
// ---------------------------------------------------------------------------

pub struct PersistentIdentifierMetadata;

#[async_trait]
impl Evaluator for PersistentIdentifierMetadata {
    fn metric_identifier(&self) -> &'static str {
        "F1-02M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["F1-02M-1", "F1-02M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let candidate = session
            .pid_url()
            .map(str::to_string)
            .unwrap_or_else(|| metadata_identifier(session));
        let detected = IdentifierHelper::detect(&candidate);
        let persistent = detected.scheme.is_some_and(|s| s.is_persistent());

        if let Some(test) = scope.test("F1-02M-1") {
            outcomes.push(if persistent {
                scope.pass(
                    test,
                    format!("Identifier uses the persistent scheme {}", detected.scheme.unwrap_or(crate::helpers::identifier::IdentifierScheme::Url)),
                )
            } else {
                scope.fail(test, "No persistent identifier scheme recognized")
            });
        }

        let mut resolved_url = None;
        if let Some(test) = scope.test("F1-02M-2") {
            outcomes.push(if persistent {
                let info = session.resolve_identifier(&candidate).await;
                resolved_url = info.resolved_url.clone();
                match info.resolved_url {
                    Some(resolved) => {
                        if session.landing_url() == Some(resolved.as_str()) {
                            scope.info("Persistent identifier resolves to the assessed landing page");
                        }
                        scope.pass(test, format!("Persistent identifier resolves to {}", resolved))
                    }
                    None => scope.fail(test, "Persistent identifier could not be resolved"),
                }
            } else {
                scope.fail(test, "No persistent identifier to resolve")
            });
        }

        let output = json!({
            "pid": candidate,
            "pid_scheme": detected.scheme,
            "resolved_url": resolved_url,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// F1-02D — data identifier persistence
// ---------------------------------------------------------------------------

pub struct PersistentIdentifierData;

#[async_trait]
impl Evaluator for PersistentIdentifierData {
    fn metric_identifier(&self) -> &'static str {
        "F1-02D"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["F1-02D-1", "F1-02D-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let persistent_urls: Vec<String> = session
            .contents()
            .iter()
            .filter_map(|c| c["url"].as_str())
            .filter(|u| {
                IdentifierHelper::detect(u)
                    .scheme
                    .is_some_and(|s| s.is_persistent())
            })
            .map(str::to_string)
            .collect();

        if let Some(test) = scope.test("F1-02D-1") {
            outcomes.push(if !persistent_urls.is_empty() {
                scope.pass(
                    test,
                    format!("{} data identifier(s) use a persistent scheme", persistent_urls.len()),
                )
            } else {
                scope.fail(test, "No data (content) identifier uses a persistent scheme")
            });
        }

        if let Some(test) = scope.test("F1-02D-2") {
            // resolving one representative identifier is enough
            outcomes.push(match persistent_urls.first() {
                Some(url) => {
                    let info = session.resolve_identifier(url).await;
                    match info.resolved_url {
                        Some(resolved) => {
                            scope.pass(test, format!("Data identifier resolves to {}", resolved))
                        }
                        None => scope.fail(test, "Persistent data identifier could not be resolved"),
                    }
                }
                None => scope.fail(test, "No persistent data identifier to resolve"),
            });
        }

        Some(scope.finish(outcomes, json!({ "persistent_identifiers": persistent_urls })))
    }
}

// ---------------------------------------------------------------------------
// F2-01M — descriptive core metadata
// ---------------------------------------------------------------------------

pub struct CoreMetadata;

#[async_trait]
impl Evaluator for CoreMetadata {
    fn metric_identifier(&self) -> &'static str {
        "F2-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["F2-01M-1", "F2-01M-2", "F2-01M-3"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let present =
            |field: &&str| -> bool { session.merged().get(field).is_some() };
        let found_required: Vec<&str> = CORE_REQUIRED.iter().filter(|f| present(f)).copied().collect();
        let missing_required: Vec<&str> =
            CORE_REQUIRED.iter().filter(|f| !present(f)).copied().collect();
        let found_recommended: Vec<&str> =
            CORE_RECOMMENDED.iter().filter(|f| present(f)).copied().collect();

        if let Some(test) = scope.test("F2-01M-1") {
            outcomes.push(if found_required.len() * 2 >= CORE_REQUIRED.len() {
                scope.pass(
                    test,
                    format!("Core descriptive elements found: {}", found_required.join(", ")),
                )
            } else {
                scope.fail(
                    test,
                    format!("Most core descriptive elements missing: {}", missing_required.join(", ")),
                )
            });
        }

        if let Some(test) = scope.test("F2-01M-2") {
            outcomes.push(if missing_required.is_empty() {
                scope.pass(test, "All required core descriptive elements present")
            } else {
                scope.fail(
                    test,
                    format!("Required elements missing: {}", missing_required.join(", ")),
                )
            });
        }

        if let Some(test) = scope.test("F2-01M-3") {
            outcomes.push(
                if missing_required.is_empty() && found_recommended.len() == CORE_RECOMMENDED.len() {
                    scope.pass(test, "Recommended descriptive elements also present")
                } else {
                    scope.fail(test, "Not all recommended descriptive elements present")
                },
            );
        }

        let output = json!({
            "required_found": found_required,
            "required_missing": missing_required,
            "recommended_found": found_recommended,
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// F3-01M — data identifier included in metadata
// ---------------------------------------------------------------------------

pub struct DataIdentifierIncluded;

impl DataIdentifierIncluded {
    /// Does the metadata carry size, type or name information for the data?
    fn test_data_size_type_name_available(
        &self,
        scope: &MetricScope<'_>,
        contents: &[&Value],
    ) -> Option<TestOutcome> {
        let test = scope.test("F3-01M-1")?;
        let described: Vec<&&Value> = contents
            .iter()
            .filter(|c| {
                c["type"].as_str().is_some() || !c["size"].is_null() || c["url"].as_str().is_some()
            })
            .collect();
        Some(if !described.is_empty() {
            scope.pass(
                test,
                format!("Data size/type/name information available for {} entries", described.len()),
            )
        } else {
            scope.fail(test, "No data size, type or name information in metadata")
        })
    }

    /// Does the metadata carry a downloadable content URL or PID?
    fn test_data_url_or_pid_available(
        &self,
        scope: &MetricScope<'_>,
        contents: &[&Value],
    ) -> Option<TestOutcome> {
        let test = scope.test("F3-01M-2")?;
        let mut any_url = false;
        for content in contents {
            if content["url"].as_str().is_some() {
                any_url = true;
            } else {
                scope.info(format!("Object (content) url is empty: {}", content));
            }
        }
        Some(if any_url {
            scope.pass(test, "Data content URL or PID available")
        } else {
            scope.fail(test, "No data content URL or PID in metadata")
        })
    }

    /// Does the project documentation carry a resolvable registry DOI badge?
    async fn test_registry_doi_in_readme(
        &self,
        scope: &MetricScope<'_>,
        session: &AssessmentSession,
    ) -> Option<TestOutcome> {
        let test = scope.test("F3-01M-3")?;
        let locations = required_locations(test.requirements());

        for location in &locations {
            let Some(content) = session.documents().get(location) else {
                continue;
            };
            let Some(caps) = DOI_BADGE_RE.captures(content) else {
                scope.info(format!("No DOI badge found in {}", location));
                continue;
            };
            let doi_url = &caps[1];
            let info = session.resolve_identifier(doi_url).await;
            if let Some(resolved) = info.resolved_url {
                if session.landing_url() == Some(resolved.as_str()) {
                    scope.info("Documentation DOI resolves to the assessed resource");
                }
                return Some(scope.pass(
                    test,
                    format!("Resolvable DOI {} found in {}", doi_url, location),
                ));
            }
            scope.info(format!("DOI {} in {} did not resolve", doi_url, location));
        }
        Some(scope.fail(test, "No resolvable registry DOI in documentation"))
    }

    /// Does the citation file carry the registry DOI of the release?
    fn test_registry_doi_in_citation_file(
        &self,
        scope: &MetricScope<'_>,
        session: &AssessmentSession,
    ) -> Option<TestOutcome> {
        let test = scope.test("F3-01M-4")?;
        let locations = required_locations(test.requirements());

        for location in &locations {
            let Some(content) = session.documents().get(location) else {
                continue;
            };
            for line in content.lines() {
                if !line.contains("zenodo") {
                    continue;
                }
                let Some((_, value)) = line.split_once(':') else {
                    continue;
                };
                let doi = value.trim();
                if doi.starts_with("10.5281/zenodo.") {
                    return Some(scope.pass(
                        test,
                        format!("Registry DOI {} found in {}", doi, location),
                    ));
                }
                scope.info(format!("Registry DOI in {} is in an unexpected format", location));
            }
        }
        Some(scope.fail(test, "No registry DOI in citation file"))
    }
}

#[async_trait]
impl Evaluator for DataIdentifierIncluded {
    fn metric_identifier(&self) -> &'static str {
        "F3-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["F3-01M-1", "F3-01M-2", "F3-01M-3", "F3-01M-4"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let contents = session.contents();
        let contents: Vec<&Value> = contents
            .into_iter()
            .filter(|c| c.as_object().map(|o| !o.is_empty()).unwrap_or(false))
            .collect();
        if contents.is_empty() {
            scope.info("No data (content) identifiers in merged metadata");
        }

        outcomes.extend(self.test_data_size_type_name_available(&scope, &contents));
        outcomes.extend(self.test_data_url_or_pid_available(&scope, &contents));
        outcomes.extend(self.test_registry_doi_in_readme(&scope, session).await);
        outcomes.extend(self.test_registry_doi_in_citation_file(&scope, session));

        let output = json!({
            "object_content_identifier_included": contents.iter().map(|c| (*c).clone()).collect::<Vec<Value>>(),
        });
        Some(scope.finish(outcomes, output))
    }
}

// ---------------------------------------------------------------------------
// F4-01M — searchable metadata
// ---------------------------------------------------------------------------

pub struct Searchable;

#[async_trait]
impl Evaluator for Searchable {
    fn metric_identifier(&self) -> &'static str {
        "F4-01M"
    }

    fn known_tests(&self) -> &'static [&'static str] {
        &["F4-01M-1", "F4-01M-2"]
    }

    async fn evaluate(&self, session: &AssessmentSession) -> Option<EvaluationResult> {
        let scope = MetricScope::open(session, self.metric_identifier())?;
        let mut outcomes = Vec::new();

        let structured_embedded: Vec<String> = session
            .sources()
            .iter()
            .filter(|(method, format)| !method.is_external() && format.is_structured())
            .map(|(_, format)| format!("{:?}", format))
            .collect();
        let external: Vec<String> = session
            .sources()
            .iter()
            .filter(|(method, _)| method.is_external())
            .map(|(method, _)| format!("{:?}", method))
            .collect();

        if let Some(test) = scope.test("F4-01M-1") {
            outcomes.push(if !structured_embedded.is_empty() {
                scope.pass(
                    test,
                    format!("Structured metadata embedded as {}", structured_embedded.join(", ")),
                )
            } else {
                scope.fail(test, "No structured, parser-friendly metadata embedded")
            });
        }

        if let Some(test) = scope.test("F4-01M-2") {
            outcomes.push(if !external.is_empty() {
                scope.pass(test, "Metadata retrievable from an external catalog or service")
            } else {
                scope.fail(test, "Metadata not retrievable outside the landing page")
            });
        }

        let output = json!({
            "embedded_formats": structured_embedded,
            "external_methods": external,
        });
        Some(scope.finish(outcomes, output))
    }
}
