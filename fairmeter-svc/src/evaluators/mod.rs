//! Metric evaluators
//!
//! One evaluator per FAIR sub-principle, all behind the `Evaluator` trait.
//! The registry fixes the execution order (metric numbering order) and backs
//! the fail-fast validation of loaded metrics configurations: every
//! configured sub-test id must be claimed by exactly the evaluator of its
//! metric, so typos in a configuration surface at session start instead of
//! silently never running.

pub mod accessible;
pub mod base;
pub mod findable;
pub mod interoperable;
pub mod reusable;

pub use base::{Evaluator, MetricScope, TestOutcome};

use fairmeter_common::{Error, Result};

use crate::metrics::MetricsConfig;
use crate::models::EvaluationResult;
use crate::session::AssessmentSession;

/// All evaluators in execution order
pub fn registry() -> Vec<Box<dyn Evaluator>> {
    vec![
        Box::new(findable::UniqueIdentifierMetadata),
        Box::new(findable::UniqueIdentifierData),
        Box::new(findable::PersistentIdentifierMetadata),
        Box::new(findable::PersistentIdentifierData),
        Box::new(findable::CoreMetadata),
        Box::new(findable::DataIdentifierIncluded),
        Box::new(findable::Searchable),
        Box::new(accessible::DataAccessLevel),
        Box::new(accessible::StandardizedProtocolMetadata),
        Box::new(accessible::StandardizedProtocolData),
        Box::new(accessible::MetadataPreservation),
        Box::new(interoperable::FormalMetadata),
        Box::new(interoperable::SemanticVocabulary),
        Box::new(interoperable::RelatedResources),
        Box::new(reusable::DataContentMetadata),
        Box::new(reusable::License),
        Box::new(reusable::Provenance),
        Box::new(reusable::CommunityStandards),
        Box::new(reusable::FileFormat),
    ]
}

/// Validate a loaded metrics configuration against the evaluator registry.
///
/// A metric the configuration defines but no evaluator covers, or a
/// configured sub-test id its evaluator does not know, is a fatal
/// configuration error. The reverse — evaluators whose metric or sub-tests
/// the configuration omits — is fine: versioned configurations may retire
/// metrics, and evaluators skip them silently.
pub fn validate_config(config: &MetricsConfig) -> Result<()> {
    let registry = registry();

    for metric in &config.metrics {
        let evaluator = registry
            .iter()
            .find(|e| e.metric_identifier() == metric.metric_identifier)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Metric '{}' in configuration '{}' has no evaluator",
                    metric.metric_identifier, config.metric_version
                ))
            })?;

        for test in &metric.metric_tests {
            if !evaluator
                .known_tests()
                .contains(&test.metric_test_identifier.as_str())
            {
                return Err(Error::Config(format!(
                    "Sub-test '{}' of metric '{}' is not known to any evaluator",
                    test.metric_test_identifier, metric.metric_identifier
                )));
            }
        }
    }
    Ok(())
}

/// Run every evaluator whose metric the session's configuration defines.
///
/// The session must have completed harvesting. Results arrive in registry
/// order; skipped (undefined) metrics leave no gap marker.
pub async fn evaluate_all(session: &AssessmentSession) -> Vec<EvaluationResult> {
    let mut results = Vec::new();
    for evaluator in registry() {
        if let Some(result) = evaluator.evaluate(session).await {
            tracing::debug!(
                metric = %result.metric_identifier,
                status = ?result.test_status,
                earned = result.score.earned,
                "Metric evaluated"
            );
            results.push(result);
        }
    }
    results
}
