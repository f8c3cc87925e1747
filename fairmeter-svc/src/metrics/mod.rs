//! Versioned metrics configuration
//!
//! Metrics, their sub-tests, score weights and maturity levels are data, not
//! code: a versioned YAML document enumerates them, so spec revisions can add
//! or retire sub-tests without touching the evaluators. Evaluators silently
//! skip sub-tests the loaded version does not define; the reverse direction
//! (a configured sub-test no evaluator claims) is a configuration error and
//! is rejected at session construction (see `evaluators::validate_config`).

use fairmeter_common::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Compiled-in default metrics configuration
const METRICS_V0_5: &str = include_str!("../../assets/metrics_v0.5.yaml");

/// Default metric specification version
pub const DEFAULT_METRIC_VERSION: &str = "metrics_v0.5";

/// One sub-test definition within a metric
#[derive(Debug, Clone, Deserialize)]
pub struct MetricTest {
    pub metric_test_identifier: String,
    pub metric_test_name: String,
    pub metric_test_score: f64,
    pub metric_test_maturity: u8,
    /// Free-form per-test requirement spec, e.g. required file locations
    #[serde(default)]
    pub metric_test_requirements: Option<serde_json::Value>,
}

/// One metric definition
#[derive(Debug, Clone, Deserialize)]
pub struct Metric {
    pub metric_identifier: String,
    pub metric_number: u32,
    pub metric_name: String,
    pub total_score: f64,
    #[serde(default)]
    pub metric_tests: Vec<MetricTest>,
}

impl Metric {
    /// Look up a sub-test definition by its identifier.
    ///
    /// `None` means the active configuration version does not define the
    /// sub-test; callers skip it silently rather than failing it.
    pub fn test(&self, test_id: &str) -> Option<&MetricTest> {
        self.metric_tests
            .iter()
            .find(|t| t.metric_test_identifier == test_id)
    }
}

/// A loaded, versioned metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub metric_version: String,
    pub metrics: Vec<Metric>,
}

impl MetricsConfig {
    /// Load the configuration for a requested version.
    ///
    /// When `metrics_dir` is set, `<metrics_dir>/<version>.yaml` is read;
    /// otherwise only the compiled-in default version is available. An
    /// unknown version is a fatal configuration error: the session cannot
    /// run without its metric definitions.
    pub fn load(version: &str, metrics_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = metrics_dir {
            let path = dir.join(format!("{}.yaml", version));
            if path.exists() {
                info!(path = %path.display(), "Loading metrics configuration");
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Read {} failed: {}", path.display(), e))
                })?;
                return Self::from_yaml_str(&content);
            }
        }

        if version == DEFAULT_METRIC_VERSION {
            return Self::from_yaml_str(METRICS_V0_5);
        }

        Err(Error::Config(format!(
            "Metrics configuration for version '{}' not available",
            version
        )))
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: MetricsConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse metrics YAML failed: {}", e)))?;
        Ok(config)
    }

    /// Look up a metric definition by identifier.
    ///
    /// `None` means the metric is not part of this configuration version and
    /// its evaluator is skipped entirely.
    pub fn metric(&self, metric_identifier: &str) -> Option<&Metric> {
        self.metrics
            .iter()
            .find(|m| m.metric_identifier == metric_identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_version() {
        let config = MetricsConfig::load(DEFAULT_METRIC_VERSION, None).unwrap();
        assert_eq!(config.metric_version, DEFAULT_METRIC_VERSION);
        assert_eq!(config.metrics.len(), 19);
    }

    #[test]
    fn test_unknown_version_is_fatal() {
        let result = MetricsConfig::load("metrics_v99.9", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_metric_and_test_lookup() {
        let config = MetricsConfig::load(DEFAULT_METRIC_VERSION, None).unwrap();
        let metric = config.metric("F3-01M").unwrap();
        assert_eq!(metric.metric_number, 6);

        let test = metric.test("F3-01M-2").unwrap();
        assert_eq!(test.metric_test_score, 1.0);
        assert_eq!(test.metric_test_maturity, 3);

        assert!(metric.test("F3-01M-99").is_none());
        assert!(config.metric("X9-99Z").is_none());
    }

    #[test]
    fn test_requirements_carry_locations() {
        let config = MetricsConfig::load(DEFAULT_METRIC_VERSION, None).unwrap();
        let metric = config.metric("F3-01M").unwrap();
        let req = metric.test("F3-01M-3").unwrap().metric_test_requirements.as_ref().unwrap();
        let locations = req["required"]["location"].as_array();
        assert!(locations.is_some());
    }
}
