//! Assessment session
//!
//! Owns every piece of mutable per-assessment state: the canonical merged
//! record, harvesting provenance, the audit log, identifier resolution cache
//! and the loaded metrics configuration. Sessions are independent; the only
//! shared state they touch is the read-only reference data store.
//!
//! Harvesting progresses through a fixed state machine:
//! `Init → EmbeddedHarvested → ExternalHarvested → Merged → Ready`.
//! Embedded sources are harvested first and external sources second, so the
//! merge engine's last-writer-wins policy gives external metadata precedence.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use fairmeter_common::{Error, Result};

use crate::harvest::merge::MergedRecord;
use crate::harvest::{
    Collector, Harvest, HarvestMethod, MetadataFormat, PartialRecord, ServiceEndpoint,
    REFERENCE_ELEMENTS,
};
use crate::helpers::identifier::{IdentifierHelper, IdentifierInfo, IdentifierScheme};
use crate::helpers::repository::{RepositoryRecord, RepositoryRegistry};
use crate::metrics::{MetricsConfig, DEFAULT_METRIC_VERSION};
use crate::models::{LogEntry, Severity};
use crate::refdata::ReferenceData;

/// Harvesting state progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarvestState {
    Init,
    EmbeddedHarvested,
    ExternalHarvested,
    Merged,
    /// Eligible for evaluator execution
    Ready,
}

/// Options accepted when opening a session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Metric specification version; defaults to the compiled-in version
    pub metric_version: Option<String>,
    /// Explicit metadata-service endpoint forwarded to the collector
    pub endpoint: Option<ServiceEndpoint>,
    /// Directory holding versioned metrics configuration files
    pub metrics_dir: Option<PathBuf>,
    /// Override for the identifier resolution timeout
    pub resolve_timeout: Option<Duration>,
    /// Maximum content identifiers handed to evaluators
    pub data_files_limit: Option<usize>,
}

/// One assessment session
pub struct AssessmentSession {
    /// Session id for tracing
    pub session_id: Uuid,
    /// Stable digest of the input id, usable as a cache key
    pub assessment_id: String,

    input_id: String,
    state: HarvestState,
    endpoint: Option<ServiceEndpoint>,
    data_files_limit: usize,

    metrics: MetricsConfig,
    refdata: &'static ReferenceData,

    merged: MergedRecord,
    metadata_unmerged: Vec<PartialRecord>,
    metadata_sources: Vec<(HarvestMethod, MetadataFormat)>,
    namespace_uri: Vec<String>,
    related_resources: Vec<Value>,
    documents: BTreeMap<String, String>,

    landing_url: Option<String>,
    origin_url: Option<String>,
    pid_url: Option<String>,
    pid_scheme: Option<IdentifierScheme>,

    /// Pending alternate target for the one-shot re-harvest
    repeat_target: Option<String>,
    repeat_done: bool,

    repository_record: Option<RepositoryRecord>,

    identifier: IdentifierHelper,
    resolve_cache: Mutex<BTreeMap<String, IdentifierInfo>>,
    log_entries: Mutex<Vec<LogEntry>>,
}

impl AssessmentSession {
    /// Open a session for a target identifier.
    ///
    /// Fails fast on unrecoverable configuration problems: empty input,
    /// missing metrics configuration for the requested version, reference
    /// data initialization failure, or a configured sub-test no evaluator
    /// claims.
    pub fn new(input_id: &str, options: SessionOptions) -> Result<Self> {
        let input_id = input_id.trim().to_string();
        if input_id.is_empty() {
            return Err(Error::InvalidInput("Target identifier is empty".to_string()));
        }

        let version = options
            .metric_version
            .as_deref()
            .unwrap_or(DEFAULT_METRIC_VERSION);
        let metrics = MetricsConfig::load(version, options.metrics_dir.as_deref())?;
        crate::evaluators::validate_config(&metrics)?;

        let refdata = ReferenceData::global()?;

        let assessment_id = format!("{:x}", Sha256::digest(input_id.as_bytes()));
        let session_id = Uuid::new_v4();

        tracing::info!(
            session_id = %session_id,
            target = %input_id,
            metric_version = %metrics.metric_version,
            "Assessment session opened"
        );

        Ok(Self {
            session_id,
            assessment_id,
            input_id,
            state: HarvestState::Init,
            endpoint: options.endpoint,
            data_files_limit: options.data_files_limit.unwrap_or(10),
            metrics,
            refdata,
            merged: MergedRecord::new(REFERENCE_ELEMENTS),
            metadata_unmerged: Vec::new(),
            metadata_sources: Vec::new(),
            namespace_uri: Vec::new(),
            related_resources: Vec::new(),
            documents: BTreeMap::new(),
            landing_url: None,
            origin_url: None,
            pid_url: None,
            pid_scheme: None,
            repeat_target: None,
            repeat_done: false,
            repository_record: None,
            identifier: match options.resolve_timeout {
                Some(timeout) => IdentifierHelper::with_timeout(timeout),
                None => IdentifierHelper::new(),
            },
            resolve_cache: Mutex::new(BTreeMap::new()),
            log_entries: Mutex::new(Vec::new()),
        })
    }

    /// Run the full harvesting pipeline: embedded pass, external pass, the
    /// optional one-shot repeat pass, merge and cleanup.
    ///
    /// Collector failures are soft: the affected pass contributes nothing
    /// and the pipeline continues.
    pub async fn harvest_all_metadata(&mut self, collector: &dyn Collector) -> Result<()> {
        if self.state != HarvestState::Init {
            return Err(Error::Internal(format!(
                "harvest_all_metadata called in state {:?}",
                self.state
            )));
        }

        // embedded pass
        match collector.retrieve_embedded(&self.input_id).await {
            Ok(harvest) => self.absorb(harvest),
            Err(e) => self.log(
                "F2-01M",
                Severity::Warning,
                format!("Embedded metadata harvest failed: {}", e),
            ),
        }
        self.transition(HarvestState::EmbeddedHarvested);

        // external pass against the best URL known so far
        let target = self.external_target();
        match collector
            .retrieve_external(&target, self.endpoint.as_ref(), false)
            .await
        {
            Ok(harvest) => self.absorb(harvest),
            Err(e) => self.log(
                "F2-01M",
                Severity::Warning,
                format!("External metadata harvest failed: {}", e),
            ),
        }

        // one-shot re-entry against an alternate target discovered mid-harvest
        if let Some(alternate) = self.repeat_target.take() {
            self.repeat_done = true;
            self.log(
                "F1-02M",
                Severity::Info,
                format!("Re-harvesting external metadata against {}", alternate),
            );
            match collector
                .retrieve_external(&alternate, self.endpoint.as_ref(), true)
                .await
            {
                Ok(harvest) => self.absorb(harvest),
                Err(e) => self.log(
                    "F1-02M",
                    Severity::Warning,
                    format!("Repeat harvest failed: {}", e),
                ),
            }
        }
        self.transition(HarvestState::ExternalHarvested);

        // merge: fold all partial records in arrival order, then clean
        self.merged.fold_all(&self.metadata_unmerged);
        self.merged.clean();
        self.transition(HarvestState::Merged);

        self.namespace_uri.sort();
        self.namespace_uri.dedup();
        self.transition(HarvestState::Ready);

        self.log(
            "F2-01M",
            Severity::Info,
            format!(
                "Harvest complete: {} sources, {} fields, {} reference elements still missing",
                self.metadata_unmerged.len(),
                self.merged.fields().len(),
                self.merged.missing_elements().len()
            ),
        );
        Ok(())
    }

    /// Look up the hosting repository's registry record, if the merged
    /// metadata names a repository client id. Soft failure.
    pub async fn harvest_repository_record(&mut self, registry: &dyn RepositoryRegistry) {
        let Some(client_id) = self
            .merged
            .get("datacite_client")
            .and_then(|v| v.as_str())
            .map(str::to_string)
        else {
            self.log(
                "R1.3-01M",
                Severity::Info,
                "No repository client id in metadata, skipping registry lookup".to_string(),
            );
            return;
        };

        match registry.lookup(&client_id).await {
            Some(record) => {
                self.log(
                    "R1.3-01M",
                    Severity::Info,
                    format!("Repository registry record found for {}", client_id),
                );
                self.repository_record = Some(record);
            }
            None => self.log(
                "R1.3-01M",
                Severity::Warning,
                format!("Repository registry lookup failed for {}", client_id),
            ),
        }
    }

    fn absorb(&mut self, harvest: Harvest) {
        for record in &harvest.records {
            self.metadata_sources.push((record.method, record.format));
            self.namespace_uri.extend(record.namespaces.iter().cloned());
            if let Some(Value::Array(relations)) = record.metadata.get("related_resources") {
                self.related_resources.extend(relations.iter().cloned());
            }
        }
        self.metadata_unmerged.extend(harvest.records);
        self.documents.extend(harvest.documents);

        if harvest.landing_url.is_some() {
            self.landing_url = harvest.landing_url;
        }
        if harvest.origin_url.is_some() {
            self.origin_url = harvest.origin_url;
        }
        if let Some(pid_url) = harvest.pid_url {
            self.log(
                "F1-02M",
                Severity::Info,
                format!("Persistent identifier detected: {}", pid_url),
            );
            self.pid_url = Some(pid_url);
            self.pid_scheme = harvest.pid_scheme.or(self.pid_scheme);
        }

        if let Some(target) = harvest.repeat_pid_check {
            if self.repeat_done {
                self.log(
                    "F1-02M",
                    Severity::Warning,
                    format!("Re-harvest already performed, ignoring request for {}", target),
                );
            } else {
                self.repeat_target = Some(target);
            }
        }
    }

    fn external_target(&self) -> String {
        self.landing_url
            .clone()
            .or_else(|| self.pid_url.clone())
            .unwrap_or_else(|| self.input_id.clone())
    }

    fn transition(&mut self, new_state: HarvestState) {
        tracing::debug!(
            session_id = %self.session_id,
            old_state = ?self.state,
            new_state = ?new_state,
            "Harvest state transition"
        );
        self.state = new_state;
    }

    /// Append an ordered audit log entry, mirrored onto the process log
    pub fn log(&self, metric_id: &str, severity: Severity, message: String) {
        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(metric = %metric_id, "{}", message)
            }
            Severity::Warning | Severity::Failure => {
                tracing::warn!(metric = %metric_id, "{}", message)
            }
        }
        self.log_entries.lock().expect("log mutex poisoned").push(LogEntry {
            metric_id: metric_id.to_string(),
            severity,
            message,
        });
    }

    /// Resolve a candidate identifier, caching per session
    pub async fn resolve_identifier(&self, candidate: &str) -> IdentifierInfo {
        if let Some(cached) = self
            .resolve_cache
            .lock()
            .expect("resolve cache mutex poisoned")
            .get(candidate)
        {
            return cached.clone();
        }

        let info = self.identifier.resolve(candidate).await;
        self.resolve_cache
            .lock()
            .expect("resolve cache mutex poisoned")
            .insert(candidate.to_string(), info.clone());
        info
    }

    // --- accessors used by evaluators ---

    pub fn state(&self) -> HarvestState {
        self.state
    }

    pub fn input_id(&self) -> &str {
        &self.input_id
    }

    pub fn merged(&self) -> &MergedRecord {
        &self.merged
    }

    /// Content identifier entries, capped at the configured files limit
    pub fn contents(&self) -> Vec<&Value> {
        let mut contents = self.merged.contents();
        contents.retain(|c| !c.is_null());
        contents.truncate(self.data_files_limit);
        contents
    }

    pub fn sources(&self) -> &[(HarvestMethod, MetadataFormat)] {
        &self.metadata_sources
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespace_uri
    }

    pub fn related_resources(&self) -> &[Value] {
        &self.related_resources
    }

    pub fn documents(&self) -> &BTreeMap<String, String> {
        &self.documents
    }

    pub fn landing_url(&self) -> Option<&str> {
        self.landing_url.as_deref()
    }

    pub fn origin_url(&self) -> Option<&str> {
        self.origin_url.as_deref()
    }

    pub fn pid_url(&self) -> Option<&str> {
        self.pid_url.as_deref()
    }

    pub fn pid_scheme(&self) -> Option<IdentifierScheme> {
        self.pid_scheme
    }

    pub fn refdata(&self) -> &'static ReferenceData {
        self.refdata
    }

    pub fn metrics(&self) -> &MetricsConfig {
        &self.metrics
    }

    pub fn repository_record(&self) -> Option<&RepositoryRecord> {
        self.repository_record.as_ref()
    }

    /// Drain a snapshot of the audit log in arrival order
    pub fn log_messages(&self) -> Vec<LogEntry> {
        self.log_entries.lock().expect("log mutex poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;

    /// Collector yielding canned harvests, with optional repeat requests
    struct CannedCollector {
        embedded: Vec<PartialRecord>,
        external: Vec<PartialRecord>,
        repeat_request: Option<String>,
        repeat_again: bool,
    }

    impl CannedCollector {
        fn record(method: HarvestMethod, fields: Value) -> PartialRecord {
            let map: BTreeMap<String, Value> = fields
                .as_object()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            PartialRecord::new(method, "https://example.org", MetadataFormat::JsonLd, map)
        }
    }

    #[async_trait]
    impl Collector for CannedCollector {
        async fn retrieve_embedded(&self, target: &str) -> std::result::Result<Harvest, crate::harvest::CollectorError> {
            Ok(Harvest {
                records: self.embedded.clone(),
                landing_url: Some(format!("{}/landing", target)),
                origin_url: Some(target.to_string()),
                repeat_pid_check: self.repeat_request.clone(),
                ..Default::default()
            })
        }

        async fn retrieve_external(
            &self,
            _target: &str,
            _endpoint: Option<&ServiceEndpoint>,
            repeat: bool,
        ) -> std::result::Result<Harvest, crate::harvest::CollectorError> {
            Ok(Harvest {
                records: self.external.clone(),
                // a repeat pass asking for yet another repeat must be ignored
                repeat_pid_check: if repeat && self.repeat_again {
                    Some("https://example.org/again".to_string())
                } else {
                    None
                },
                ..Default::default()
            })
        }
    }

    fn session() -> AssessmentSession {
        AssessmentSession::new("https://example.org/dataset/1", SessionOptions::default()).unwrap()
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = AssessmentSession::new("  ", SessionOptions::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_metric_version_rejected() {
        let options = SessionOptions {
            metric_version: Some("metrics_v9.9".to_string()),
            ..Default::default()
        };
        assert!(AssessmentSession::new("https://example.org/x", options).is_err());
    }

    #[tokio::test]
    async fn test_external_overrides_embedded() {
        let collector = CannedCollector {
            embedded: vec![CannedCollector::record(
                HarvestMethod::Embedded,
                json!({"license": "CC-BY", "title": "T"}),
            )],
            external: vec![CannedCollector::record(
                HarvestMethod::ContentNegotiation,
                json!({"license": "CC-BY-4.0"}),
            )],
            repeat_request: None,
            repeat_again: false,
        };

        let mut session = session();
        session.harvest_all_metadata(&collector).await.unwrap();

        assert_eq!(session.state(), HarvestState::Ready);
        assert_eq!(session.merged().get("license").unwrap(), "CC-BY-4.0");
        assert_eq!(session.merged().get("title").unwrap(), "T");
    }

    #[tokio::test]
    async fn test_repeat_harvest_is_one_shot() {
        let collector = CannedCollector {
            embedded: vec![],
            external: vec![CannedCollector::record(
                HarvestMethod::ContentNegotiation,
                json!({"title": "T"}),
            )],
            repeat_request: Some("https://doi.org/10.5281/zenodo.99".to_string()),
            repeat_again: true,
        };

        let mut session = session();
        session.harvest_all_metadata(&collector).await.unwrap();

        // the external records arrive twice (initial + single repeat), never a third time
        assert_eq!(session.sources().len(), 2);
        let log = session.log_messages();
        assert!(log
            .iter()
            .any(|e| e.severity == Severity::Warning && e.message.contains("ignoring request")));
    }

    #[tokio::test]
    async fn test_harvest_in_wrong_state_is_error() {
        let collector = CannedCollector {
            embedded: vec![],
            external: vec![],
            repeat_request: None,
            repeat_again: false,
        };

        let mut session = session();
        session.harvest_all_metadata(&collector).await.unwrap();
        let second = session.harvest_all_metadata(&collector).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_namespaces_deduplicated_at_ready() {
        let record = CannedCollector::record(HarvestMethod::Embedded, json!({"title": "T"}))
            .with_namespaces(vec!["http://purl.org/dc/terms/".to_string()]);
        let collector = CannedCollector {
            embedded: vec![record.clone()],
            external: vec![record.with_namespaces(vec!["http://purl.org/dc/terms/".to_string()])],
            repeat_request: None,
            repeat_again: false,
        };

        let mut session = session();
        session.harvest_all_metadata(&collector).await.unwrap();
        assert_eq!(session.namespaces().len(), 1);
    }
}
