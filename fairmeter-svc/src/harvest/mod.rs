//! Metadata harvesting types and the collector contract
//!
//! A collector produces provenance-tagged partial metadata records from a
//! target identifier. The merge engine (`merge`) folds those records into the
//! session's canonical record. Collectors are collaborators: the session only
//! depends on the `Collector` trait, and every retrieval attempt is
//! individually fault-tolerant.

pub mod http_collector;
pub mod merge;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::helpers::identifier::IdentifierScheme;

/// Canonical metadata fields the assessment expects to find.
///
/// Seeds the session's reference element set, which shrinks as fields are
/// discovered during harvesting.
pub const REFERENCE_ELEMENTS: &[&str] = &[
    "object_identifier",
    "object_type",
    "title",
    "summary",
    "keywords",
    "creator",
    "contributor",
    "publisher",
    "publication_date",
    "created_date",
    "modified_date",
    "license",
    "access_level",
    "related_resources",
    "provenance_general",
    "object_content_identifier",
    "object_size",
    "datacite_client",
    "right_holder",
    "measured_variable",
];

/// How a partial record was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestMethod {
    /// Structured data embedded in the landing page itself
    Embedded,
    /// Typed links / signposting headers on the landing page
    TypedLinks,
    /// Content-negotiated alternate representation
    ContentNegotiation,
    /// Configured metadata-service endpoint
    ServiceEndpoint,
}

impl HarvestMethod {
    /// Whether the method retrieves metadata from outside the landing page
    pub fn is_external(&self) -> bool {
        matches!(self, Self::ContentNegotiation | Self::ServiceEndpoint)
    }
}

/// Serialization format of a harvested record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFormat {
    JsonLd,
    Rdfa,
    Microdata,
    DublinCore,
    RdfXml,
    Turtle,
    Json,
    Xml,
    Unknown,
}

impl MetadataFormat {
    /// Formats a search-engine parser understands without site-specific code
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            Self::JsonLd | Self::Rdfa | Self::Microdata | Self::DublinCore
        )
    }

    /// Formats serializable into a formal knowledge representation graph
    pub fn is_formal(&self) -> bool {
        matches!(self, Self::JsonLd | Self::Rdfa | Self::RdfXml | Self::Turtle)
    }
}

/// One partial metadata record with its provenance. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialRecord {
    pub method: HarvestMethod,
    pub source_url: String,
    pub format: MetadataFormat,
    /// Schema or profile the record claims to follow (may be empty)
    pub schema: String,
    /// Namespace URIs observed in the record
    pub namespaces: Vec<String>,
    /// Canonical field name -> value
    pub metadata: BTreeMap<String, Value>,
}

impl PartialRecord {
    pub fn new(
        method: HarvestMethod,
        source_url: impl Into<String>,
        format: MetadataFormat,
        metadata: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            method,
            source_url: source_url.into(),
            format,
            schema: String::new(),
            namespaces: Vec::new(),
            metadata,
        }
    }

    pub fn with_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }
}

/// Type of a configured metadata-service endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    OaiPmh,
    OgcCsw,
    Sparql,
}

/// An explicit metadata-service endpoint passed with the assessment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub url: String,
    pub kind: ServiceKind,
}

/// Outcome of one harvesting pass
#[derive(Debug, Default)]
pub struct Harvest {
    /// Partial records in retrieval order
    pub records: Vec<PartialRecord>,
    /// Landing page URL after redirects (embedded pass only)
    pub landing_url: Option<String>,
    /// URL the harvest started from
    pub origin_url: Option<String>,
    /// Detected persistent identifier in URL form
    pub pid_url: Option<String>,
    /// Scheme of the detected persistent identifier
    pub pid_scheme: Option<IdentifierScheme>,
    /// Documentation files fetched alongside metadata (location -> content)
    pub documents: BTreeMap<String, String>,
    /// Alternate target discovered mid-harvest. Requests a single re-entry
    /// into external harvesting; the session enforces the one-shot bound.
    pub repeat_pid_check: Option<String>,
}

/// Collector failure. Always treated as soft by the session: logged, the
/// affected pass contributes nothing, the pipeline continues.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Metadata collector contract.
///
/// Implementations retrieve raw metadata for a target and map it onto
/// canonical field names; extraction internals stay behind this trait.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Collect metadata embedded in the landing page or document itself
    /// (structured data, typed links, signposting), plus landing/PID facts
    /// and any documentation files needed by evaluators.
    async fn retrieve_embedded(&self, target: &str) -> Result<Harvest, CollectorError>;

    /// Collect metadata from external sources (content negotiation,
    /// configured service endpoints). `repeat` marks the one-shot re-entry
    /// pass against an alternate target.
    async fn retrieve_external(
        &self,
        target: &str,
        endpoint: Option<&ServiceEndpoint>,
        repeat: bool,
    ) -> Result<Harvest, CollectorError>;
}
