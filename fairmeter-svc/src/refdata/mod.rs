//! Process-wide reference data store
//!
//! Immutable tables shared by every assessment: licenses, community metadata
//! standards, namespace lists, standard protocols and file format
//! classifications. The store is initialized at most once per process behind
//! a `OnceCell` barrier and handed to sessions as a reference; sessions never
//! reach for it through ambient globals and never mutate it.
//!
//! Lookups come in exact and fuzzy flavors. Fuzzy matching uses token-sort
//! similarity (normalize, sort tokens, normalized Levenshtein) with the
//! thresholds the scoring rules require: >80% for standard names, >90% for
//! standard URIs.

use fairmeter_common::{Error, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

/// Compiled-in reference tables
const REFERENCE_DATA: &str = include_str!("../../assets/reference_data.yaml");

/// Similarity threshold for fuzzy standard-name lookups (percent)
const NAME_SIMILARITY_THRESHOLD: f64 = 80.0;

/// Similarity threshold for fuzzy standard-URI lookups (percent)
const URI_SIMILARITY_THRESHOLD: f64 = 90.0;

static STORE: OnceCell<ReferenceData> = OnceCell::new();

/// One license table entry
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseEntry {
    pub license_id: String,
    pub name: String,
    #[serde(default)]
    pub reference_urls: Vec<String>,
}

/// One community metadata standard entry
#[derive(Debug, Clone, Deserialize)]
pub struct StandardEntry {
    pub name: String,
    pub acronym: String,
    pub uri: String,
}

/// One file format classification entry
#[derive(Debug, Clone, Deserialize)]
pub struct FileFormatEntry {
    pub mime: String,
    #[serde(default)]
    pub scientific: bool,
    #[serde(default)]
    pub long_term: bool,
    #[serde(default)]
    pub open: bool,
}

/// The immutable reference data tables
#[derive(Debug, Deserialize)]
pub struct ReferenceData {
    pub licenses: Vec<LicenseEntry>,
    pub metadata_standards: Vec<StandardEntry>,
    pub default_namespaces: Vec<String>,
    pub vocab_namespaces: Vec<String>,
    pub provenance_namespaces: Vec<String>,
    pub standard_protocols: Vec<String>,
    pub access_level_terms: BTreeMap<String, String>,
    pub file_formats: Vec<FileFormatEntry>,
}

impl ReferenceData {
    /// Initialize (once) and return the process-wide store.
    ///
    /// Concurrent first callers race on the same barrier; exactly one parse
    /// happens. A parse failure is fatal: assessments cannot run without
    /// reference tables.
    pub fn global() -> Result<&'static ReferenceData> {
        STORE.get_or_try_init(|| {
            let data = Self::parse(REFERENCE_DATA)?;
            info!(
                licenses = data.licenses.len(),
                standards = data.metadata_standards.len(),
                formats = data.file_formats.len(),
                "Reference data store initialized"
            );
            Ok(data)
        })
    }

    fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse reference data failed: {}", e)))
    }

    /// Exact license lookup by SPDX-style id, name, or reference URL.
    /// Comparison is case-insensitive; URLs are compared ignoring scheme
    /// and trailing slash.
    pub fn license_lookup(&self, value: &str) -> Option<&LicenseEntry> {
        let needle = value.trim().to_lowercase();
        let needle_url = strip_url_decoration(&needle);
        self.licenses.iter().find(|entry| {
            entry.license_id.to_lowercase() == needle
                || entry.name.to_lowercase() == needle
                || entry
                    .reference_urls
                    .iter()
                    .any(|u| strip_url_decoration(&u.to_lowercase()) == needle_url)
        })
    }

    /// Fuzzy standard lookup by name (token-sort similarity > 80%)
    pub fn standard_by_name(&self, value: &str) -> Option<&StandardEntry> {
        best_match(value, self.metadata_standards.iter(), |s| s.name.as_str())
            .filter(|(_, similarity)| *similarity > NAME_SIMILARITY_THRESHOLD)
            .map(|(entry, _)| entry)
    }

    /// Fuzzy standard lookup by URI (token-sort similarity > 90%)
    pub fn standard_by_uri(&self, value: &str) -> Option<&StandardEntry> {
        best_match(value, self.metadata_standards.iter(), |s| s.uri.as_str())
            .filter(|(_, similarity)| *similarity > URI_SIMILARITY_THRESHOLD)
            .map(|(entry, _)| entry)
    }

    /// Whether a namespace URI is one of the generic defaults
    pub fn is_default_namespace(&self, uri: &str) -> bool {
        self.default_namespaces.iter().any(|n| uri.starts_with(n))
    }

    /// Whether a namespace URI matches a registered semantic vocabulary
    pub fn is_vocab_namespace(&self, uri: &str) -> bool {
        self.vocab_namespaces.iter().any(|n| uri.starts_with(n))
    }

    /// Whether a namespace URI belongs to a provenance vocabulary
    pub fn is_provenance_namespace(&self, uri: &str) -> bool {
        self.provenance_namespaces.iter().any(|n| uri.starts_with(n))
    }

    /// Whether a URL scheme is a standard communication protocol
    pub fn is_standard_protocol(&self, scheme: &str) -> bool {
        let scheme = scheme.to_lowercase();
        self.standard_protocols.iter().any(|p| *p == scheme)
    }

    /// Map an access level value (term or vocabulary URI) to its canonical
    /// term, if recognized.
    pub fn access_level_term(&self, value: &str) -> Option<&str> {
        let needle = value.trim().to_lowercase();
        self.access_level_terms
            .iter()
            .find(|(term, uri)| needle.contains(term.as_str()) || needle == uri.to_lowercase())
            .map(|(term, _)| term.as_str())
    }

    /// Classification flags for a MIME type, if the format is known
    pub fn file_format(&self, mime: &str) -> Option<&FileFormatEntry> {
        let needle = mime.trim().to_lowercase();
        self.file_formats.iter().find(|f| f.mime == needle)
    }
}

/// Best fuzzy match for `value` over `candidates`, with its similarity score
fn best_match<'a, T, I, F>(value: &str, candidates: I, key: F) -> Option<(&'a T, f64)>
where
    I: Iterator<Item = &'a T>,
    F: Fn(&T) -> &str,
{
    candidates
        .map(|c| (c, token_sort_similarity(value, key(c))))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Token-sort similarity in percent (0-100).
///
/// Both strings are lowercased, split on non-alphanumeric runs, token-sorted
/// and rejoined before a normalized Levenshtein comparison, so word order and
/// punctuation differences do not mask a match.
pub fn token_sort_similarity(a: &str, b: &str) -> f64 {
    let normalize = |s: &str| {
        let mut tokens: Vec<String> = s
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        tokens.sort();
        tokens.join(" ")
    };
    strsim::normalized_levenshtein(&normalize(a), &normalize(b)) * 100.0
}

/// Strip scheme and trailing slash so license URLs compare by identity
fn strip_url_decoration(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> &'static ReferenceData {
        ReferenceData::global().unwrap()
    }

    #[test]
    fn test_global_initializes_once() {
        let a = ReferenceData::global().unwrap() as *const _;
        let b = ReferenceData::global().unwrap() as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn test_license_lookup_by_id_name_and_url() {
        assert_eq!(store().license_lookup("CC-BY-4.0").unwrap().license_id, "CC-BY-4.0");
        assert_eq!(store().license_lookup("mit license").unwrap().license_id, "MIT");
        assert_eq!(
            store()
                .license_lookup("http://creativecommons.org/licenses/by/4.0")
                .unwrap()
                .license_id,
            "CC-BY-4.0"
        );
        assert!(store().license_lookup("My Custom License").is_none());
    }

    #[test]
    fn test_fuzzy_standard_name_threshold() {
        // "Dublin Core" vs canonical "Dublin Core": exact
        assert_eq!(store().standard_by_name("Dublin Core").unwrap().acronym, "DC");
        // token order and punctuation do not matter
        assert_eq!(store().standard_by_name("core dublin").unwrap().acronym, "DC");
        // far-off names stay below the 80% threshold
        assert!(store().standard_by_name("Relational Database Dump").is_none());
    }

    #[test]
    fn test_fuzzy_uri_threshold() {
        assert_eq!(
            store().standard_by_uri("http://purl.org/dc/elements/1.1/").unwrap().acronym,
            "DC"
        );
        assert!(store().standard_by_uri("http://example.org/my/schema").is_none());
    }

    #[test]
    fn test_token_sort_similarity() {
        assert_eq!(token_sort_similarity("Dublin Core", "Core Dublin"), 100.0);
        let s = token_sort_similarity("Dublin Core", "DublinCore");
        assert!(s > 80.0 && s < 100.0);
        assert!(token_sort_similarity("Dublin Core", "ISO 19115") < 50.0);
    }

    #[test]
    fn test_namespace_classification() {
        assert!(store().is_default_namespace("http://schema.org/"));
        assert!(!store().is_default_namespace("http://purl.org/dc/terms/"));
        assert!(store().is_vocab_namespace("http://purl.org/dc/terms/title"));
        assert!(store().is_provenance_namespace("http://www.w3.org/ns/prov#wasGeneratedBy"));
    }

    #[test]
    fn test_protocol_and_format_tables() {
        assert!(store().is_standard_protocol("https"));
        assert!(!store().is_standard_protocol("gopher"));

        let csv = store().file_format("text/csv").unwrap();
        assert!(csv.open && csv.long_term && csv.scientific);
        assert!(store().file_format("application/x-proprietary").is_none());
    }

    #[test]
    fn test_access_level_terms() {
        assert_eq!(store().access_level_term("Public").unwrap(), "public");
        assert_eq!(
            store()
                .access_level_term("https://vocabularies.coar-repositories.org/access_rights/c_abf2/")
                .unwrap(),
            "public"
        );
        assert!(store().access_level_term("whenever").is_none());
    }
}
