//! HTTP metadata collector
//!
//! Thin `Collector` implementation over plain HTTP: embedded JSON-LD blocks,
//! signposting link headers, content-negotiated JSON-LD documents, and
//! documentation files next to the landing page. Every fetch carries the
//! configured timeout; deep extraction (RDFa, microdata, wire protocols for
//! OAI-PMH/CSW/SPARQL services) is outside this collector.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    Collector, CollectorError, Harvest, HarvestMethod, MetadataFormat, PartialRecord,
    ServiceEndpoint,
};
use crate::helpers::identifier::IdentifierHelper;

/// Default timeout for document and metadata fetches
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Documentation files fetched alongside the landing page
const DOCUMENT_LOCATIONS: &[&str] = &["README.md", "CITATION.cff"];

static JSON_LD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid JSON-LD script regex")
});

/// HTTP-backed metadata collector
pub struct HttpCollector {
    client: reqwest::Client,
    /// Optional `Authorization` header value, e.g. "Bearer <token>"
    auth_header: Option<String>,
}

impl HttpCollector {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("Failed to create HTTP client"),
            auth_header: None,
        }
    }

    /// Attach an authentication credential sent with every request
    pub fn with_auth(mut self, scheme: &str, token: &str) -> Self {
        self.auth_header = Some(format!("{} {}", scheme, token));
        self
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(auth) = &self.auth_header {
            builder = builder.header(reqwest::header::AUTHORIZATION, auth.clone());
        }
        builder
    }

    /// Extract signposting typed links from `Link` response headers.
    /// Returns (rel, href) pairs.
    fn typed_links(response: &reqwest::Response) -> Vec<(String, String)> {
        let mut links = Vec::new();
        for value in response.headers().get_all(reqwest::header::LINK) {
            let Ok(text) = value.to_str() else { continue };
            for part in text.split(',') {
                let mut href = None;
                let mut rel = None;
                for segment in part.split(';') {
                    let segment = segment.trim();
                    if segment.starts_with('<') && segment.ends_with('>') {
                        href = Some(segment[1..segment.len() - 1].to_string());
                    } else if let Some(v) = segment.strip_prefix("rel=") {
                        rel = Some(v.trim_matches('"').to_lowercase());
                    }
                }
                if let (Some(href), Some(rel)) = (href, rel) {
                    links.push((rel, href));
                }
            }
        }
        links
    }

    /// Parse every embedded JSON-LD block in an HTML body into a partial record
    fn embedded_records(&self, body: &str, source_url: &str) -> Vec<PartialRecord> {
        let mut records = Vec::new();
        for caps in JSON_LD_RE.captures_iter(body) {
            match serde_json::from_str::<Value>(&caps[1]) {
                Ok(doc) => {
                    let (metadata, namespaces) = map_schema_org(&doc);
                    if !metadata.is_empty() {
                        records.push(
                            PartialRecord::new(
                                HarvestMethod::Embedded,
                                source_url,
                                MetadataFormat::JsonLd,
                                metadata,
                            )
                            .with_schema("schema.org")
                            .with_namespaces(namespaces),
                        );
                    }
                }
                Err(e) => {
                    debug!(source = %source_url, error = %e, "Skipping unparsable JSON-LD block");
                }
            }
        }
        records
    }

    /// Fetch a documentation file relative to the landing page, if present
    async fn fetch_document(&self, landing_url: &str, location: &str) -> Option<String> {
        let base = url::Url::parse(landing_url).ok()?;
        let target = base.join(location).ok()?;

        match self.request(target.as_str()).send().await {
            Ok(response) if response.status().is_success() => response.text().await.ok(),
            _ => None,
        }
    }
}

impl Default for HttpCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn retrieve_embedded(&self, target: &str) -> Result<Harvest, CollectorError> {
        let mut harvest = Harvest {
            origin_url: Some(target.to_string()),
            ..Default::default()
        };

        // establish PID facts and the URL to fetch
        let id_info = IdentifierHelper::detect(target);
        let fetch_url = match id_info.scheme {
            Some(scheme) if scheme.is_persistent() => {
                harvest.pid_url = Some(id_info.normalized.clone());
                harvest.pid_scheme = Some(scheme);
                id_info.normalized.clone()
            }
            _ => target.to_string(),
        };

        let response = self
            .request(&fetch_url)
            .header(reqwest::header::ACCEPT, "text/html, application/xhtml+xml")
            .send()
            .await
            .map_err(|e| CollectorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CollectorError::Network(format!(
                "Landing page fetch returned {}",
                response.status()
            )));
        }

        let landing_url = response.url().to_string();
        harvest.landing_url = Some(landing_url.clone());

        for (rel, href) in Self::typed_links(&response) {
            match rel.as_str() {
                "cite-as" => {
                    let cited = IdentifierHelper::detect(&href);
                    let is_new_pid = cited.scheme.is_some_and(|s| s.is_persistent())
                        && harvest.pid_url.as_deref() != Some(cited.normalized.as_str());
                    if is_new_pid {
                        debug!(pid = %cited.normalized, "Signposting cite-as announces a better PID");
                        if harvest.pid_url.is_none() {
                            harvest.pid_scheme = cited.scheme;
                        }
                        harvest.repeat_pid_check = Some(cited.normalized.clone());
                        harvest.pid_url = Some(cited.normalized);
                    }
                }
                "describedby" | "item" => {
                    debug!(rel = %rel, href = %href, "Signposting typed link found");
                }
                _ => {}
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| CollectorError::Network(e.to_string()))?;
        harvest.records = self.embedded_records(&body, &landing_url);

        for location in DOCUMENT_LOCATIONS {
            if let Some(content) = self.fetch_document(&landing_url, location).await {
                harvest.documents.insert(location.to_string(), content);
            }
        }

        Ok(harvest)
    }

    async fn retrieve_external(
        &self,
        target: &str,
        endpoint: Option<&ServiceEndpoint>,
        repeat: bool,
    ) -> Result<Harvest, CollectorError> {
        let mut harvest = Harvest::default();

        if let Some(endpoint) = endpoint {
            // Protocol-specific service clients live outside this collector;
            // an explicit endpoint is recorded but not harvested here.
            warn!(
                url = %endpoint.url,
                kind = ?endpoint.kind,
                "No protocol client for metadata-service endpoint, skipping"
            );
        }

        debug!(target = %target, repeat = repeat, "Content negotiation pass");

        let response = self
            .request(target)
            .header(
                reqwest::header::ACCEPT,
                "application/ld+json, application/json;q=0.9",
            )
            .send()
            .await
            .map_err(|e| CollectorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CollectorError::Network(format!(
                "Content negotiation returned {}",
                response.status()
            )));
        }

        let negotiated_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        if !negotiated_json {
            debug!(target = %target, "Server offered no JSON representation");
            return Ok(harvest);
        }

        let source_url = response.url().to_string();
        let doc: Value = response
            .json()
            .await
            .map_err(|e| CollectorError::Parse(e.to_string()))?;

        let (metadata, namespaces) = map_schema_org(&doc);
        if !metadata.is_empty() {
            harvest.records.push(
                PartialRecord::new(
                    HarvestMethod::ContentNegotiation,
                    source_url,
                    MetadataFormat::JsonLd,
                    metadata,
                )
                .with_schema("schema.org")
                .with_namespaces(namespaces),
            );
        }

        Ok(harvest)
    }
}

/// Map a schema.org-style document onto canonical field names.
///
/// Returns the canonical mapping plus the namespace URIs the document
/// declares in `@context`.
pub fn map_schema_org(doc: &Value) -> (BTreeMap<String, Value>, Vec<String>) {
    let mut metadata = BTreeMap::new();
    let mut namespaces = Vec::new();

    match &doc["@context"] {
        Value::String(ctx) => namespaces.push(ctx.clone()),
        Value::Array(items) => {
            namespaces.extend(items.iter().filter_map(|i| i.as_str().map(str::to_string)))
        }
        Value::Object(map) => namespaces.extend(
            map.values()
                .filter_map(|v| v.as_str().map(str::to_string)),
        ),
        _ => {}
    }

    let mut set = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            metadata.insert(key.to_string(), value);
        }
    };

    set("title", doc["name"].as_str().map(Value::from));
    set("summary", doc["description"].as_str().map(Value::from));
    set("object_type", doc["@type"].as_str().map(Value::from));
    set("publication_date", doc["datePublished"].as_str().map(Value::from));
    set("created_date", doc["dateCreated"].as_str().map(Value::from));
    set("modified_date", doc["dateModified"].as_str().map(Value::from));
    set("access_level", doc["conditionsOfAccess"].as_str().map(Value::from));
    set("keywords", flatten_keywords(&doc["keywords"]));
    set("creator", agent_names(&doc["creator"]).or_else(|| agent_names(&doc["author"])));
    set("publisher", agent_names(&doc["publisher"]));
    set("license", license_value(&doc["license"]));
    set("object_identifier", identifier_value(&doc["identifier"]).or_else(|| doc["@id"].as_str().map(Value::from)));
    set("object_size", doc["contentSize"].as_str().map(Value::from));
    set("object_content_identifier", distributions(&doc["distribution"]));
    set("related_resources", related_resources(doc));

    (metadata, namespaces)
}

fn flatten_keywords(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => Some(Value::Array(
            s.split(',')
                .map(|k| Value::from(k.trim()))
                .filter(|k| k.as_str() != Some(""))
                .collect(),
        )),
        Value::Array(_) => Some(value.clone()),
        _ => None,
    }
}

fn agent_names(value: &Value) -> Option<Value> {
    let name_of = |v: &Value| -> Option<String> {
        v.as_str()
            .map(str::to_string)
            .or_else(|| v["name"].as_str().map(str::to_string))
    };

    match value {
        Value::Array(items) => {
            let names: Vec<Value> = items.iter().filter_map(|i| name_of(i).map(Value::from)).collect();
            (!names.is_empty()).then_some(Value::Array(names))
        }
        other => name_of(other).map(Value::from),
    }
}

fn license_value(value: &Value) -> Option<Value> {
    value
        .as_str()
        .map(Value::from)
        .or_else(|| value["url"].as_str().map(Value::from))
        .or_else(|| value["@id"].as_str().map(Value::from))
}

fn identifier_value(value: &Value) -> Option<Value> {
    value
        .as_str()
        .map(Value::from)
        .or_else(|| value["value"].as_str().map(Value::from))
        .or_else(|| value["@id"].as_str().map(Value::from))
}

fn distributions(value: &Value) -> Option<Value> {
    let entry_of = |item: &Value| -> Option<Value> {
        let url = item["contentUrl"].as_str().or_else(|| item["url"].as_str())?;
        Some(serde_json::json!({
            "url": url,
            "type": item["encodingFormat"].clone(),
            "size": item["contentSize"].clone(),
        }))
    };

    match value {
        Value::Array(items) => {
            let entries: Vec<Value> = items.iter().filter_map(entry_of).collect();
            (!entries.is_empty()).then_some(Value::Array(entries))
        }
        Value::Object(_) => entry_of(value).map(|e| Value::Array(vec![e])),
        _ => None,
    }
}

fn related_resources(doc: &Value) -> Option<Value> {
    let mut relations = Vec::new();
    for relation in ["isPartOf", "hasPart", "sameAs", "citation", "isBasedOn"] {
        let targets = match &doc[relation] {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|i| {
                    i.as_str()
                        .map(str::to_string)
                        .or_else(|| i["@id"].as_str().map(str::to_string))
                })
                .collect(),
            Value::Object(o) => o
                .get("@id")
                .and_then(|v| v.as_str())
                .map(|s| vec![s.to_string()])
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        for target in targets {
            relations.push(serde_json::json!({
                "relation_type": relation,
                "related_resource": target,
            }));
        }
    }
    (!relations.is_empty()).then_some(Value::Array(relations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_schema_org_core_fields() {
        let doc = json!({
            "@context": "https://schema.org/",
            "@type": "Dataset",
            "name": "Ocean Temperatures",
            "description": "Monthly gridded sea surface temperatures",
            "license": "https://creativecommons.org/licenses/by/4.0/",
            "identifier": "https://doi.org/10.5281/zenodo.1234567",
            "creator": [{"name": "Jane Poole"}, {"name": "Wei Zhang"}],
            "keywords": "ocean, temperature,  climate",
            "datePublished": "2023-05-01",
            "distribution": [{
                "contentUrl": "https://example.org/sst.csv",
                "encodingFormat": "text/csv",
                "contentSize": "10 MB"
            }]
        });

        let (metadata, namespaces) = map_schema_org(&doc);
        assert_eq!(namespaces, vec!["https://schema.org/"]);
        assert_eq!(metadata["title"], "Ocean Temperatures");
        assert_eq!(metadata["object_type"], "Dataset");
        assert_eq!(metadata["creator"], json!(["Jane Poole", "Wei Zhang"]));
        assert_eq!(metadata["keywords"], json!(["ocean", "temperature", "climate"]));
        assert_eq!(
            metadata["object_content_identifier"],
            json!([{"url": "https://example.org/sst.csv", "type": "text/csv", "size": "10 MB"}])
        );
    }

    #[test]
    fn test_map_schema_org_related_resources() {
        let doc = json!({
            "sameAs": "https://other.example.org/dataset/1",
            "isPartOf": {"@id": "https://example.org/collection/9"}
        });

        let (metadata, _) = map_schema_org(&doc);
        let relations = metadata["related_resources"].as_array().unwrap();
        assert_eq!(relations.len(), 2);
        assert!(relations.iter().any(|r| r["relation_type"] == "sameAs"));
    }

    #[test]
    fn test_map_schema_org_empty_doc() {
        let (metadata, namespaces) = map_schema_org(&json!({}));
        assert!(metadata.is_empty());
        assert!(namespaces.is_empty());
    }

    #[test]
    fn test_embedded_records_from_html() {
        let collector = HttpCollector::new();
        let html = r#"<html><head>
            <script type="application/ld+json">{"name": "X", "@context": "https://schema.org/"}</script>
            <script type="application/ld+json">not json</script>
        </head></html>"#;

        let records = collector.embedded_records(html, "https://example.org/ds/1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata["title"], "X");
        assert_eq!(records[0].method, HarvestMethod::Embedded);
    }
}
