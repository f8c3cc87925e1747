//! Repository registry lookup
//!
//! Maps a repository client id (as found in harvested metadata) to the
//! registry record of the hosting repository: endorsed metadata standards,
//! certificates, preservation policy. Evaluators use this to credit
//! community-standard and preservation metrics.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Registry API base URL
const REGISTRY_API_URL: &str = "https://api.datacite.org/re3data";

/// Default timeout for registry lookups
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry record of a hosting repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    /// Names of metadata standards the repository endorses
    pub metadata_standards: Vec<String>,
    /// Certificates held by the repository (e.g. CoreTrustSeal)
    pub certificates: Vec<String>,
    /// Declared metadata preservation / continuity policy URL
    pub preservation_policy: Option<String>,
}

/// Repository registry contract consumed by evaluators
#[async_trait]
pub trait RepositoryRegistry: Send + Sync {
    /// Look up a repository by client id. `None` covers both "unknown id"
    /// and lookup failure; failures are soft and logged.
    async fn lookup(&self, client_id: &str) -> Option<RepositoryRecord>;
}

/// Registry client backed by the re3data HTTP API
pub struct Re3DataRegistry {
    client: reqwest::Client,
}

impl Re3DataRegistry {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn parse_record(body: &Value) -> RepositoryRecord {
        let attributes = &body["data"]["attributes"];

        let string_list = |v: &Value| -> Vec<String> {
            v.as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| {
                            item.as_str()
                                .map(str::to_string)
                                .or_else(|| item["name"].as_str().map(str::to_string))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        RepositoryRecord {
            name: attributes["repositoryName"]
                .as_str()
                .or_else(|| attributes["name"].as_str())
                .unwrap_or_default()
                .to_string(),
            metadata_standards: string_list(&attributes["metadataStandards"]),
            certificates: string_list(&attributes["certificates"]),
            preservation_policy: attributes["dataAvailability"]
                .as_str()
                .or_else(|| attributes["policyUrl"].as_str())
                .map(str::to_string),
        }
    }
}

impl Default for Re3DataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryRegistry for Re3DataRegistry {
    async fn lookup(&self, client_id: &str) -> Option<RepositoryRecord> {
        let url = format!("{}/{}", REGISTRY_API_URL, client_id);
        debug!(client_id = %client_id, "Looking up repository registry record");

        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(client_id = %client_id, status = %r.status(), "Registry lookup rejected");
                return None;
            }
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Registry lookup failed");
                return None;
            }
        };

        match response.json::<Value>().await {
            Ok(body) => Some(Self::parse_record(&body)),
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Registry response parse failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_record() {
        let body = json!({
            "data": {
                "attributes": {
                    "repositoryName": "Example Archive",
                    "metadataStandards": [
                        {"name": "Dublin Core"},
                        {"name": "DataCite Metadata Schema"}
                    ],
                    "certificates": ["CoreTrustSeal"],
                    "dataAvailability": "https://example.org/preservation"
                }
            }
        });

        let record = Re3DataRegistry::parse_record(&body);
        assert_eq!(record.name, "Example Archive");
        assert_eq!(record.metadata_standards.len(), 2);
        assert_eq!(record.certificates, vec!["CoreTrustSeal"]);
        assert!(record.preservation_policy.is_some());
    }

    #[test]
    fn test_parse_record_tolerates_missing_fields() {
        let record = Re3DataRegistry::parse_record(&json!({"data": {}}));
        assert!(record.name.is_empty());
        assert!(record.metadata_standards.is_empty());
        assert!(record.preservation_policy.is_none());
    }
}
