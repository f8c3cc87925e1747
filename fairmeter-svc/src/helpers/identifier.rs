//! Identifier scheme detection, normalization and resolution
//!
//! Resolution is a blocking network round-trip with a hard sub-second
//! timeout: an unresolvable identifier must never stall an assessment.
//! Failures degrade to "could not resolve" and are reported in the returned
//! info, never raised.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default timeout for identifier resolution calls
const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Maximum redirects to follow while resolving
const MAX_REDIRECTS: usize = 10;

static DOI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:)?(10\.\d{4,9}/\S+)$")
        .expect("valid DOI regex")
});

static HANDLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://hdl\.handle\.net/|hdl:)(\d[\d.]*/\S+)$").expect("valid handle regex")
});

static ARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:https?://[^/]+/)?(ark:/\S+)$").expect("valid ARK regex"));

/// Identifier scheme detected from a candidate string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierScheme {
    Doi,
    Handle,
    Ark,
    Purl,
    Urn,
    Url,
}

impl IdentifierScheme {
    /// Whether the scheme guarantees persistence (registrar-backed)
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Url)
    }
}

impl fmt::Display for IdentifierScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Doi => "doi",
            Self::Handle => "handle",
            Self::Ark => "ark",
            Self::Purl => "purl",
            Self::Urn => "urn",
            Self::Url => "url",
        };
        write!(f, "{}", name)
    }
}

/// Everything known about a candidate identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierInfo {
    /// Detected scheme, if any
    pub scheme: Option<IdentifierScheme>,
    /// Normalized (URL) form of the identifier
    pub normalized: String,
    /// Final URL the identifier resolved to, if resolution succeeded
    pub resolved_url: Option<String>,
    /// Whether the candidate is syntactically valid for its scheme
    pub valid: bool,
}

/// Identifier helper bound to a short-timeout HTTP client
pub struct IdentifierHelper {
    client: reqwest::Client,
}

impl IdentifierHelper {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_RESOLVE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Detect the scheme of a candidate identifier and produce its
    /// normalized URL form. Purely syntactic; no network access.
    pub fn detect(candidate: &str) -> IdentifierInfo {
        let candidate = candidate.trim();

        if let Some(caps) = DOI_RE.captures(candidate) {
            return IdentifierInfo {
                scheme: Some(IdentifierScheme::Doi),
                normalized: format!("https://doi.org/{}", &caps[1]),
                resolved_url: None,
                valid: true,
            };
        }

        if let Some(caps) = HANDLE_RE.captures(candidate) {
            return IdentifierInfo {
                scheme: Some(IdentifierScheme::Handle),
                normalized: format!("https://hdl.handle.net/{}", &caps[1]),
                resolved_url: None,
                valid: true,
            };
        }

        if let Some(caps) = ARK_RE.captures(candidate) {
            let authority = url::Url::parse(candidate)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "n2t.net".to_string());
            return IdentifierInfo {
                scheme: Some(IdentifierScheme::Ark),
                normalized: format!("https://{}/{}", authority, &caps[1]),
                resolved_url: None,
                valid: true,
            };
        }

        if candidate.to_lowercase().starts_with("urn:") {
            return IdentifierInfo {
                scheme: Some(IdentifierScheme::Urn),
                normalized: candidate.to_string(),
                resolved_url: None,
                valid: candidate.splitn(3, ':').count() == 3,
            };
        }

        match url::Url::parse(candidate) {
            Ok(parsed) => {
                let scheme = if parsed.host_str().is_some_and(|h| h.ends_with("purl.org")) {
                    IdentifierScheme::Purl
                } else {
                    IdentifierScheme::Url
                };
                IdentifierInfo {
                    scheme: Some(scheme),
                    normalized: parsed.to_string(),
                    resolved_url: None,
                    valid: parsed.host_str().is_some(),
                }
            }
            Err(_) => IdentifierInfo {
                scheme: None,
                normalized: candidate.to_string(),
                resolved_url: None,
                valid: false,
            },
        }
    }

    /// Detect and resolve a candidate identifier.
    ///
    /// Resolution follows redirects to the final landing URL. Any network
    /// failure or timeout leaves `resolved_url` unset; nothing is raised.
    pub async fn resolve(&self, candidate: &str) -> IdentifierInfo {
        let mut info = Self::detect(candidate);
        if !info.valid {
            return info;
        }

        // URNs have no default resolver endpoint
        if info.scheme == Some(IdentifierScheme::Urn) {
            return info;
        }

        match self.client.get(&info.normalized).send().await {
            Ok(response) if response.status().is_success() || response.status().is_redirection() => {
                info.resolved_url = Some(response.url().to_string());
            }
            Ok(response) => {
                debug!(
                    identifier = %info.normalized,
                    status = %response.status(),
                    "Identifier did not resolve"
                );
            }
            Err(e) => {
                debug!(identifier = %info.normalized, error = %e, "Identifier resolution failed");
            }
        }
        info
    }
}

impl Default for IdentifierHelper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_doi_forms() {
        for candidate in [
            "10.5281/zenodo.1234567",
            "doi:10.5281/zenodo.1234567",
            "https://doi.org/10.5281/zenodo.1234567",
            "https://dx.doi.org/10.5281/zenodo.1234567",
        ] {
            let info = IdentifierHelper::detect(candidate);
            assert_eq!(info.scheme, Some(IdentifierScheme::Doi), "candidate: {}", candidate);
            assert_eq!(info.normalized, "https://doi.org/10.5281/zenodo.1234567");
            assert!(info.valid);
        }
    }

    #[test]
    fn test_detect_handle() {
        let info = IdentifierHelper::detect("https://hdl.handle.net/11234/1-3105");
        assert_eq!(info.scheme, Some(IdentifierScheme::Handle));
        assert_eq!(info.normalized, "https://hdl.handle.net/11234/1-3105");
    }

    #[test]
    fn test_detect_ark_and_urn() {
        let ark = IdentifierHelper::detect("https://n2t.net/ark:/12345/x54xz321");
        assert_eq!(ark.scheme, Some(IdentifierScheme::Ark));

        let urn = IdentifierHelper::detect("urn:nbn:de:1234-5678");
        assert_eq!(urn.scheme, Some(IdentifierScheme::Urn));
        assert!(urn.valid);
    }

    #[test]
    fn test_detect_plain_url_and_purl() {
        let url = IdentifierHelper::detect("https://example.org/dataset/1");
        assert_eq!(url.scheme, Some(IdentifierScheme::Url));
        assert!(!url.scheme.unwrap().is_persistent());

        let purl = IdentifierHelper::detect("https://purl.org/example/thing");
        assert_eq!(purl.scheme, Some(IdentifierScheme::Purl));
        assert!(purl.scheme.unwrap().is_persistent());
    }

    #[test]
    fn test_detect_garbage() {
        let info = IdentifierHelper::detect("not an identifier at all");
        assert_eq!(info.scheme, None);
        assert!(!info.valid);
    }
}
