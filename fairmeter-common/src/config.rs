//! Service configuration loading
//!
//! Resolution priority: environment variable pointing at a TOML file,
//! then the platform config directory, then compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file path
pub const CONFIG_ENV_VAR: &str = "FAIRMETER_CONFIG";

/// Service configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bind host for the HTTP API
    pub host: String,
    /// Bind port for the HTTP API
    pub port: u16,
    /// Timeout for document/metadata fetches, in seconds
    pub request_timeout_secs: u64,
    /// Timeout for identifier resolution calls, in milliseconds.
    /// Kept short so PID checks cannot stall an assessment.
    pub resolve_timeout_millis: u64,
    /// Maximum number of content identifiers inspected per assessment
    pub data_files_limit: usize,
    /// Optional directory holding versioned metrics configuration files.
    /// When unset, the compiled-in metrics configuration is used.
    pub metrics_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5790,
            request_timeout_secs: 5,
            resolve_timeout_millis: 1000,
            data_files_limit: 10,
            metrics_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Timeout for document/metadata fetches
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for identifier resolution calls
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_millis)
    }

    /// Load configuration following the resolution priority order.
    ///
    /// A missing config file is not an error (defaults apply); a present but
    /// unparsable file is.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            info!(path = %path, "Loading config from {}", CONFIG_ENV_VAR);
            return Self::from_file(Path::new(&path));
        }

        if let Some(dir) = dirs::config_dir() {
            let path = dir.join("fairmeter").join("config.toml");
            if path.exists() {
                info!(path = %path.display(), "Loading config file");
                return Self::from_file(&path);
            }
        }

        warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from an explicit TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 5790);
        assert_eq!(config.resolve_timeout(), Duration::from_millis(1000));
        assert_eq!(config.data_files_limit, 10);
        assert!(config.metrics_dir.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ServiceConfig::from_toml_str("port = 8080").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"0.0.0.0\"\nresolve_timeout_millis = 500").unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.resolve_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = ServiceConfig::from_toml_str("port = \"not a number\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
