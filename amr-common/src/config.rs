//! Configuration loading for the catalog service
//!
//! TOML file with environment-variable overrides; a missing file falls back
//! to compiled defaults with a warning so a bare checkout still starts.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted when no classifier API key is configured
pub const CLASSIFIER_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5840
}

fn default_database_path() -> PathBuf {
    PathBuf::from("amr_catalog.db")
}

fn default_taxonomy_path() -> PathBuf {
    PathBuf::from("taxonomy.yaml")
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// External classifier settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// API key; when absent the `ANTHROPIC_API_KEY` environment variable is
    /// consulted, and when that is also absent the extraction endpoints
    /// report the classifier as unconfigured.
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Generous fixed ceiling on fetch and classify calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClassifierConfig {
    /// Resolve the API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(CLASSIFIER_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Admin authentication settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Password accepted by the login endpoint
    pub password: Option<String>,
    /// Bearer token issued on login and checked on admin routes
    pub token: Option<String>,
}

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_taxonomy_path")]
    pub taxonomy_path: PathBuf,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            taxonomy_path: default_taxonomy_path(),
            admin: AdminConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults with a warning; a present but
    /// malformed file is an error, since running with silently-ignored
    /// settings is worse than failing startup.
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            warn!(
                path = %path.display(),
                "Config file not found; using defaults"
            );
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&text)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
