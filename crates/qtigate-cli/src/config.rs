//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. Environment variables: `QTIGATE__SECTION__KEY`
//!    (e.g. `QTIGATE__SERVICE__API_TOKEN`)
//! 3. Config file (`--config FILE`, else the platform config dir)
//! 4. Built-in defaults (always present)

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use qtigate_core::application::ItemStrategy;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Content service used for ground-truth validation.
    pub service: ServiceConfig,
    /// Image reachability settings.
    pub reachability: ReachabilityConfig,
    /// Pipeline run settings.
    pub pipeline: PipelineConfig,
    /// Output settings.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Ground truth is skipped when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
    pub enabled: bool,
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on one document's pipeline run.
    pub timeout_secs: u64,
    pub item_strategy: ItemStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fetch_timeout_secs: 10,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            item_strategy: ItemStrategy::Oracle,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            format: "human".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// An explicit `config_file` must exist when `require_explicit` is set;
    /// the default location is always optional.
    pub fn load(config_file: Option<&PathBuf>, require_explicit: bool) -> anyhow::Result<Self> {
        let (path, required) = match config_file {
            Some(path) => (path.clone(), require_explicit),
            None => (Self::config_path(), false),
        };
        Self::load_from(&path, required)
    }

    fn load_from(path: &Path, required: bool) -> anyhow::Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .context("Failed to encode built-in configuration defaults")?;

        Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Toml).required(required))
            .add_source(
                Environment::with_prefix("QTIGATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("Invalid configuration value")
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.qtigate.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("com", "qtigate", "qtigate")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".qtigate.toml"))
    }

    /// Copy safe to print: the API token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.service.api_token.is_some() {
            copy.service.api_token = Some("********".into());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.service.request_timeout_secs, 30);
        assert_eq!(cfg.reachability.fetch_timeout_secs, 10);
        assert!(cfg.reachability.enabled);
        assert_eq!(cfg.pipeline.timeout_secs, 120);
        assert_eq!(cfg.pipeline.item_strategy, ItemStrategy::Oracle);
        assert!(cfg.service.base_url.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qtigate.toml");
        fs::write(
            &path,
            r#"
[service]
base_url = "https://content.example.com/api"

[pipeline]
item_strategy = "round-trip"
timeout_secs = 30
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path, true).unwrap();
        assert_eq!(
            cfg.service.base_url.as_deref(),
            Some("https://content.example.com/api")
        );
        assert_eq!(cfg.pipeline.item_strategy, ItemStrategy::RoundTrip);
        assert_eq!(cfg.pipeline.timeout_secs, 30);
        assert_eq!(cfg.service.request_timeout_secs, 30);
    }

    #[test]
    fn missing_optional_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(&dir.path().join("absent.toml"), false).unwrap();
        assert_eq!(cfg.output.format, "human");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::load_from(&dir.path().join("absent.toml"), true).is_err());
    }

    #[test]
    fn redacted_masks_token() {
        let mut cfg = AppConfig::default();
        cfg.service.api_token = Some("secret".into());
        assert_eq!(cfg.redacted().service.api_token.as_deref(), Some("********"));
    }

    #[test]
    fn config_path_is_not_empty() {
        assert!(!AppConfig::config_path().as_os_str().is_empty());
    }
}
