//! Configuration loading and validation for agentloom.
//!
//! Loads `~/.agentloom/config.toml` with environment variable overrides.
//! The API credential is required before any provider-backed run starts;
//! its absence is a fatal pre-flight error, not a lazy one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The root configuration. Maps directly to `~/.agentloom/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini API key; usually supplied via environment instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model served by the provider.
    #[serde(default = "default_model")]
    pub model: String,

    /// Application name used in session keys.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Retry policy for outbound model calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".into()
}

fn default_app_name() -> String {
    "agentloom".into()
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("model", &self.model)
            .field("app_name", &self.app_name)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Transient-failure retry settings for model calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total tries, including the first attempt.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Exponential backoff base.
    #[serde(default = "default_exp_base")]
    pub exp_base: f64,

    /// Delay before the second attempt, in seconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    /// HTTP status codes treated as transient.
    #[serde(default = "default_status_codes")]
    pub http_status_codes: Vec<u16>,
}

fn default_attempts() -> u32 {
    5
}
fn default_exp_base() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    1
}
fn default_status_codes() -> Vec<u16> {
    vec![429, 500, 503, 504]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            app_name: default_app_name(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            exp_base: default_exp_base(),
            initial_delay_secs: default_initial_delay(),
            http_status_codes: default_status_codes(),
        }
    }
}

impl AppConfig {
    /// Load from the default path with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_dir().join("config.toml"))?;

        // Environment takes priority over the file.
        if let Ok(model) = std::env::var("AGENTLOOM_MODEL") {
            config.model = model;
        }
        let env_key = std::env::var("AGENTLOOM_API_KEY")
            .ok()
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok());
        if env_key.is_some() {
            config.api_key = env_key;
        }

        Ok(config)
    }

    /// Load from an explicit path; a missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// The directory holding `config.toml`.
    pub fn config_dir() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".agentloom")
    }

    /// Structural validation, applied after parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.is_empty() {
            return Err(ConfigError::Validation("model must not be empty".into()));
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::Validation(
                "retry.attempts must be at least 1".into(),
            ));
        }
        if self.retry.exp_base < 1.0 {
            return Err(ConfigError::Validation(
                "retry.exp_base must be at least 1.0".into(),
            ));
        }
        Ok(())
    }

    /// The credential, or the fatal pre-flight error.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error(
        "No API key configured. Set AGENTLOOM_API_KEY (or GOOGLE_API_KEY / GEMINI_API_KEY), \
         or add api_key to ~/.agentloom/config.toml"
    )]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash-lite");
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.http_status_codes, vec![429, 500, 503, 504]);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "model = \"gemini-2.5-pro\"\n\n[retry]\nattempts = 3").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.exp_base, 2.0);
    }

    #[test]
    fn invalid_retry_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retry]\nattempts = 0").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn unparsable_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not toml {{{").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let config = AppConfig::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));

        let with_key = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        assert_eq!(with_key.require_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn debug_redacts_the_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
