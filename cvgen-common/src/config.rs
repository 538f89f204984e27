//! Configuration management for the CV generator backend.
//!
//! Configuration lives at `~/.cvgen/config.json` and is optional: every
//! field has a default, and environment variables override file values.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `OPENAI_API_KEY` → secrets.openai (required; startup fails without it)
//! - `PORT` / `CVGEN_PORT` → server.port
//! - `CVGEN_BIND` → server.bind
//! - `CVGEN_PUBLIC_URL` → server.public_url
//! - `CVGEN_STATIC_DIR` → server.static_dir
//! - `CVGEN_MODEL` → provider.model
//! - `CVGEN_MAX_TURNS` → session.max_turns
//! - `CVGEN_SESSION_TTL_SECS` → session.ttl_secs
//! - `CVGEN_EVICT_INTERVAL_SECS` → session.evict_interval_secs
//! - `CVGEN_LOG_LEVEL` → observability.log_level
//! - `CVGEN_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".cvgen"),
        |dirs| dirs.home_dir().join(".cvgen"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address. Default: "127.0.0.1" (local only).
    /// Set to "0.0.0.0" for remote access.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Public base URL used by the keep-alive self-ping (optional).
    /// When unset, the keep-alive task does not run.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Directory holding the front-end assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            public_url: None,
            static_dir: default_static_dir(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_bind() -> String {
    "127.0.0.1".into()
}

fn default_static_dir() -> String {
    "public".into()
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Session memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum turns kept per session; oldest are dropped first.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Idle time after which a session is evicted, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between eviction sweeps, in seconds.
    #[serde(default = "default_evict_interval_secs")]
    pub evict_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            ttl_secs: default_ttl_secs(),
            evict_interval_secs: default_evict_interval_secs(),
        }
    }
}

fn default_max_turns() -> usize {
    6
}

fn default_ttl_secs() -> u64 {
    30 * 60
}

fn default_evict_interval_secs() -> u64 {
    10 * 60
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model identifier passed to the provider.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the provider API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a single completion call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_request_timeout_secs() -> u64 {
    60
}

// ============================================================================
// Secrets Configuration
// ============================================================================

/// Sensitive credentials, kept out of the other sections.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// OpenAI API key. Required; the process refuses to start without it.
    #[serde(default)]
    pub openai: Option<String>,
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Top-level Configuration
// ============================================================================

/// Unified configuration for the CVGen backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, apply environment
    /// overrides, and validate required secrets.
    ///
    /// A missing `OPENAI_API_KEY` is a fatal configuration error.
    pub fn load() -> Result<Self> {
        let mut config = Self::read_file()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read the config file, falling back to defaults when absent.
    fn read_file() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path. No env overlay, no
    /// validation; useful for tests.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("CVGEN_PORT").or_else(|_| std::env::var("PORT")) {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(bind) = std::env::var("CVGEN_BIND") {
            self.server.bind = bind;
        }
        if let Ok(url) = std::env::var("CVGEN_PUBLIC_URL") {
            self.server.public_url = Some(url);
        }
        if let Ok(dir) = std::env::var("CVGEN_STATIC_DIR") {
            self.server.static_dir = dir;
        }

        if let Ok(model) = std::env::var("CVGEN_MODEL") {
            self.provider.model = model;
        }

        if let Ok(v) = std::env::var("CVGEN_MAX_TURNS") {
            if let Ok(n) = v.parse() {
                self.session.max_turns = n;
            }
        }
        if let Ok(v) = std::env::var("CVGEN_SESSION_TTL_SECS") {
            if let Ok(n) = v.parse() {
                self.session.ttl_secs = n;
            }
        }
        if let Ok(v) = std::env::var("CVGEN_EVICT_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.session.evict_interval_secs = n;
            }
        }

        if let Ok(level) = std::env::var("CVGEN_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("CVGEN_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.secrets.openai = Some(key);
        }
    }

    /// Validate required settings. The API key has no sane default, so a
    /// missing one must stop the process before it serves traffic.
    pub fn validate(&self) -> Result<()> {
        match self.secrets.openai.as_deref() {
            Some(key) if !key.is_empty() => Ok(()),
            _ => anyhow::bail!(
                "OPENAI_API_KEY not set: add it to the environment or to {}",
                config_path().display()
            ),
        }
    }

    /// Get the configured API key, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.secrets.openai.as_deref().filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.static_dir, "public");
        assert_eq!(config.session.max_turns, 6);
        assert_eq!(config.session.ttl_secs, 1800);
        assert_eq!(config.session.evict_interval_secs, 600);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.observability.log_level, "info");
        assert!(config.server.public_url.is_none());
        assert!(config.secrets.openai.is_none());
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.secrets.openai = Some(String::new());
        assert!(config.validate().is_err());

        config.secrets.openai = Some("sk-test".into());
        assert!(config.validate().is_ok());
        assert_eq!(config.api_key(), Some("sk-test"));
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "server": { "port": 8080 }, "session": { "max_turns": 8 } }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session.max_turns, 8);
        // Untouched sections keep their defaults
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.session.ttl_secs, 1800);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    // Process environment is global; this is the only test that touches
    // these variables, so it stays safe under parallel test execution.
    #[test]
    fn test_env_overrides_beat_file_values() {
        std::env::set_var("PORT", "4000");
        std::env::set_var("CVGEN_PORT", "5000");
        std::env::set_var("CVGEN_BIND", "0.0.0.0");
        std::env::set_var("CVGEN_PUBLIC_URL", "https://cvgen.example.com");
        std::env::set_var("CVGEN_MODEL", "gpt-4o");
        std::env::set_var("CVGEN_SESSION_TTL_SECS", "900");
        std::env::set_var("CVGEN_MAX_TURNS", "not-a-number");
        std::env::set_var("OPENAI_API_KEY", "sk-from-env");

        // Start from file-style values that every override must beat
        let mut config = Config::default();
        config.server.port = 8080;
        config.server.bind = "10.0.0.1".into();
        config.provider.model = "gpt-3.5-turbo".into();
        config.session.ttl_secs = 60;
        config.session.max_turns = 4;
        config.secrets.openai = Some("sk-from-file".into());

        config.apply_env_overrides();

        // CVGEN_PORT wins over both the file value and plain PORT
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(
            config.server.public_url.as_deref(),
            Some("https://cvgen.example.com")
        );
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.session.ttl_secs, 900);
        // Unparseable numeric override leaves the existing value alone
        assert_eq!(config.session.max_turns, 4);
        assert_eq!(config.api_key(), Some("sk-from-env"));

        // PORT alone applies when CVGEN_PORT is absent
        std::env::remove_var("CVGEN_PORT");
        config.apply_env_overrides();
        assert_eq!(config.server.port, 4000);

        for var in [
            "PORT",
            "CVGEN_BIND",
            "CVGEN_PUBLIC_URL",
            "CVGEN_MODEL",
            "CVGEN_SESSION_TTL_SECS",
            "CVGEN_MAX_TURNS",
            "OPENAI_API_KEY",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.provider.model, config.provider.model);
    }
}
