//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Subscription credentials are overridden by the `SUPABASE_URL` and
//! `SUPABASE_ANON_KEY` environment variables (a `.env` file is honoured).

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

pub const ENV_SUBSCRIPTION_URL: &str = "SUPABASE_URL";
pub const ENV_SUBSCRIPTION_KEY: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Service endpoint, e.g. https://<project>.supabase.co
    #[serde(default)]
    pub url: Option<String>,
    /// Public (anon) access key
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "landing_subscribers".to_string()
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { url: None, anon_key: None, table: default_table() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Idle time after which a visitor's demo session is torn down
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_sweep_interval_secs() -> u64 {
    30
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            max_sessions: default_max_sessions(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    bind_address: String,
    port: u16,
    subscription_url: Option<String>,
    subscription_key: Option<String>,
    subscription_table: String,
    session_idle_timeout_secs: u64,
    max_sessions: usize,
    session_sweep_interval_secs: u64,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            subscription_url: toml_config.subscription.url,
            subscription_key: toml_config.subscription.anon_key,
            subscription_table: toml_config.subscription.table,
            session_idle_timeout_secs: toml_config.sessions.idle_timeout_secs,
            max_sessions: toml_config.sessions.max_sessions,
            session_sweep_interval_secs: toml_config.sessions.sweep_interval_secs,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file,
        }
    }

    /// Determine config file path: `--config`, then `CONFIG_FILE`, then the dev default
    pub fn resolve_config_path(cli_path: Option<String>) -> String {
        cli_path
            .or_else(|| env::var("CONFIG_FILE").ok())
            .unwrap_or_else(|| "config/dev.toml".to_string())
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Apply `SUPABASE_URL` / `SUPABASE_ANON_KEY` from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(env::var(ENV_SUBSCRIPTION_URL).ok(), env::var(ENV_SUBSCRIPTION_KEY).ok())
    }

    /// Override subscription credentials when the given values are non-empty
    pub fn with_overrides(mut self, url: Option<String>, anon_key: Option<String>) -> Self {
        if let Some(url) = url.filter(|v| !v.trim().is_empty()) {
            self.subscription_url = Some(url);
        }
        if let Some(key) = anon_key.filter(|v| !v.trim().is_empty()) {
            self.subscription_key = Some(key);
        }
        self
    }

    /// Endpoint URL and access key, both required to build the subscription client
    pub fn subscription_credentials(&self) -> anyhow::Result<(&str, &str)> {
        let url = self
            .subscription_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .with_context(|| format!("{ENV_SUBSCRIPTION_URL} is not set"))?;
        let key = self
            .subscription_key
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .with_context(|| format!("{ENV_SUBSCRIPTION_KEY} is not set"))?;
        Ok((url, key))
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn subscription_url(&self) -> Option<&str> {
        self.subscription_url.as_deref()
    }

    pub fn subscription_table(&self) -> &str {
        &self.subscription_table
    }

    pub fn session_idle_timeout_secs(&self) -> u64 {
        self.session_idle_timeout_secs
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn session_sweep_interval_secs(&self) -> u64 {
        self.session_sweep_interval_secs
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.subscription_table(), "landing_subscribers");
        assert_eq!(config.session_idle_timeout_secs(), 600);
        assert_eq!(config.max_sessions(), 10_000);
        assert_eq!(config.metrics_interval_secs(), 60);
        assert_eq!(config.config_file(), "default");
        assert_eq!(config.subscription_url(), None);
    }

    #[test]
    fn test_missing_credentials_fail() {
        let config = Config::default();
        let err = config.subscription_credentials().unwrap_err();
        assert!(err.to_string().contains(ENV_SUBSCRIPTION_URL));

        let config = Config::default().with_overrides(Some("https://x.supabase.co".into()), None);
        let err = config.subscription_credentials().unwrap_err();
        assert!(err.to_string().contains(ENV_SUBSCRIPTION_KEY));
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_overrides(Some("https://x.supabase.co".into()), Some("anon".into()));
        assert_eq!(config.subscription_credentials().unwrap(), ("https://x.supabase.co", "anon"));

        // Blank overrides keep the existing values
        let config = config.with_overrides(Some("  ".into()), Some(String::new()));
        assert_eq!(config.subscription_credentials().unwrap(), ("https://x.supabase.co", "anon"));
    }

    #[test]
    fn test_resolve_config_path_default() {
        if env::var("CONFIG_FILE").is_err() {
            assert_eq!(Config::resolve_config_path(None), "config/dev.toml");
        }
    }

    #[test]
    fn test_resolve_config_path_from_cli() {
        assert_eq!(Config::resolve_config_path(Some("config/prod.toml".to_string())), "config/prod.toml");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_config: TomlConfig = toml::from_str("[server]\nport = 9000\n").unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.port(), 9000);
        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.subscription_table(), "landing_subscribers");
    }
}
