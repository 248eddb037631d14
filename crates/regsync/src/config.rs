//! Runtime configuration.
//!
//! Loaded once at process start from a JSON file and passed by reference
//! (or `Arc`) into every component. There is no reload.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "REGSYNC_CONFIG";

/// Fallback configuration path when [`CONFIG_ENV_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "regsync.json";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub platform: PlatformConfig,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// The learning platform this service runs next to.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Public base URL of the platform, scheme included (no trailing slash).
    pub base_url: String,
    /// Identity-provider tag under which users link their registry account.
    #[serde(default = "default_identity_provider")]
    pub identity_provider: String,
}

/// The external course registry.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Registry API base URL, scheme included (no trailing slash).
    pub base_url: String,
    /// Partner UUID sent in the `X-CN-UUID` header of every request.
    pub partner_uuid: String,
    /// This platform's partner identifier in the registry.
    pub partner_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Capacity of the background job queue; submissions beyond it are
    /// dropped (and logged).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long a resolved course identity stays cached, in seconds.
    #[serde(default = "default_resolve_cache_ttl")]
    pub resolve_cache_ttl_secs: u64,
}

fn default_identity_provider() -> String {
    "scos".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8075".to_string()
}

fn default_queue_capacity() -> usize {
    256
}

fn default_resolve_cache_ttl() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            resolve_cache_ttl_secs: default_resolve_cache_ttl(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.platform.base_url = config.platform.base_url.trim_end_matches('/').to_string();
        config.registry.base_url = config.registry.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Loads configuration from the path named by [`CONFIG_ENV_VAR`],
    /// falling back to [`DEFAULT_CONFIG_PATH`].
    pub fn from_env() -> anyhow::Result<Self> {
        let path =
            std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }
}
