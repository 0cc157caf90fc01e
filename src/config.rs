//! Configuration Management
//!
//! Handles persistent configuration storage for cfyvault. Values come from
//! three places, highest precedence first: command-line flags, environment
//! variables, then the config file.

use crate::api::HttpOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the tenant URL
pub const ENV_URL: &str = "CFYVAULT_URL";
/// Environment variable overriding the bearer token
pub const ENV_TOKEN: &str = "CFYVAULT_TOKEN";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Tenant URL, e.g. `https://abc1234.my.centrify.net`
    #[serde(default)]
    pub tenant_url: Option<String>,
    /// OAuth bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// Accept invalid TLS certificates (lab tenants only)
    #[serde(default)]
    pub skip_cert_verify: bool,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// First value that is set, in precedence order
fn first_set(values: [Option<String>; 3]) -> Option<String> {
    values.into_iter().flatten().find(|v| !v.is_empty())
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cfyvault").join("config.json"))
    }

    /// Load configuration from disk; a missing file yields the defaults
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get effective tenant URL (CLI > env > config)
    pub fn effective_tenant_url(&self, cli: Option<&str>) -> Result<String> {
        first_set([
            cli.map(str::to_string),
            std::env::var(ENV_URL).ok(),
            self.tenant_url.clone(),
        ])
        .with_context(|| {
            format!(
                "No tenant URL: pass --url, set {} or add tenant_url to the config file",
                ENV_URL
            )
        })
    }

    /// Get effective token (CLI > env > config)
    pub fn effective_token(&self, cli: Option<&str>) -> Option<String> {
        first_set([
            cli.map(str::to_string),
            std::env::var(ENV_TOKEN).ok(),
            self.token.clone(),
        ])
    }

    /// HTTP options for a client
    pub fn http_options(&self, token: Option<String>, skip_cert_verify: bool) -> HttpOptions {
        let mut options = HttpOptions {
            token,
            skip_cert_verify: skip_cert_verify || self.skip_cert_verify,
            ..HttpOptions::default()
        };
        if let Some(secs) = self.timeout_secs {
            options.timeout = Duration::from_secs(secs);
        }
        options
    }

    /// Set tenant URL and save
    pub fn set_tenant_url(&mut self, url: &str) -> Result<()> {
        self.tenant_url = Some(url.to_string());
        self.save()
    }
}
