use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::client::{ClientConfig, DEFAULT_HOST};
use crate::token::resolve_token;

/// Environment variable overriding the API host.
pub const HOST_ENV: &str = "PHASE_HOST";

/// Environment variables checked, in order, for the provider token.
pub const TOKEN_ENVS: [&str; 3] = ["PHASE_TOKEN", "PHASE_SERVICE_TOKEN", "PHASE_PAT_TOKEN"];

/// Path appended to self-hosted hosts.
const SELF_HOSTED_SUFFIX: &str = "/service/public";

/// Provider block settings.
///
/// Unset fields fall back to the environment (see [`ProviderConfig::with_env_defaults`]).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Phase API host. Defaults to the Phase cloud.
    pub host: Option<String>,

    /// Service token or personal access token.
    pub phase_token: Option<SecretString>,

    /// Skip TLS certificate validation for the host.
    pub skip_tls_verification: bool,
}

impl ProviderConfig {
    /// Load provider settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load settings from a file, or return defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Fill unset fields from the process environment.
    pub fn with_env_defaults(self) -> Self {
        self.with_defaults_from(|name| std::env::var(name).ok())
    }

    /// Fill unset fields using `lookup` for environment values.
    pub fn with_defaults_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if self.host.as_deref().map_or(true, str::is_empty) {
            self.host = non_empty(HOST_ENV);
        }

        let token_unset = self
            .phase_token
            .as_ref()
            .map_or(true, |t| t.expose_secret().is_empty());
        if token_unset {
            self.phase_token = TOKEN_ENVS
                .iter()
                .find_map(|name| non_empty(*name))
                .map(SecretString::from);
        }

        self
    }

    /// The API base URL requests are issued against.
    ///
    /// Self-hosted instances serve the public API under `/service/public`.
    pub fn api_host(&self) -> String {
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST)
            .trim_end_matches('/');

        if host == DEFAULT_HOST {
            host.to_string()
        } else {
            format!("{host}{SELF_HOSTED_SUFFIX}")
        }
    }

    /// Build the immutable client settings for this provider instance.
    pub fn resolve(&self) -> Result<ClientConfig> {
        let raw_token = self
            .phase_token
            .as_ref()
            .map(|t| t.expose_secret())
            .filter(|t| !t.is_empty())
            .with_context(|| {
                format!(
                    "No Phase token configured: set phase_token or one of {}",
                    TOKEN_ENVS.join(", ")
                )
            })?;

        Ok(ClientConfig {
            host: self.api_host(),
            token: resolve_token(raw_token),
            skip_tls_verification: self.skip_tls_verification,
        })
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./phase.toml` if it exists in current directory
/// 2. `~/.config/phase/phase.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("phase.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("phase").join("phase.toml");
    }

    local_config
}
