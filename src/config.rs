//! Application configuration.
//!
//! Values come from `{config_dir}/smart-notes/config.json` when it exists and
//! are then overridden by `SMART_NOTES_*` environment variables. Secrets
//! (API keys) are expected to come from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ai::DEFAULT_ENDPOINT;
use crate::auth::DEFAULT_IDENTITY_ENDPOINT;

const APP_NAME: &str = "smart-notes";
const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of a remote document store service. Unset means the local
    /// SQLite database.
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Path of the local database. Unset means the platform data directory.
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub google_client_id: Option<String>,
    pub identity_api_key: Option<String>,
    pub identity_endpoint: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            google_client_id: None,
            identity_api_key: None,
            identity_endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bearer key required by `snotes serve`.
    pub api_key: Option<String>,
    pub cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub ai: AiConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match config_dir() {
            Ok(dir) => Self::from_file(&dir.join(CONFIG_FILE))?,
            Err(e) => {
                tracing::warn!("{}, using default configuration", e);
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Override fields from `SMART_NOTES_*` variables looked up via `var`.
    /// Empty values are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SMART_NOTES_STORE_URL") {
            self.store.url = Some(v);
        }
        if let Some(v) = var("SMART_NOTES_STORE_API_KEY") {
            self.store.api_key = Some(v);
        }
        if let Some(v) = var("SMART_NOTES_DATABASE") {
            self.store.database_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("SMART_NOTES_AI_ENDPOINT") {
            self.ai.endpoint = v;
        }
        if let Some(v) = var("SMART_NOTES_AI_API_KEY") {
            self.ai.api_key = Some(v);
        }
        if let Some(v) = var("SMART_NOTES_GOOGLE_CLIENT_ID") {
            self.auth.google_client_id = Some(v);
        }
        if let Some(v) = var("SMART_NOTES_IDENTITY_API_KEY") {
            self.auth.identity_api_key = Some(v);
        }
        if let Some(v) = var("SMART_NOTES_IDENTITY_ENDPOINT") {
            self.auth.identity_endpoint = v;
        }
        if let Some(v) = var("SMART_NOTES_SERVER_API_KEY") {
            self.server.api_key = Some(v);
        }
        if let Some(v) = var("SMART_NOTES_CORS_ORIGINS") {
            self.server.cors_origins = Some(v.split(',').map(|s| s.trim().to_string()).collect());
        }
    }
}

/// `{config_dir}/smart-notes`.
pub fn config_dir() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    Ok(path)
}

/// Where the signed-in session is persisted.
pub fn session_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(SESSION_FILE))
}
