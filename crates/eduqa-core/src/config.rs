//! Application configuration management.
//!
//! Configuration is stored at `~/.config/eduqa/config.json`. The API base
//! URL and the credential backend can be overridden from the environment
//! (`EDUQA_API_URL`, `EDUQA_STORAGE`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
use crate::auth::{FileStorage, KeyringStorage, LocalStorage, REVERIFY_INTERVAL};

/// Application name used for config/data/cache directory paths
const APP_NAME: &str = "eduqa";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "EDUQA_API_URL";
pub const ENV_STORAGE: &str = "EDUQA_STORAGE";

/// Where the access token and user snapshot are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Plain files under the data directory.
    #[default]
    File,
    /// The OS keychain.
    Keyring,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Some(StorageBackend::File),
            "keyring" | "keychain" => Some(StorageBackend::Keyring),
            _ => None,
        }
    }
}

fn default_reverify_secs() -> u64 {
    REVERIFY_INTERVAL.as_secs()
}

fn default_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default = "default_reverify_secs")]
    pub reverify_interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            storage: StorageBackend::default(),
            reverify_interval_secs: default_reverify_secs(),
            request_timeout_secs: default_timeout_secs(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_stored()?;
        config.apply_overrides(std::env::var(ENV_API_URL).ok(), std::env::var(ENV_STORAGE).ok());
        Ok(config)
    }

    /// The config file as written, without environment overrides. Edit and
    /// save this one so overrides never end up on disk.
    pub fn load_stored() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("Invalid config: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply values taken from the environment. Blank values are ignored.
    pub fn apply_overrides(&mut self, api_url: Option<String>, storage: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = Some(url.trim().to_string());
        }
        if let Some(raw) = storage.filter(|s| !s.trim().is_empty()) {
            match StorageBackend::parse(&raw) {
                Some(backend) => self.storage = backend,
                None => warn!(value = %raw, "Unknown {}; keeping {:?}", ENV_STORAGE, self.storage),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Configured API base URL, or the local development server.
    pub fn base_url(&self) -> String {
        match self.api_base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => {
                warn!("{} is not set; using {}", ENV_API_URL, DEFAULT_BASE_URL);
                DEFAULT_BASE_URL.to_string()
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn reverify_interval(&self) -> Duration {
        Duration::from_secs(self.reverify_interval_secs.max(1))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Cache directory, one subdirectory per API host.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(host_dir(&self.base_url())))
    }

    /// Backend for the persisted session.
    pub fn build_storage(&self) -> Result<Arc<dyn LocalStorage>> {
        Ok(match self.storage {
            StorageBackend::File => Arc::new(FileStorage::new(self.data_dir()?.join("session"))),
            StorageBackend::Keyring => Arc::new(KeyringStorage::new()),
        })
    }
}

/// Filename-safe directory name for an API base URL.
fn host_dir(base_url: &str) -> String {
    let host = reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| {
            url.host_str()
                .map(|host| match url.port() {
                    Some(port) => format!("{}_{}", host, port),
                    None => host.to_string(),
                })
        })
        .unwrap_or_else(|| "default".to_string());
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
