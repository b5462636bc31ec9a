// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration
//!
//! Loaded from TOML. Lookup order: an explicit path, then `$CUMULUS_CONFIG`,
//! then `~/.cumulus/config.toml`, then built-in defaults (in-memory store).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cumulus_store::{MemoryStore, RemoteConfig, RemoteStore, SharedStore, TracedStore};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "CUMULUS_CONFIG";

/// Environment variable overriding the store authkey
pub const AUTHKEY_ENV: &str = "CUMULUS_AUTHKEY";

/// Which store backend to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Remote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    #[serde(flatten)]
    pub remote: RemoteConfig,
}

/// Settings shared by every primitive of a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Prefix of every generated handle
    pub key_prefix: String,
    /// Interval for operations that can only poll the store
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            key_prefix: "cumulus".to_string(),
            poll_interval: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub sync: SyncConfig,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Default location: `~/.cumulus/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".cumulus").join("config.toml"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Resolve configuration using the standard lookup order
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = explicit {
            Self::load(path)?
        } else if let Some(path) = std::env::var_os(CONFIG_ENV) {
            Self::load(Path::new(&path))?
        } else {
            match Self::default_path() {
                Ok(path) if path.exists() => Self::load(&path)?,
                _ => Self::default(),
            }
        };

        if let Ok(authkey) = std::env::var(AUTHKEY_ENV) {
            config.store.remote.authkey = Some(authkey);
        }
        Ok(config)
    }

    /// Open the configured store, wrapped for tracing
    pub async fn open_store(&self) -> Result<SharedStore, ConfigError> {
        let store: SharedStore = match self.store.backend {
            Backend::Memory => Arc::new(TracedStore::new(MemoryStore::new())),
            Backend::Remote => {
                let remote = RemoteStore::connect(self.store.remote.clone()).await?;
                tracing::info!(address = %self.store.remote.address, "connected to remote store");
                Arc::new(TracedStore::new(remote))
            }
        };
        Ok(store)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
