// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cumulus_core::{Config, ConfigError};
use cumulus_store::{MemoryStore, SharedStore, StoreError, StoreServer, TracedStore};
use thiserror::Error;
use tracing::info;

/// Default listen address, matching the remote store's default
pub const DEFAULT_BIND: &str = "127.0.0.1:7477";

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Address the store server listens on
    pub bind: String,
    /// Log file; stderr when unset
    pub log_path: Option<PathBuf>,
    /// Shared key every client must prove; `None` accepts anyone
    pub authkey: Option<String>,
    /// Bound on each handshake read or write
    pub io_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            log_path: None,
            authkey: None,
            io_timeout: Duration::from_secs(5),
        }
    }
}

impl DaemonConfig {
    /// Take the listen address and authkey from a client configuration file
    ///
    /// The file's remote store section describes where clients connect, so
    /// the daemon serves exactly that address.
    pub fn from_client_config(path: Option<&Path>) -> Result<Self, LifecycleError> {
        let config = Config::discover(path)?;
        let remote = config.store.remote;
        Ok(Self {
            bind: remote.address,
            authkey: remote.authkey,
            io_timeout: remote.request_timeout,
            ..Self::default()
        })
    }
}

/// Errors from daemon startup and serving
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: StoreError,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bound, not yet serving, daemon
pub struct Daemon {
    server: StoreServer,
    address: SocketAddr,
    store: SharedStore,
}

/// Bind the store server on a fresh in-memory store
pub async fn startup(config: &DaemonConfig) -> Result<Daemon, LifecycleError> {
    let store: SharedStore = Arc::new(TracedStore::new(MemoryStore::new()));
    let server = StoreServer::bind(&config.bind, Arc::clone(&store))
        .await
        .map_err(|source| LifecycleError::Bind {
            address: config.bind.clone(),
            source,
        })?
        .with_io_timeout(config.io_timeout);
    let server = match &config.authkey {
        Some(key) => server.with_authkey(key.as_bytes().to_vec()),
        None => server,
    };
    let address = server.local_addr()?;

    info!(
        %address,
        authenticated = config.authkey.is_some(),
        "daemon bound"
    );
    Ok(Daemon {
        server,
        address,
        store,
    })
}

impl Daemon {
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// The store every client shares
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Serve clients until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()>,
    {
        self.server.serve_until(shutdown).await?;
        info!(address = %self.address, "daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
