// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the end-to-end specs
//!
//! A [`Cluster`] runs one store server on an ephemeral port. Every call to
//! [`Cluster::worker`] opens an independent remote context, standing in for
//! a worker on another host.

pub use std::sync::Arc;
pub use std::time::Duration;

pub use cumulus_core::{Backend, Config, Context, StoreConfig, SyncConfig};
pub use cumulus_store::{
    MemoryStore, RemoteConfig, SharedStore, StoreExt, StoreServer,
};

use tokio::sync::oneshot;

pub struct Cluster {
    address: String,
    backing: MemoryStore,
    _stop: oneshot::Sender<()>,
}

impl Cluster {
    pub async fn start() -> Self {
        let backing = MemoryStore::new();
        let shared: SharedStore = Arc::new(backing.clone());
        let server = StoreServer::bind("127.0.0.1:0", shared).await.unwrap();
        let address = server.local_addr().unwrap().to_string();

        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(server.serve_until(async {
            let _ = stopped.await;
        }));

        Self {
            address,
            backing,
            _stop: stop,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            store: StoreConfig {
                backend: Backend::Remote,
                remote: RemoteConfig {
                    block_slice: Duration::from_millis(50),
                    request_timeout: Duration::from_secs(2),
                    ..RemoteConfig::new(&self.address)
                },
            },
            sync: SyncConfig {
                key_prefix: "spec".to_string(),
                poll_interval: Duration::from_millis(10),
            },
        }
    }

    /// A context with its own connections to the shared store
    pub async fn worker(&self) -> Context {
        Context::connect(&self.config()).await.unwrap()
    }

    /// Direct access to the server's store, bypassing the network
    pub fn backing(&self) -> &MemoryStore {
        &self.backing
    }
}

/// Poll `check` until it holds or a generous deadline passes
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 5s");
}
