// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use async_trait::async_trait;
use tracing::Instrument;

use crate::command::{Command, Reply};
use crate::error::StoreError;
use crate::store::Store;

/// Wrapper that adds a span and timing to every command
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: Store> Store for TracedStore<S> {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        let name = command.name();
        let blocking = command.is_blocking();
        let span = tracing::debug_span!("store.execute", command = name);

        async move {
            tracing::trace!(?command, "executing");

            let start = std::time::Instant::now();
            let result = self.inner.execute(command).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(_) => tracing::debug!(elapsed_ms, blocking, "done"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "command failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
