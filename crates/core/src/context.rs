// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The explicit context every primitive is created from
//!
//! A `Context` bundles the store connection, sync settings, handle generator,
//! child-process registry and (optionally) an executor. It is cheap to clone.

use std::sync::Arc;
use std::time::Duration;

use cumulus_store::{MemoryStore, SharedStore};
use serde::Serialize;

use crate::config::{Config, SyncConfig};
use crate::error::{ConfigError, ProcessError, SyncError};
use crate::id::{Handle, HandleGen, UuidHandles};
use crate::managers::Manager;
use crate::process::{Executor, Process, ProcessRegistry};
use crate::queue::{JoinableQueue, Queue, SimpleQueue};
use crate::sync::{Barrier, BoundedSemaphore, Condition, Event, Lock, RLock, Semaphore};
use crate::transport::{self, Connection};

#[derive(Clone)]
pub struct Context {
    store: SharedStore,
    settings: SyncConfig,
    handles: Arc<dyn HandleGen>,
    children: ProcessRegistry,
    executor: Option<Arc<dyn Executor>>,
}

impl Context {
    pub fn new(store: SharedStore) -> Self {
        let settings = SyncConfig::default();
        Self {
            store,
            handles: Arc::new(UuidHandles::new(settings.key_prefix.clone())),
            settings,
            children: ProcessRegistry::default(),
            executor: None,
        }
    }

    /// Context over a fresh in-process store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Open the store named by `config` and build a context around it
    pub async fn connect(config: &Config) -> Result<Self, ConfigError> {
        let store = config.open_store().await?;
        Ok(Self::new(store).with_settings(config.sync.clone()))
    }

    /// Replace the sync settings; handles use the new prefix
    pub fn with_settings(mut self, settings: SyncConfig) -> Self {
        self.handles = Arc::new(UuidHandles::new(settings.key_prefix.clone()));
        self.settings = settings;
        self
    }

    pub fn with_handles(mut self, handles: Arc<dyn HandleGen>) -> Self {
        self.handles = handles;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn settings(&self) -> &SyncConfig {
        &self.settings
    }

    pub fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }

    pub fn executor(&self) -> Option<&Arc<dyn Executor>> {
        self.executor.as_ref()
    }

    pub fn children(&self) -> &ProcessRegistry {
        &self.children
    }

    pub fn next_handle(&self, kind: &str) -> Handle {
        self.handles.next(kind)
    }

    /// A connected pair; `(reader, writer)` when simplex
    pub fn pipe(&self, duplex: bool) -> (Connection, Connection) {
        transport::pipe(self, duplex)
    }

    pub async fn lock(&self) -> Result<Lock, SyncError> {
        Lock::new(self).await
    }

    pub async fn rlock(&self) -> Result<RLock, SyncError> {
        RLock::new(self).await
    }

    pub async fn semaphore(&self, value: i64) -> Result<Semaphore, SyncError> {
        Semaphore::new(self, value).await
    }

    pub async fn bounded_semaphore(&self, value: i64) -> Result<BoundedSemaphore, SyncError> {
        BoundedSemaphore::new(self, value).await
    }

    /// A condition over `lock`, or over a fresh lock when `None`
    pub async fn condition(&self, lock: Option<Lock>) -> Result<Condition, SyncError> {
        Condition::new(self, lock).await
    }

    pub async fn event(&self) -> Result<Event, SyncError> {
        Event::new(self).await
    }

    pub async fn barrier(
        &self,
        parties: u64,
        timeout: Option<Duration>,
    ) -> Result<Barrier, SyncError> {
        Barrier::new(self, parties, timeout).await
    }

    pub fn queue<T>(&self) -> Queue<T> {
        Queue::new(self)
    }

    pub fn joinable_queue<T>(&self) -> JoinableQueue<T> {
        JoinableQueue::new(self)
    }

    pub fn simple_queue<T>(&self) -> SimpleQueue<T> {
        SimpleQueue::new(self)
    }

    pub fn manager(&self) -> Manager {
        Manager::new(self)
    }

    /// A process that will run the registered `target` with `args`
    pub fn process<A: Serialize>(&self, target: &str, args: &A) -> Result<Process, ProcessError> {
        Process::new(self, target, serde_json::to_value(args)?)
    }

    /// Names of started children that have not yet finished
    pub async fn active_children(&self) -> Result<Vec<String>, ProcessError> {
        match &self.executor {
            Some(executor) => self.children.active(executor.as_ref()).await,
            None => Ok(Vec::new()),
        }
    }
}
