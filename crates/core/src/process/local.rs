// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process executor: registered functions run as Tokio tasks

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use super::executor::{ExecHandle, ExecStatus, Executor};
use crate::context::Context;
use crate::error::ProcessError;

/// What a worker function returns
pub type WorkerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type WorkerFuture = Pin<Box<dyn Future<Output = WorkerResult> + Send>>;
type WorkerFn = Arc<dyn Fn(WorkerContext) -> WorkerFuture + Send + Sync>;

/// Everything a worker function receives
///
/// The context talks to the same store as the caller, so the worker
/// rebuilds primitives from descriptors carried in `args`.
#[derive(Clone)]
pub struct WorkerContext {
    ctx: Context,
    args: serde_json::Value,
}

impl WorkerContext {
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn raw_args(&self) -> &serde_json::Value {
        &self.args
    }

    /// Decode the arguments into `T`
    pub fn args<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.args.clone())
    }
}

/// Callables by name
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: Arc<RwLock<HashMap<String, WorkerFn>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkerResult> + Send + 'static,
    {
        let boxed: WorkerFn = Arc::new(move |worker: WorkerContext| -> WorkerFuture { Box::pin(function(worker)) });
        self.functions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), boxed);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    fn get(&self, name: &str) -> Option<WorkerFn> {
        self.functions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

struct LocalTask {
    status: watch::Receiver<ExecStatus>,
    abort: AbortHandle,
    // Forgotten while running; removed by its supervisor on completion
    detached: bool,
}

type TaskTable = Arc<Mutex<HashMap<ExecHandle, LocalTask>>>;

/// Runs registered functions on the current Tokio runtime
///
/// Finished work stays queryable until [`Executor::forget`] is called for
/// its handle.
pub struct LocalExecutor {
    ctx: Context,
    functions: FunctionRegistry,
    tasks: TaskTable,
    counter: AtomicU64,
}

impl LocalExecutor {
    /// Workers get a clone of `ctx`
    pub fn new(ctx: &Context, functions: FunctionRegistry) -> Self {
        Self {
            ctx: ctx.clone(),
            functions,
            tasks: TaskTable::default(),
            counter: AtomicU64::new(1),
        }
    }

    /// Number of handles still tracked
    pub fn tracked(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn status_receiver(&self, handle: &ExecHandle) -> Result<watch::Receiver<ExecStatus>, ProcessError> {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(handle)
            .map(|task| task.status.clone())
            .ok_or_else(|| ProcessError::Executor(format!("unknown handle {}", handle)))
    }
}

fn outcome_status(outcome: Result<WorkerResult, tokio::task::JoinError>) -> ExecStatus {
    match outcome {
        Ok(Ok(())) => ExecStatus::Succeeded,
        Ok(Err(e)) => ExecStatus::Failed(e.to_string()),
        Err(e) if e.is_cancelled() => ExecStatus::Cancelled,
        Err(e) => ExecStatus::Failed(format!("worker panicked: {}", e)),
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn invoke(&self, target: &str, args: serde_json::Value) -> Result<ExecHandle, ProcessError> {
        let function = self
            .functions
            .get(target)
            .ok_or_else(|| ProcessError::UnknownTarget(target.to_string()))?;
        let handle = ExecHandle(format!(
            "local-{}",
            self.counter.fetch_add(1, Ordering::SeqCst)
        ));

        let worker = WorkerContext {
            ctx: self.ctx.clone(),
            args,
        };
        let (tx, rx) = watch::channel(ExecStatus::Running);
        let inner = tokio::spawn(function(worker));
        let abort = inner.abort_handle();

        let supervised = handle.clone();
        let target_name = target.to_string();
        let tasks = Arc::clone(&self.tasks);
        // Registered before the supervisor can look it up
        tasks.lock().unwrap_or_else(|e| e.into_inner()).insert(
            handle.clone(),
            LocalTask {
                status: rx,
                abort,
                detached: false,
            },
        );
        tokio::spawn(async move {
            let status = outcome_status(inner.await);
            match &status {
                ExecStatus::Failed(reason) => {
                    tracing::warn!(handle = %supervised, target = %target_name, %reason, "worker failed")
                }
                other => {
                    tracing::debug!(handle = %supervised, target = %target_name, status = ?other, "worker finished")
                }
            }
            tx.send_replace(status);
            let mut tasks = tasks.lock().unwrap_or_else(|e| e.into_inner());
            if tasks.get(&supervised).is_some_and(|task| task.detached) {
                tasks.remove(&supervised);
            }
        });

        tracing::debug!(%handle, target, "invoked worker");
        Ok(handle)
    }

    async fn poll(&self, handle: &ExecHandle) -> Result<ExecStatus, ProcessError> {
        let status = self.status_receiver(handle)?;
        let current = status.borrow().clone();
        Ok(current)
    }

    async fn wait(&self, handle: &ExecHandle, timeout: Option<Duration>) -> Result<bool, ProcessError> {
        let mut status = self.status_receiver(handle)?;
        let finished = async move {
            // A closed channel means the supervisor is gone; report what it left
            let signalled = status.wait_for(ExecStatus::is_done).await.is_ok();
            signalled || status.borrow().is_done()
        };
        match timeout {
            Some(limit) => Ok(tokio::time::timeout(limit, finished).await.unwrap_or(false)),
            None => Ok(finished.await),
        }
    }

    async fn cancel(&self, handle: &ExecHandle) -> Result<bool, ProcessError> {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let task = tasks
            .get(handle)
            .ok_or_else(|| ProcessError::Executor(format!("unknown handle {}", handle)))?;
        if task.status.borrow().is_done() {
            return Ok(false);
        }
        task.abort.abort();
        tracing::info!(%handle, "cancelled worker");
        Ok(true)
    }

    fn forget(&self, handle: &ExecHandle) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let Some(task) = tasks.get_mut(handle) else {
            return;
        };
        if task.status.borrow().is_done() {
            tasks.remove(handle);
        } else {
            task.detached = true;
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
