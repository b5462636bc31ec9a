// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Units of work launched through an [`Executor`]
//!
//! A [`Process`] names a registered target and its JSON arguments. Starting
//! it hands both to the context's executor; the worker on the other side
//! rebuilds any primitives it needs from descriptors inside the arguments.

mod executor;
#[cfg(any(test, feature = "test-support"))]
mod fake;
mod local;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ProcessError;

pub use executor::{ExecHandle, ExecStatus, Executor, CANCELLED_EXITCODE};
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecutorCall, FakeExecutor};
pub use local::{FunctionRegistry, LocalExecutor, WorkerContext, WorkerResult};

/// Lifecycle of a [`Process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Initial,
    Started,
    Finished,
    Errored,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProcessState::Initial => "initial",
            ProcessState::Started => "started",
            ProcessState::Finished => "finished",
            ProcessState::Errored => "errored",
        };
        write!(f, "{}", s)
    }
}

/// Serializable summary of a [`Process`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub name: String,
    pub target: String,
    pub args: serde_json::Value,
    pub exec: Option<ExecHandle>,
    pub state: ProcessState,
}

#[derive(Default)]
struct RegistryState {
    counter: u64,
    children: BTreeMap<String, ExecHandle>,
}

/// Started children of one context, by name
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl ProcessRegistry {
    fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    fn next_name(&self) -> String {
        self.with_state(|s| {
            s.counter += 1;
            format!("Process-{}", s.counter)
        })
    }

    fn add(&self, name: &str, handle: ExecHandle) {
        self.with_state(|s| {
            s.children.insert(name.to_string(), handle);
        });
    }

    fn discard(&self, name: &str) {
        self.with_state(|s| {
            s.children.remove(name);
        });
    }

    fn contains(&self, name: &str) -> bool {
        self.with_state(|s| s.children.contains_key(name))
    }

    /// Names of tracked children, without asking the executor
    pub fn names(&self) -> Vec<String> {
        self.with_state(|s| s.children.keys().cloned().collect())
    }

    /// Poll every tracked child, forget finished ones, return the rest
    pub async fn active(&self, executor: &dyn Executor) -> Result<Vec<String>, ProcessError> {
        let snapshot: Vec<(String, ExecHandle)> = self.with_state(|s| {
            s.children
                .iter()
                .map(|(name, handle)| (name.clone(), handle.clone()))
                .collect()
        });
        let mut alive = Vec::new();
        for (name, handle) in snapshot {
            match executor.poll(&handle).await {
                Ok(status) if status.is_done() => self.discard(&name),
                Ok(_) => alive.push(name),
                // Collected by its process after the snapshot was taken
                Err(_) if !self.contains(&name) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(alive)
    }
}

/// A target function run by the context's executor
pub struct Process {
    ctx: Context,
    name: String,
    target: String,
    args: serde_json::Value,
    exec: Option<ExecHandle>,
    exitcode: Option<i32>,
}

impl Process {
    pub fn new(ctx: &Context, target: &str, args: serde_json::Value) -> Result<Self, ProcessError> {
        if target.is_empty() {
            return Err(ProcessError::UnknownTarget(String::new()));
        }
        Ok(Self {
            ctx: ctx.clone(),
            name: ctx.children().next_name(),
            target: target.to_string(),
            args,
            exec: None,
            exitcode: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn exec_handle(&self) -> Option<&ExecHandle> {
        self.exec.as_ref()
    }

    /// State as of the last poll
    pub fn state(&self) -> ProcessState {
        match (&self.exec, self.exitcode) {
            (None, _) => ProcessState::Initial,
            (Some(_), None) => ProcessState::Started,
            (Some(_), Some(0)) => ProcessState::Finished,
            (Some(_), Some(_)) => ProcessState::Errored,
        }
    }

    pub fn descriptor(&self) -> ProcessDescriptor {
        ProcessDescriptor {
            name: self.name.clone(),
            target: self.target.clone(),
            args: self.args.clone(),
            exec: self.exec.clone(),
            state: self.state(),
        }
    }

    fn executor(&self) -> Result<Arc<dyn Executor>, ProcessError> {
        self.ctx
            .executor()
            .cloned()
            .ok_or_else(|| ProcessError::Executor("context has no executor".to_string()))
    }

    fn started(&self) -> Result<&ExecHandle, ProcessError> {
        self.exec.as_ref().ok_or(ProcessError::NotStarted)
    }

    /// Hand the target to the executor; valid once
    pub async fn start(&mut self) -> Result<(), ProcessError> {
        if self.exec.is_some() {
            return Err(ProcessError::AlreadyStarted);
        }
        let executor = self.executor()?;
        let handle = executor.invoke(&self.target, self.args.clone()).await?;
        tracing::info!(process = %self.name, target = %self.target, %handle, "started process");
        self.ctx.children().add(&self.name, handle.clone());
        self.exec = Some(handle);
        Ok(())
    }

    /// Exit code if finished, `None` while running or before start
    pub async fn poll(&mut self) -> Result<Option<i32>, ProcessError> {
        if self.exitcode.is_some() {
            return Ok(self.exitcode);
        }
        let Some(handle) = self.exec.clone() else {
            return Ok(None);
        };
        let status = self.executor()?.poll(&handle).await?;
        if let Some(code) = status.exitcode() {
            if let ExecStatus::Failed(reason) = &status {
                tracing::warn!(process = %self.name, %reason, "process failed");
            }
            self.exitcode = Some(code);
            self.ctx.children().discard(&self.name);
            self.executor()?.forget(&handle);
        }
        Ok(self.exitcode)
    }

    /// Wait for the process to finish; `None` if `timeout` elapsed first
    pub async fn join(&mut self, timeout: Option<Duration>) -> Result<Option<i32>, ProcessError> {
        let handle = self.started()?.clone();
        if self.exitcode.is_some() {
            return Ok(self.exitcode);
        }
        if !self.executor()?.wait(&handle, timeout).await? {
            return Ok(None);
        }
        self.poll().await
    }

    pub async fn is_alive(&mut self) -> Result<bool, ProcessError> {
        if self.exec.is_none() {
            return Ok(false);
        }
        Ok(self.poll().await?.is_none())
    }

    pub async fn exitcode(&mut self) -> Result<Option<i32>, ProcessError> {
        self.poll().await
    }

    /// Ask the executor to cancel the work
    ///
    /// A process that already finished is left alone. Executors that cannot
    /// cancel report [`ProcessError::NotSupported`].
    pub async fn terminate(&mut self) -> Result<(), ProcessError> {
        let handle = self.started()?.clone();
        if self.exitcode.is_some() {
            return Ok(());
        }
        if self.executor()?.cancel(&handle).await? {
            tracing::info!(process = %self.name, "terminated process");
        }
        Ok(())
    }
}

/// Dropping a started process detaches it: the work runs on, untracked
impl Drop for Process {
    fn drop(&mut self) {
        if self.exitcode.is_some() {
            return;
        }
        let Some(handle) = &self.exec else {
            return;
        };
        self.ctx.children().discard(&self.name);
        if let Some(executor) = self.ctx.executor() {
            executor.forget(handle);
        }
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
