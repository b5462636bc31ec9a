// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake executor for testing

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::executor::{ExecHandle, ExecStatus, Executor};
use crate::error::ProcessError;

/// Recorded call to an executor method
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorCall {
    Invoke {
        target: String,
        args: serde_json::Value,
    },
    Poll(ExecHandle),
    Wait(ExecHandle),
    Cancel(ExecHandle),
    Forget(ExecHandle),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<ExecutorCall>,
    statuses: HashMap<ExecHandle, ExecStatus>,
    next_id: u64,
    // Configurable failure modes
    cancel_unsupported: bool,
    invoke_fails: bool,
}

/// Executor whose work only finishes when a test says so
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<FakeState>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.with_state(|s| s.calls.clone())
    }

    /// Handle of the most recent successful invoke
    pub fn last_handle(&self) -> Option<ExecHandle> {
        self.with_state(|s| (s.next_id > 0).then(|| ExecHandle(format!("fake-{}", s.next_id))))
    }

    pub fn set_status(&self, handle: &ExecHandle, status: ExecStatus) {
        self.with_state(|s| {
            s.statuses.insert(handle.clone(), status);
        });
    }

    pub fn succeed(&self, handle: &ExecHandle) {
        self.set_status(handle, ExecStatus::Succeeded);
    }

    pub fn fail(&self, handle: &ExecHandle, reason: impl Into<String>) {
        self.set_status(handle, ExecStatus::Failed(reason.into()));
    }

    /// Make `cancel` answer `NotSupported`
    pub fn set_cancel_unsupported(&self, unsupported: bool) {
        self.with_state(|s| s.cancel_unsupported = unsupported);
    }

    pub fn set_invoke_fails(&self, fails: bool) {
        self.with_state(|s| s.invoke_fails = fails);
    }

    fn status(&self, handle: &ExecHandle) -> Result<ExecStatus, ProcessError> {
        self.with_state(|s| s.statuses.get(handle).cloned())
            .ok_or_else(|| ProcessError::Executor(format!("unknown handle {}", handle)))
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn invoke(&self, target: &str, args: serde_json::Value) -> Result<ExecHandle, ProcessError> {
        self.with_state(|s| {
            s.calls.push(ExecutorCall::Invoke {
                target: target.to_string(),
                args,
            });
            if s.invoke_fails {
                return Err(ProcessError::Executor("invoke failed".to_string()));
            }
            s.next_id += 1;
            let handle = ExecHandle(format!("fake-{}", s.next_id));
            s.statuses.insert(handle.clone(), ExecStatus::Pending);
            Ok(handle)
        })
    }

    async fn poll(&self, handle: &ExecHandle) -> Result<ExecStatus, ProcessError> {
        self.with_state(|s| s.calls.push(ExecutorCall::Poll(handle.clone())));
        self.status(handle)
    }

    async fn wait(&self, handle: &ExecHandle, timeout: Option<Duration>) -> Result<bool, ProcessError> {
        self.with_state(|s| s.calls.push(ExecutorCall::Wait(handle.clone())));
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            if self.status(handle)?.is_done() {
                return Ok(true);
            }
            if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn cancel(&self, handle: &ExecHandle) -> Result<bool, ProcessError> {
        self.with_state(|s| {
            s.calls.push(ExecutorCall::Cancel(handle.clone()));
            if s.cancel_unsupported {
                return Err(ProcessError::NotSupported("cancel".to_string()));
            }
            match s.statuses.get_mut(handle) {
                Some(status) if status.is_done() => Ok(false),
                Some(status) => {
                    *status = ExecStatus::Cancelled;
                    Ok(true)
                }
                None => Err(ProcessError::Executor(format!("unknown handle {}", handle))),
            }
        })
    }

    fn forget(&self, handle: &ExecHandle) {
        self.with_state(|s| s.calls.push(ExecutorCall::Forget(handle.clone())));
    }
}
