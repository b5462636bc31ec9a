// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executor contract a [`Process`](super::Process) launches work through

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

/// Exit code reported for work that was cancelled before it finished
pub const CANCELLED_EXITCODE: i32 = -15;

/// Opaque reference to one unit of work started by an executor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecHandle(pub String);

impl fmt::Display for ExecHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a unit of work is in its life
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    Pending,
    Running,
    Succeeded,
    Failed(String),
    Cancelled,
}

impl ExecStatus {
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            ExecStatus::Succeeded | ExecStatus::Failed(_) | ExecStatus::Cancelled
        )
    }

    /// `None` while the work is still pending or running
    pub fn exitcode(&self) -> Option<i32> {
        match self {
            ExecStatus::Pending | ExecStatus::Running => None,
            ExecStatus::Succeeded => Some(0),
            ExecStatus::Failed(_) => Some(1),
            ExecStatus::Cancelled => Some(CANCELLED_EXITCODE),
        }
    }
}

/// Starts units of work and reports on them
///
/// Implementations must be safe to share between tasks; a [`Context`]
/// holds one behind an `Arc`.
///
/// [`Context`]: crate::Context
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Start `target` with `args`
    async fn invoke(&self, target: &str, args: serde_json::Value) -> Result<ExecHandle, ProcessError>;

    /// Current status, without waiting
    async fn poll(&self, handle: &ExecHandle) -> Result<ExecStatus, ProcessError>;

    /// Wait until the work is done; `false` if `timeout` elapsed first
    async fn wait(&self, handle: &ExecHandle, timeout: Option<Duration>) -> Result<bool, ProcessError>;

    /// Request cancellation; `false` if the work had already finished
    ///
    /// Returns [`ProcessError::NotSupported`] if the executor cannot cancel.
    async fn cancel(&self, handle: &ExecHandle) -> Result<bool, ProcessError>;

    /// Drop what is kept about `handle`; the caller will not ask about it again
    ///
    /// Work still running is left to finish on its own.
    fn forget(&self, _handle: &ExecHandle) {}
}
