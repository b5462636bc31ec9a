// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition variables
//!
//! Each waiter queues a private wake-key on the condition's waiter list,
//! releases the lock and blocks popping its wake-key. Notifiers pop wake-keys
//! and push a signal onto each in one atomic step.

use std::future::Future;
use std::time::Duration;

use cumulus_store::{Script, ScriptReply, StoreError, StoreExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::lock::{Lock, LockDescriptor};
use crate::context::Context;
use crate::error::SyncError;
use crate::id::Handle;

const SIGNAL: &[u8] = b"1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDescriptor {
    pub handle: Handle,
    pub lock: LockDescriptor,
}

#[derive(Clone)]
pub struct Condition {
    ctx: Context,
    handle: Handle,
    waiters: String,
    lock: Lock,
}

impl Condition {
    /// A condition over `lock`, or over a fresh lock when `None`
    pub async fn new(ctx: &Context, lock: Option<Lock>) -> Result<Self, SyncError> {
        let lock = match lock {
            Some(lock) => lock,
            None => Lock::new(ctx).await?,
        };
        Ok(Self::with_lock(ctx, ctx.next_handle("condition"), lock))
    }

    pub fn attach(ctx: &Context, descriptor: ConditionDescriptor) -> Self {
        let lock = Lock::attach(ctx, descriptor.lock);
        Self::with_lock(ctx, descriptor.handle, lock)
    }

    fn with_lock(ctx: &Context, handle: Handle, lock: Lock) -> Self {
        Self {
            ctx: ctx.clone(),
            waiters: handle.key("waiters"),
            handle,
            lock,
        }
    }

    pub fn descriptor(&self) -> ConditionDescriptor {
        ConditionDescriptor {
            handle: self.handle.clone(),
            lock: self.lock.descriptor(),
        }
    }

    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    pub async fn acquire(&self) -> Result<(), SyncError> {
        self.lock.acquire().await
    }

    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        self.lock.acquire_timeout(timeout).await
    }

    pub async fn release(&self) -> Result<(), SyncError> {
        self.lock.release().await
    }

    fn check_owned(&self) -> Result<(), SyncError> {
        if self.lock.is_owned() {
            Ok(())
        } else {
            Err(SyncError::NotOwner)
        }
    }

    /// Release the lock, wait for a notification, then reacquire
    ///
    /// Returns `false` when `timeout` elapsed without a notification. The
    /// lock is held again on return, whatever the outcome.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<bool, SyncError> {
        self.check_owned()?;
        let store = self.ctx.store();
        let wake_key = self.ctx.next_handle("wake").to_string();

        store
            .rpush(&self.waiters, vec![wake_key.clone().into_bytes()])
            .await?;
        self.lock.release().await?;

        let notified = self.await_signal(&wake_key, timeout).await;
        let reacquired = self.lock.acquire().await;
        let notified = notified?;
        reacquired?;
        Ok(notified)
    }

    async fn await_signal(&self, wake_key: &str, timeout: Option<Duration>) -> Result<bool, SyncError> {
        let store = self.ctx.store();
        if store.blpop(&[wake_key.to_string()], timeout).await?.is_some() {
            return Ok(true);
        }

        let cancel = Script::CancelWait {
            list: self.waiters.clone(),
            wake_key: wake_key.to_string(),
        };
        match store.eval(cancel.clone()).await? {
            ScriptReply::Cancelled => Ok(false),
            ScriptReply::Signalled => {
                // Notified between the timeout and the cancel
                store.del(&[wake_key.to_string()]).await?;
                Ok(true)
            }
            other => {
                tracing::error!(script = cancel.name(), ?other, "unexpected script reply");
                Err(SyncError::Store(StoreError::unexpected(cancel.name())))
            }
        }
    }

    /// Wait until `predicate` holds, re-checking after every notification
    ///
    /// Returns the last value of the predicate, which is `false` only when
    /// `timeout` ran out first.
    pub async fn wait_for<F, Fut>(
        &self,
        mut predicate: F,
        timeout: Option<Duration>,
    ) -> Result<bool, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, SyncError>>,
    {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut result = predicate().await?;
        while !result {
            let remaining = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    Some(remaining)
                }
                None => None,
            };
            self.wait(remaining).await?;
            result = predicate().await?;
        }
        Ok(result)
    }

    pub async fn notify(&self) -> Result<u64, SyncError> {
        self.notify_n(1).await
    }

    /// Wake up to `n` waiters; returns how many were woken
    pub async fn notify_n(&self, n: u64) -> Result<u64, SyncError> {
        self.check_owned()?;
        let script = Script::Notify {
            list: self.waiters.clone(),
            count: n,
            signal: SIGNAL.to_vec(),
        };
        self.signal(script).await
    }

    /// Wake every waiter queued at this moment
    pub async fn notify_all(&self) -> Result<u64, SyncError> {
        self.check_owned()?;
        let script = Script::NotifyAll {
            list: self.waiters.clone(),
            signal: SIGNAL.to_vec(),
        };
        self.signal(script).await
    }

    async fn signal(&self, script: Script) -> Result<u64, SyncError> {
        match self.ctx.store().eval(script.clone()).await? {
            ScriptReply::Woken(n) => {
                tracing::debug!(handle = %self.handle, woken = n, "notified waiters");
                Ok(n)
            }
            other => {
                tracing::error!(script = script.name(), ?other, "unexpected script reply");
                Err(SyncError::Store(StoreError::unexpected(script.name())))
            }
        }
    }

    /// Number of waiters currently queued
    pub async fn waiting(&self) -> Result<u64, SyncError> {
        Ok(self.ctx.store().llen(&self.waiters).await?)
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
