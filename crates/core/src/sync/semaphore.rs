// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counting semaphores
//!
//! State lives in two keys: a counter and a waiter list of private wake-keys.
//! `counter < 0` exactly when `-counter` waiters are queued. A release that
//! finds a waiter pops it and signals its wake-key in the same atomic step,
//! handing the slot over directly.

use std::time::Duration;

use cumulus_store::{Script, ScriptReply, StoreError, StoreExt};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::SyncError;
use crate::id::Handle;

/// Largest value a semaphore may hold
pub const SEM_VALUE_MAX: i64 = 1 << 30;

const SIGNAL: &[u8] = b"1";

/// Serializable form of a semaphore, bounded semaphore or lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreDescriptor {
    pub handle: Handle,
    pub max: i64,
}

/// Shared machinery behind every semaphore-like primitive
#[derive(Clone)]
pub(crate) struct SemLock {
    ctx: Context,
    handle: Handle,
    counter: String,
    waiters: String,
    max: i64,
}

fn unexpected(script: &Script, reply: ScriptReply) -> SyncError {
    tracing::error!(script = script.name(), ?reply, "unexpected script reply");
    SyncError::Store(StoreError::unexpected(script.name()))
}

impl SemLock {
    pub(crate) async fn create(
        ctx: &Context,
        kind: &str,
        value: i64,
        max: i64,
    ) -> Result<Self, SyncError> {
        if value < 0 {
            return Err(SyncError::InvalidValue(format!(
                "semaphore initial value must be >= 0, got {}",
                value
            )));
        }
        if value > max || max > SEM_VALUE_MAX {
            return Err(SyncError::InvalidValue(format!(
                "semaphore value {} exceeds maximum {}",
                value, max
            )));
        }

        let sem = Self::attach(
            ctx,
            SemaphoreDescriptor {
                handle: ctx.next_handle(kind),
                max,
            },
        );
        ctx.store().incr_by(&sem.counter, value).await?;
        tracing::debug!(handle = %sem.handle, value, max, "created semaphore");
        Ok(sem)
    }

    pub(crate) fn attach(ctx: &Context, descriptor: SemaphoreDescriptor) -> Self {
        let handle = descriptor.handle;
        Self {
            ctx: ctx.clone(),
            counter: handle.key("value"),
            waiters: handle.key("waiters"),
            handle,
            max: descriptor.max,
        }
    }

    pub(crate) fn descriptor(&self) -> SemaphoreDescriptor {
        SemaphoreDescriptor {
            handle: self.handle.clone(),
            max: self.max,
        }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Acquire a slot, waiting up to `timeout` (forever when `None`).
    /// Returns whether the slot was obtained.
    pub(crate) async fn acquire_within(&self, timeout: Option<Duration>) -> Result<bool, SyncError> {
        let store = self.ctx.store();
        let wake_key = self.ctx.next_handle("wake").to_string();

        let acquire = Script::SemaphoreAcquire {
            counter: self.counter.clone(),
            waiters: self.waiters.clone(),
            wake_key: wake_key.clone(),
        };
        match store.eval(acquire.clone()).await? {
            ScriptReply::Acquired => return Ok(true),
            ScriptReply::Queued => {}
            other => return Err(unexpected(&acquire, other)),
        }

        tracing::trace!(handle = %self.handle, %wake_key, "queued for semaphore");
        if store.blpop(&[wake_key.clone()], timeout).await?.is_some() {
            return Ok(true);
        }

        let cancel = Script::SemaphoreCancel {
            counter: self.counter.clone(),
            waiters: self.waiters.clone(),
            wake_key: wake_key.clone(),
        };
        match store.eval(cancel.clone()).await? {
            ScriptReply::Cancelled => Ok(false),
            ScriptReply::Signalled => {
                // A release handed us the slot between the timeout and the cancel
                store.del(&[wake_key]).await?;
                Ok(true)
            }
            other => Err(unexpected(&cancel, other)),
        }
    }

    pub(crate) async fn acquire(&self) -> Result<(), SyncError> {
        self.acquire_within(None).await.map(|_| ())
    }

    pub(crate) async fn acquire_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        if self.acquire_within(Some(timeout)).await? {
            Ok(())
        } else {
            Err(SyncError::Timeout)
        }
    }

    pub(crate) async fn try_acquire(&self) -> Result<(), SyncError> {
        let script = Script::SemaphoreTryAcquire {
            counter: self.counter.clone(),
        };
        match self.ctx.store().eval(script.clone()).await? {
            ScriptReply::Acquired => Ok(()),
            ScriptReply::Unavailable => Err(SyncError::WouldBlock),
            other => Err(unexpected(&script, other)),
        }
    }

    pub(crate) async fn release(&self) -> Result<(), SyncError> {
        let script = Script::SemaphoreRelease {
            counter: self.counter.clone(),
            waiters: self.waiters.clone(),
            max: self.max,
            signal: SIGNAL.to_vec(),
        };
        match self.ctx.store().eval(script.clone()).await? {
            ScriptReply::Released => Ok(()),
            ScriptReply::HandedOff => {
                tracing::trace!(handle = %self.handle, "released to queued waiter");
                Ok(())
            }
            ScriptReply::AtBound => Err(SyncError::Overreleased),
            other => Err(unexpected(&script, other)),
        }
    }

    /// Free slots right now; 0 while waiters are queued
    pub(crate) async fn value(&self) -> Result<i64, SyncError> {
        let raw = self.ctx.store().get_int(&self.counter).await?;
        Ok(raw.unwrap_or(0).max(0))
    }
}

/// Counting semaphore with an upper bound of [`SEM_VALUE_MAX`]
#[derive(Clone)]
pub struct Semaphore {
    inner: SemLock,
}

impl Semaphore {
    pub async fn new(ctx: &Context, value: i64) -> Result<Self, SyncError> {
        let inner = SemLock::create(ctx, "semaphore", value, SEM_VALUE_MAX).await?;
        Ok(Self { inner })
    }

    pub fn attach(ctx: &Context, descriptor: SemaphoreDescriptor) -> Self {
        Self {
            inner: SemLock::attach(ctx, descriptor),
        }
    }

    pub fn descriptor(&self) -> SemaphoreDescriptor {
        self.inner.descriptor()
    }

    pub fn handle(&self) -> &Handle {
        self.inner.handle()
    }

    pub async fn acquire(&self) -> Result<(), SyncError> {
        self.inner.acquire().await
    }

    /// Acquire or fail with [`SyncError::Timeout`]
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        self.inner.acquire_timeout(timeout).await
    }

    /// Acquire without waiting or fail with [`SyncError::WouldBlock`]
    pub async fn try_acquire(&self) -> Result<(), SyncError> {
        self.inner.try_acquire().await
    }

    pub async fn release(&self) -> Result<(), SyncError> {
        self.inner.release().await
    }

    pub async fn value(&self) -> Result<i64, SyncError> {
        self.inner.value().await
    }
}

/// Semaphore whose value may never exceed its initial value
#[derive(Clone)]
pub struct BoundedSemaphore {
    inner: SemLock,
}

impl BoundedSemaphore {
    pub async fn new(ctx: &Context, value: i64) -> Result<Self, SyncError> {
        let inner = SemLock::create(ctx, "bsemaphore", value, value).await?;
        Ok(Self { inner })
    }

    pub fn attach(ctx: &Context, descriptor: SemaphoreDescriptor) -> Self {
        Self {
            inner: SemLock::attach(ctx, descriptor),
        }
    }

    pub fn descriptor(&self) -> SemaphoreDescriptor {
        self.inner.descriptor()
    }

    pub fn handle(&self) -> &Handle {
        self.inner.handle()
    }

    pub async fn acquire(&self) -> Result<(), SyncError> {
        self.inner.acquire().await
    }

    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        self.inner.acquire_timeout(timeout).await
    }

    pub async fn try_acquire(&self) -> Result<(), SyncError> {
        self.inner.try_acquire().await
    }

    /// Fails with [`SyncError::Overreleased`] when already at the bound
    pub async fn release(&self) -> Result<(), SyncError> {
        self.inner.release().await
    }

    pub async fn value(&self) -> Result<i64, SyncError> {
        self.inner.value().await
    }
}

#[cfg(test)]
#[path = "semaphore_tests.rs"]
mod tests;
