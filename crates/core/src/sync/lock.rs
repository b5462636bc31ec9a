// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-recursive and recursive locks

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task;

use super::semaphore::{SemLock, SemaphoreDescriptor};
use crate::context::Context;
use crate::error::SyncError;
use crate::id::Handle;

/// Serializable form of a [`Lock`] or [`RLock`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDescriptor {
    pub handle: Handle,
}

/// Task that acquired a lock; `None` for code not running in a spawned task
type Holder = Option<task::Id>;

fn current_holder() -> Holder {
    task::try_id()
}

/// A binary semaphore with an advisory owner
///
/// Clones share the owner record, which names the task that acquired the
/// lock; only that task sees [`Lock::is_owned`]. An attached instance starts
/// unowned.
#[derive(Clone)]
pub struct Lock {
    sem: SemLock,
    owner: Arc<Mutex<Option<Holder>>>,
}

impl Lock {
    pub async fn new(ctx: &Context) -> Result<Self, SyncError> {
        let sem = SemLock::create(ctx, "lock", 1, 1).await?;
        Ok(Self {
            sem,
            owner: Arc::default(),
        })
    }

    pub fn attach(ctx: &Context, descriptor: LockDescriptor) -> Self {
        let sem = SemLock::attach(
            ctx,
            SemaphoreDescriptor {
                handle: descriptor.handle,
                max: 1,
            },
        );
        Self {
            sem,
            owner: Arc::default(),
        }
    }

    pub fn descriptor(&self) -> LockDescriptor {
        LockDescriptor {
            handle: self.sem.handle().clone(),
        }
    }

    pub fn handle(&self) -> &Handle {
        self.sem.handle()
    }

    fn set_owner(&self, owner: Option<Holder>) -> Option<Holder> {
        let mut slot = self.owner.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *slot, owner)
    }

    pub async fn acquire(&self) -> Result<(), SyncError> {
        self.sem.acquire().await?;
        self.set_owner(Some(current_holder()));
        tracing::debug!(handle = %self.handle(), "lock acquired");
        Ok(())
    }

    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        self.sem.acquire_timeout(timeout).await?;
        self.set_owner(Some(current_holder()));
        tracing::debug!(handle = %self.handle(), "lock acquired");
        Ok(())
    }

    pub async fn try_acquire(&self) -> Result<(), SyncError> {
        self.sem.try_acquire().await?;
        self.set_owner(Some(current_holder()));
        Ok(())
    }

    /// Release the lock; an unlocked lock fails with [`SyncError::Overreleased`]
    ///
    /// The owner is cleared before the store hands the slot on, so a clone
    /// woken by this release records itself without being overwritten.
    pub async fn release(&self) -> Result<(), SyncError> {
        let previous = self.set_owner(None);
        if let Err(e) = self.sem.release().await {
            self.set_owner(previous);
            return Err(e);
        }
        tracing::debug!(handle = %self.handle(), "lock released");
        Ok(())
    }

    /// Whether any holder currently has the lock
    pub async fn locked(&self) -> Result<bool, SyncError> {
        Ok(self.sem.value().await? == 0)
    }

    /// Whether the calling task acquired the lock through this instance or a clone
    pub fn is_owned(&self) -> bool {
        let owner = self.owner.lock().unwrap_or_else(|e| e.into_inner());
        *owner == Some(current_holder())
    }
}

/// A lock that its holder may acquire again without blocking
///
/// Re-entrance is tracked per attached instance and holding task: clones
/// share the recursion depth, while other tasks and instances attached from
/// the same descriptor are excluded like plain locks.
#[derive(Clone)]
pub struct RLock {
    lock: Lock,
    depth: Arc<AtomicU64>,
}

impl RLock {
    pub async fn new(ctx: &Context) -> Result<Self, SyncError> {
        Ok(Self {
            lock: Lock::new(ctx).await?,
            depth: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn attach(ctx: &Context, descriptor: LockDescriptor) -> Self {
        Self {
            lock: Lock::attach(ctx, descriptor),
            depth: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn descriptor(&self) -> LockDescriptor {
        self.lock.descriptor()
    }

    pub async fn acquire(&self) -> Result<(), SyncError> {
        if self.lock.is_owned() {
            self.depth.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
        self.lock.acquire().await?;
        self.depth.store(1, Ordering::SeqCst);
        Ok(())
    }

    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        if self.lock.is_owned() {
            self.depth.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
        self.lock.acquire_timeout(timeout).await?;
        self.depth.store(1, Ordering::SeqCst);
        Ok(())
    }

    pub async fn try_acquire(&self) -> Result<(), SyncError> {
        if self.lock.is_owned() {
            self.depth.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
        self.lock.try_acquire().await?;
        self.depth.store(1, Ordering::SeqCst);
        Ok(())
    }

    /// Undo one acquire; the store lock is released when the depth reaches zero
    pub async fn release(&self) -> Result<(), SyncError> {
        if !self.lock.is_owned() {
            return Err(SyncError::NotOwner);
        }
        let depth = self.depth.fetch_sub(1, Ordering::SeqCst);
        if depth == 1 {
            if let Err(e) = self.lock.release().await {
                self.depth.store(1, Ordering::SeqCst);
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn locked(&self) -> Result<bool, SyncError> {
        self.lock.locked().await
    }

    /// Current recursion depth of this instance
    pub fn depth(&self) -> u64 {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_owned(&self) -> bool {
        self.lock.is_owned()
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
