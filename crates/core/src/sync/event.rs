// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use cumulus_store::StoreExt;
use serde::{Deserialize, Serialize};

use super::condition::{Condition, ConditionDescriptor};
use crate::context::Context;
use crate::error::SyncError;
use crate::id::Handle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub handle: Handle,
    pub condition: ConditionDescriptor,
}

/// A flag that tasks can wait on until another sets it
#[derive(Clone)]
pub struct Event {
    ctx: Context,
    handle: Handle,
    flag: String,
    cond: Condition,
}

impl Event {
    pub async fn new(ctx: &Context) -> Result<Self, SyncError> {
        let cond = Condition::new(ctx, None).await?;
        let handle = ctx.next_handle("event");
        Ok(Self {
            ctx: ctx.clone(),
            flag: handle.key("flag"),
            handle,
            cond,
        })
    }

    pub fn attach(ctx: &Context, descriptor: EventDescriptor) -> Self {
        let handle = descriptor.handle;
        Self {
            ctx: ctx.clone(),
            flag: handle.key("flag"),
            handle,
            cond: Condition::attach(ctx, descriptor.condition),
        }
    }

    pub fn descriptor(&self) -> EventDescriptor {
        EventDescriptor {
            handle: self.handle.clone(),
            condition: self.cond.descriptor(),
        }
    }

    pub async fn is_set(&self) -> Result<bool, SyncError> {
        Ok(self.ctx.store().get_int(&self.flag).await?.unwrap_or(0) == 1)
    }

    /// Set the flag and wake every waiter
    pub async fn set(&self) -> Result<(), SyncError> {
        self.cond.acquire().await?;
        let result: Result<u64, SyncError> = async {
            self.ctx.store().set_int(&self.flag, 1).await?;
            self.cond.notify_all().await
        }
        .await;
        self.cond.release().await?;
        result?;
        tracing::debug!(handle = %self.handle, "event set");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), SyncError> {
        self.cond.acquire().await?;
        let result = self.ctx.store().set_int(&self.flag, 0).await;
        self.cond.release().await?;
        Ok(result?)
    }

    /// Block until the flag is set or `timeout` elapses; returns the flag
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<bool, SyncError> {
        self.cond.acquire().await?;
        let result: Result<bool, SyncError> = async {
            if self.is_set().await? {
                return Ok(true);
            }
            self.cond.wait(timeout).await?;
            self.is_set().await
        }
        .await;
        self.cond.release().await?;
        result
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
