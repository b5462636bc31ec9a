// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cyclic barriers
//!
//! The barrier's `state` and `count` live in the store and are only touched
//! while holding the barrier's condition lock. States cycle
//! filling → draining → filling; `reset` passes through resetting, and a
//! timeout or `abort` moves to broken until the next `reset`.

use std::sync::Arc;
use std::time::Duration;

use cumulus_store::StoreExt;
use serde::{Deserialize, Serialize};

use super::condition::{Condition, ConditionDescriptor};
use crate::context::Context;
use crate::error::SyncError;
use crate::id::Handle;

const FILLING: i64 = 0;
const DRAINING: i64 = 1;
const RESETTING: i64 = -1;
const BROKEN: i64 = -2;

/// Callback run by the last party to arrive, before the others are released
pub type BarrierAction = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierDescriptor {
    pub handle: Handle,
    pub parties: u64,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub condition: ConditionDescriptor,
}

#[derive(Clone)]
pub struct Barrier {
    ctx: Context,
    handle: Handle,
    state: String,
    count: String,
    parties: u64,
    timeout: Option<Duration>,
    cond: Condition,
    action: Option<BarrierAction>,
}

impl Barrier {
    pub async fn new(
        ctx: &Context,
        parties: u64,
        timeout: Option<Duration>,
    ) -> Result<Self, SyncError> {
        if parties == 0 {
            return Err(SyncError::InvalidValue(
                "barrier needs at least one party".to_string(),
            ));
        }
        let cond = Condition::new(ctx, None).await?;
        let barrier = Self::build(ctx, ctx.next_handle("barrier"), parties, timeout, cond);
        ctx.store().set_int(&barrier.state, FILLING).await?;
        ctx.store().set_int(&barrier.count, 0).await?;
        Ok(barrier)
    }

    pub fn attach(ctx: &Context, descriptor: BarrierDescriptor) -> Self {
        let cond = Condition::attach(ctx, descriptor.condition);
        Self::build(
            ctx,
            descriptor.handle,
            descriptor.parties,
            descriptor.timeout,
            cond,
        )
    }

    fn build(
        ctx: &Context,
        handle: Handle,
        parties: u64,
        timeout: Option<Duration>,
        cond: Condition,
    ) -> Self {
        Self {
            ctx: ctx.clone(),
            state: handle.key("state"),
            count: handle.key("count"),
            handle,
            parties,
            timeout,
            cond,
            action: None,
        }
    }

    /// Run `action` whenever this instance is the last party to arrive
    pub fn with_action(mut self, action: BarrierAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn descriptor(&self) -> BarrierDescriptor {
        BarrierDescriptor {
            handle: self.handle.clone(),
            parties: self.parties,
            timeout: self.timeout,
            condition: self.cond.descriptor(),
        }
    }

    pub fn parties(&self) -> u64 {
        self.parties
    }

    async fn load_state(&self) -> Result<i64, SyncError> {
        Ok(self.ctx.store().get_int(&self.state).await?.unwrap_or(FILLING))
    }

    async fn store_state(&self, state: i64) -> Result<(), SyncError> {
        Ok(self.ctx.store().set_int(&self.state, state).await?)
    }

    async fn load_count(&self) -> Result<i64, SyncError> {
        Ok(self.ctx.store().get_int(&self.count).await?.unwrap_or(0))
    }

    /// Run `body` while holding the condition lock
    async fn locked<T, F>(&self, body: F) -> Result<T, SyncError>
    where
        F: std::future::Future<Output = Result<T, SyncError>>,
    {
        self.cond.acquire().await?;
        let result = body.await;
        self.cond.release().await?;
        result
    }

    /// Wait for all parties; returns this party's arrival index
    ///
    /// `timeout` overrides the barrier's default. When it runs out the
    /// barrier breaks and every waiter fails with [`SyncError::BrokenBarrier`].
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<u64, SyncError> {
        let timeout = timeout.or(self.timeout);
        self.locked(async {
            self.enter().await?;
            let index = self.ctx.store().incr_by(&self.count, 1).await? - 1;

            let outcome = if index + 1 == self.parties as i64 {
                self.release_all().await
            } else {
                self.wait_release(timeout).await
            };

            self.ctx.store().incr_by(&self.count, -1).await?;
            self.exit().await?;
            outcome.map(|_| index as u64)
        })
        .await
    }

    /// Block while a previous cycle drains or resets
    async fn enter(&self) -> Result<(), SyncError> {
        loop {
            let state = self.load_state().await?;
            if state == DRAINING || state == RESETTING {
                self.cond.wait(None).await?;
                continue;
            }
            if state < 0 {
                return Err(SyncError::BrokenBarrier);
            }
            return Ok(());
        }
    }

    async fn release_all(&self) -> Result<(), SyncError> {
        if let Some(action) = &self.action {
            action();
        }
        self.store_state(DRAINING).await?;
        self.cond.notify_all().await?;
        tracing::debug!(handle = %self.handle, parties = self.parties, "barrier released");
        Ok(())
    }

    async fn wait_release(&self, timeout: Option<Duration>) -> Result<(), SyncError> {
        let this = self;
        let released = self
            .cond
            .wait_for(
                move || async move {
                    Ok::<_, SyncError>(this.load_state().await? != FILLING)
                },
                timeout,
            )
            .await?;
        if !released {
            tracing::warn!(handle = %self.handle, "barrier wait timed out, breaking");
            self.break_barrier().await?;
            return Err(SyncError::BrokenBarrier);
        }
        if self.load_state().await? < 0 {
            return Err(SyncError::BrokenBarrier);
        }
        Ok(())
    }

    /// Last party out re-opens the barrier for the next cycle
    async fn exit(&self) -> Result<(), SyncError> {
        if self.load_count().await? == 0 {
            let state = self.load_state().await?;
            if state == RESETTING || state == DRAINING {
                self.store_state(FILLING).await?;
                self.cond.notify_all().await?;
            }
        }
        Ok(())
    }

    async fn break_barrier(&self) -> Result<(), SyncError> {
        self.store_state(BROKEN).await?;
        self.cond.notify_all().await?;
        Ok(())
    }

    /// Return the barrier to its initial state; current waiters get
    /// [`SyncError::BrokenBarrier`]
    pub async fn reset(&self) -> Result<(), SyncError> {
        self.locked(async {
            if self.load_count().await? > 0 {
                let state = self.load_state().await?;
                if state == FILLING || state == BROKEN {
                    self.store_state(RESETTING).await?;
                }
            } else {
                self.store_state(FILLING).await?;
            }
            self.cond.notify_all().await?;
            Ok(())
        })
        .await
    }

    /// Put the barrier into the broken state
    pub async fn abort(&self) -> Result<(), SyncError> {
        self.locked(self.break_barrier()).await
    }

    /// Parties currently waiting in the filling phase
    pub async fn n_waiting(&self) -> Result<u64, SyncError> {
        self.locked(async {
            if self.load_state().await? == FILLING {
                Ok(self.load_count().await?.max(0) as u64)
            } else {
                Ok(0)
            }
        })
        .await
    }

    pub async fn broken(&self) -> Result<bool, SyncError> {
        Ok(self.load_state().await? == BROKEN)
    }
}

#[cfg(test)]
#[path = "barrier_tests.rs"]
mod tests;
