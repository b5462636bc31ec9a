// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use cumulus_store::{Script, ScriptReply, StoreError, StoreExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

use super::{Queue, QueueDescriptor};
use crate::context::Context;
use crate::error::QueueError;
use crate::id::Handle;

const JOIN_STEP: Duration = Duration::from_millis(10);
const JOIN_MAX_BACKOFF: Duration = Duration::from_millis(500);

/// A [`Queue`] that also counts items not yet marked done
pub struct JoinableQueue<T> {
    ctx: Context,
    queue: Queue<T>,
    unfinished: String,
}

impl<T> JoinableQueue<T> {
    pub fn new(ctx: &Context) -> Self {
        Self::attach(
            ctx,
            QueueDescriptor {
                handle: ctx.next_handle("jqueue"),
            },
        )
    }

    pub fn attach(ctx: &Context, descriptor: QueueDescriptor) -> Self {
        Self {
            ctx: ctx.clone(),
            unfinished: descriptor.handle.key("unfinished"),
            queue: Queue::attach(ctx, descriptor),
        }
    }

    pub fn descriptor(&self) -> QueueDescriptor {
        self.queue.descriptor()
    }

    pub fn handle(&self) -> &Handle {
        self.queue.handle()
    }

    pub async fn qsize(&self) -> Result<u64, QueueError> {
        self.queue.qsize().await
    }

    pub async fn empty(&self) -> Result<bool, QueueError> {
        self.queue.empty().await
    }

    pub fn full(&self) -> bool {
        self.queue.full()
    }

    pub fn close(&self) {
        self.queue.close();
    }

    pub async fn join_thread(&self) -> Result<(), QueueError> {
        self.queue.join_thread().await
    }

    pub fn cancel_join_thread(&self) {
        self.queue.cancel_join_thread();
    }

    pub async fn unfinished_tasks(&self) -> Result<i64, QueueError> {
        Ok(self.ctx.store().get_int(&self.unfinished).await?.unwrap_or(0))
    }

    /// Mark one previously fetched item as processed
    pub async fn task_done(&self) -> Result<(), QueueError> {
        let script = Script::DecrementIfPositive {
            counter: self.unfinished.clone(),
        };
        match self.ctx.store().eval(script.clone()).await? {
            ScriptReply::Count(_) => Ok(()),
            ScriptReply::Unavailable => Err(QueueError::TooManyTaskDone),
            other => {
                tracing::error!(script = script.name(), ?other, "unexpected script reply");
                Err(QueueError::Store(StoreError::unexpected(script.name())))
            }
        }
    }

    /// Block until every item put has been marked done
    pub async fn join(&self) -> Result<(), QueueError> {
        self.join_until(None).await
    }

    pub async fn join_timeout(&self, timeout: Duration) -> Result<(), QueueError> {
        self.join_until(Some(Instant::now() + timeout)).await
    }

    async fn join_until(&self, deadline: Option<Instant>) -> Result<(), QueueError> {
        loop {
            let remaining = self.unfinished_tasks().await?;
            if remaining <= 0 {
                return Ok(());
            }
            let mut pause = (JOIN_STEP * remaining.min(50) as u32).min(JOIN_MAX_BACKOFF);
            if let Some(deadline) = deadline {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Err(QueueError::Timeout);
                }
                pause = pause.min(left);
            }
            tokio::time::sleep(pause).await;
        }
    }
}

impl<T: Serialize> JoinableQueue<T> {
    /// Count the item as unfinished, then buffer it
    pub async fn put(&self, item: &T) -> Result<(), QueueError> {
        let store = self.ctx.store();
        store.incr_by(&self.unfinished, 1).await?;
        if let Err(e) = self.queue.put(item).await {
            if let Err(undo) = store.incr_by(&self.unfinished, -1).await {
                tracing::warn!(error = %undo, "failed to roll back unfinished count");
            }
            return Err(e);
        }
        Ok(())
    }
}

impl<T: DeserializeOwned> JoinableQueue<T> {
    pub async fn get(&self) -> Result<T, QueueError> {
        self.queue.get().await
    }

    pub async fn get_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
        self.queue.get_timeout(timeout).await
    }

    pub async fn get_nowait(&self) -> Result<T, QueueError> {
        self.queue.get_nowait().await
    }
}
