// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{connection_pair, map_recv, QueueDescriptor};
use crate::context::Context;
use crate::error::QueueError;
use crate::id::Handle;
use crate::transport::Connection;

/// Unbuffered queue: `put` writes to the store before returning
pub struct SimpleQueue<T> {
    handle: Handle,
    reader: Connection,
    writer: Connection,
    _item: PhantomData<fn(T) -> T>,
}

impl<T> SimpleQueue<T> {
    pub fn new(ctx: &Context) -> Self {
        Self::attach(
            ctx,
            QueueDescriptor {
                handle: ctx.next_handle("squeue"),
            },
        )
    }

    pub fn attach(ctx: &Context, descriptor: QueueDescriptor) -> Self {
        let (reader, writer) = connection_pair(ctx, &descriptor.handle);
        Self {
            handle: descriptor.handle,
            reader,
            writer,
            _item: PhantomData,
        }
    }

    pub fn descriptor(&self) -> QueueDescriptor {
        QueueDescriptor {
            handle: self.handle.clone(),
        }
    }

    pub async fn empty(&self) -> Result<bool, QueueError> {
        Ok(self.reader.is_empty().await?)
    }

    pub fn close(&self) {
        self.reader.close();
        self.writer.close();
    }
}

impl<T: Serialize> SimpleQueue<T> {
    pub async fn put(&self, item: &T) -> Result<(), QueueError> {
        Ok(self.writer.send(item).await?)
    }
}

impl<T: DeserializeOwned> SimpleQueue<T> {
    pub async fn get(&self) -> Result<T, QueueError> {
        Ok(self.reader.recv().await?)
    }

    pub async fn get_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
        self.reader.recv_timeout(timeout).await.map_err(map_recv)
    }
}
