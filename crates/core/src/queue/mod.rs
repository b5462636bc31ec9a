// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FIFO queues over a store-backed pipe
//!
//! Every variant is a reader/writer [`Connection`] pair on one list handle.
//! [`Queue`] buffers puts locally and writes them from a feeder task,
//! [`JoinableQueue`] adds a remote unfinished-task counter, and
//! [`SimpleQueue`] writes straight through.

mod feeder;
mod joinable;
mod simple;

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::context::Context;
use crate::error::{ChannelError, QueueError};
use crate::id::Handle;
use crate::transport::Connection;
use feeder::Feeder;

pub use joinable::JoinableQueue;
pub use simple::SimpleQueue;

/// Serializable form of any queue variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDescriptor {
    pub handle: Handle,
}

/// Reader and writer ends sharing one list handle
pub(crate) fn connection_pair(ctx: &Context, handle: &Handle) -> (Connection, Connection) {
    (
        Connection::new(ctx, Some(handle.clone()), None),
        Connection::new(ctx, None, Some(handle.clone())),
    )
}

pub(crate) fn map_recv(err: ChannelError) -> QueueError {
    match err {
        ChannelError::WouldBlock => QueueError::Empty,
        other => QueueError::Channel(other),
    }
}

/// Multi-producer, multi-consumer FIFO queue
///
/// `put` never blocks on the store: payloads are encoded immediately and
/// handed to a per-instance feeder task that writes them in order.
pub struct Queue<T> {
    handle: Handle,
    reader: Connection,
    feeder: Feeder,
    _item: PhantomData<fn(T) -> T>,
}

impl<T> Queue<T> {
    pub fn new(ctx: &Context) -> Self {
        Self::attach(
            ctx,
            QueueDescriptor {
                handle: ctx.next_handle("queue"),
            },
        )
    }

    pub fn attach(ctx: &Context, descriptor: QueueDescriptor) -> Self {
        let (reader, writer) = connection_pair(ctx, &descriptor.handle);
        Self {
            feeder: Feeder::new(descriptor.handle.clone(), writer),
            handle: descriptor.handle,
            reader,
            _item: PhantomData,
        }
    }

    pub fn descriptor(&self) -> QueueDescriptor {
        QueueDescriptor {
            handle: self.handle.clone(),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Approximate number of items written and not yet taken
    pub async fn qsize(&self) -> Result<u64, QueueError> {
        Ok(self.reader.len().await?)
    }

    pub async fn empty(&self) -> Result<bool, QueueError> {
        Ok(self.qsize().await? == 0)
    }

    /// Queues are unbounded
    pub fn full(&self) -> bool {
        false
    }

    /// Refuse further puts from this instance and let the feeder drain
    pub fn close(&self) {
        self.feeder.close();
        self.reader.close();
    }

    pub fn is_closed(&self) -> bool {
        self.feeder.is_closed()
    }

    /// Wait until every buffered item has been written; only after `close`
    pub async fn join_thread(&self) -> Result<(), QueueError> {
        self.feeder.join().await
    }

    /// Stop the feeder without waiting; buffered items may be lost
    pub fn cancel_join_thread(&self) {
        self.feeder.cancel();
    }
}

impl<T: Serialize> Queue<T> {
    pub async fn put(&self, item: &T) -> Result<(), QueueError> {
        let payload = codec::encode(item)?;
        self.feeder.push(payload)
    }
}

impl<T: DeserializeOwned> Queue<T> {
    /// Remove and return the next item, waiting as long as it takes
    pub async fn get(&self) -> Result<T, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        let data = self.reader.recv_bytes().await?;
        Ok(codec::decode(&data)?)
    }

    /// Like [`Queue::get`], failing with [`QueueError::Empty`] after `timeout`
    pub async fn get_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        let data = self
            .reader
            .recv_bytes_timeout(timeout)
            .await
            .map_err(map_recv)?;
        Ok(codec::decode(&data)?)
    }

    pub async fn get_nowait(&self) -> Result<T, QueueError> {
        self.get_timeout(Duration::ZERO).await
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
