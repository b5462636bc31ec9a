// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message pipes over store lists
//!
//! A simplex pipe is one list: the writer pushes at the tail, the reader pops
//! from the head. A duplex pipe is two lists crossed so that each end reads
//! its own inbox and writes the other end's.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cumulus_store::{AuthError, MessageChannel, SharedStore, StoreExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::codec;
use crate::context::Context;
use crate::error::ChannelError;
use crate::id::Handle;

/// Serializable form of one end of a pipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub inbox: Option<Handle>,
    pub outbox: Option<Handle>,
}

/// One end of a pipe
pub struct Connection {
    store: SharedStore,
    inbox: Option<Handle>,
    outbox: Option<Handle>,
    closed: AtomicBool,
    poll_interval: Duration,
}

/// Create a pipe; returns `(reader, writer)` when `duplex` is false
pub fn pipe(ctx: &Context, duplex: bool) -> (Connection, Connection) {
    if duplex {
        let a = ctx.next_handle("pipe");
        let b = ctx.next_handle("pipe");
        (
            Connection::new(ctx, Some(a.clone()), Some(b.clone())),
            Connection::new(ctx, Some(b), Some(a)),
        )
    } else {
        let h = ctx.next_handle("pipe");
        (
            Connection::new(ctx, Some(h.clone()), None),
            Connection::new(ctx, None, Some(h)),
        )
    }
}

impl Connection {
    pub(crate) fn new(ctx: &Context, inbox: Option<Handle>, outbox: Option<Handle>) -> Self {
        Self {
            store: ctx.store().clone(),
            inbox,
            outbox,
            closed: AtomicBool::new(false),
            poll_interval: ctx.poll_interval(),
        }
    }

    /// Re-attach an end described by another worker
    pub fn attach(ctx: &Context, descriptor: ConnectionDescriptor) -> Self {
        Self::new(ctx, descriptor.inbox, descriptor.outbox)
    }

    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            inbox: self.inbox.clone(),
            outbox: self.outbox.clone(),
        }
    }

    pub fn readable(&self) -> bool {
        self.inbox.is_some()
    }

    pub fn writable(&self) -> bool {
        self.outbox.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Mark this end closed; the underlying lists are left for the peer
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn inbox(&self) -> Result<&Handle, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.inbox.as_ref().ok_or(ChannelError::NotReadable)
    }

    fn outbox(&self) -> Result<&Handle, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.outbox.as_ref().ok_or(ChannelError::NotWritable)
    }

    pub async fn send_bytes(&self, data: &[u8]) -> Result<(), ChannelError> {
        let outbox = self.outbox()?;
        self.store
            .rpush(outbox.as_str(), vec![data.to_vec()])
            .await?;
        Ok(())
    }

    /// Block until a message arrives
    pub async fn recv_bytes(&self) -> Result<Vec<u8>, ChannelError> {
        let inbox = self.inbox()?;
        let keys = [inbox.to_string()];
        loop {
            if let Some((_, data)) = self.store.blpop(&keys, None).await? {
                return Ok(data);
            }
        }
    }

    /// Wait at most `timeout` for a message, else [`ChannelError::WouldBlock`]
    pub async fn recv_bytes_timeout(&self, timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        let inbox = self.inbox()?;
        match self
            .store
            .blpop(&[inbox.to_string()], Some(timeout))
            .await?
        {
            Some((_, data)) => Ok(data),
            None => Err(ChannelError::WouldBlock),
        }
    }

    pub async fn send<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), ChannelError> {
        let data = codec::encode(value)?;
        self.send_bytes(&data).await
    }

    pub async fn recv<T: DeserializeOwned>(&self) -> Result<T, ChannelError> {
        let data = self.recv_bytes().await?;
        Ok(codec::decode(&data)?)
    }

    pub async fn recv_timeout<T: DeserializeOwned>(&self, timeout: Duration) -> Result<T, ChannelError> {
        let data = self.recv_bytes_timeout(timeout).await?;
        Ok(codec::decode(&data)?)
    }

    /// Messages waiting in this end's inbox
    pub async fn len(&self) -> Result<u64, ChannelError> {
        let inbox = self.inbox()?;
        Ok(self.store.llen(inbox.as_str()).await?)
    }

    pub async fn is_empty(&self) -> Result<bool, ChannelError> {
        Ok(self.len().await? == 0)
    }

    /// Whether a message is available, waiting up to `timeout` (forever when
    /// `None`). Never consumes.
    pub async fn poll(&self, timeout: Option<Duration>) -> Result<bool, ChannelError> {
        let ready = wait(&[self], timeout).await?;
        Ok(!ready.is_empty())
    }

    /// Run the challenge side of the shared-key handshake; closes on failure
    pub async fn deliver_challenge(&mut self, authkey: &[u8]) -> Result<(), ChannelError> {
        let result = cumulus_store::deliver_challenge(self, authkey).await;
        self.finish_handshake(result)
    }

    /// Answer a peer's challenge; closes on failure
    pub async fn answer_challenge(&mut self, authkey: &[u8]) -> Result<(), ChannelError> {
        let result = cumulus_store::answer_challenge(self, authkey).await;
        self.finish_handshake(result)
    }

    fn finish_handshake(&self, result: Result<(), AuthError>) -> Result<(), ChannelError> {
        if let Err(e) = result {
            tracing::warn!(error = %e, "pipe authentication failed, closing");
            self.close();
            return Err(ChannelError::Authentication(e));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageChannel for Connection {
    async fn send_message(&mut self, data: &[u8]) -> Result<(), AuthError> {
        self.send_bytes(data)
            .await
            .map_err(|e| AuthError::Channel(e.to_string()))
    }

    async fn recv_message(&mut self, max_len: usize) -> Result<Vec<u8>, AuthError> {
        let data = self
            .recv_bytes()
            .await
            .map_err(|e| AuthError::Channel(e.to_string()))?;
        if data.len() > max_len {
            return Err(AuthError::MessageTooLong {
                size: data.len(),
                max: max_len,
            });
        }
        Ok(data)
    }
}

/// Wait until at least one connection has a message, or `timeout` elapses
///
/// Returns the indices of the readable connections; empty on timeout.
pub async fn wait(
    connections: &[&Connection],
    timeout: Option<Duration>,
) -> Result<Vec<usize>, ChannelError> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let interval = connections
        .iter()
        .map(|c| c.poll_interval)
        .min()
        .unwrap_or(Duration::from_millis(200));

    loop {
        let mut ready = Vec::new();
        for (i, conn) in connections.iter().enumerate() {
            if conn.len().await? > 0 {
                ready.push(i);
            }
        }
        if !ready.is_empty() {
            return Ok(ready);
        }

        let sleep_for = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Ok(ready);
                }
                remaining.min(interval)
            }
            None => interval,
        };
        tokio::time::sleep(sleep_for).await;
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
