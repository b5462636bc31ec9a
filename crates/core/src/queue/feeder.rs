// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background task that moves locally buffered payloads onto the transport

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::QueueError;
use crate::id::Handle;
use crate::transport::Connection;

#[derive(Default)]
struct FeederState {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

/// Lazily started writer task owned by one queue instance
///
/// Payloads are written in the order they were pushed. Send failures are
/// logged, the first one is kept for [`Feeder::join`], and the task moves on
/// to the next payload.
pub(crate) struct Feeder {
    handle: Handle,
    writer: Arc<Connection>,
    state: Mutex<FeederState>,
    failure: Arc<Mutex<Option<String>>>,
}

impl Feeder {
    pub(crate) fn new(handle: Handle, writer: Connection) -> Self {
        Self {
            handle,
            writer: Arc::new(writer),
            state: Mutex::new(FeederState::default()),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    fn state(&self) -> MutexGuard<'_, FeederState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Buffer one payload, starting the task on first use
    pub(crate) fn push(&self, payload: Vec<u8>) -> Result<(), QueueError> {
        let mut state = self.state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        if state.tx.is_none() {
            let (tx, rx) = mpsc::unbounded_channel();
            state.task = Some(tokio::spawn(run(
                self.handle.clone(),
                Arc::clone(&self.writer),
                rx,
                Arc::clone(&self.failure),
            )));
            state.tx = Some(tx);
            tracing::debug!(handle = %self.handle, "queue feeder started");
        }
        match &state.tx {
            Some(tx) => tx.send(payload).map_err(|_| QueueError::Closed),
            None => Err(QueueError::Closed),
        }
    }

    /// Stop accepting payloads; the task drains what is buffered, then exits
    pub(crate) fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.tx = None;
    }

    /// Wait for the task to drain its buffer
    pub(crate) async fn join(&self) -> Result<(), QueueError> {
        let task = {
            let mut state = self.state();
            if !state.closed {
                return Err(QueueError::NotClosed);
            }
            state.task.take()
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    return Err(QueueError::Feeder(e.to_string()));
                }
            }
        }
        let failure = self.failure.lock().unwrap_or_else(|e| e.into_inner()).take();
        match failure {
            Some(message) => Err(QueueError::Feeder(message)),
            None => Ok(()),
        }
    }

    /// Abort the task; payloads still buffered are lost
    pub(crate) fn cancel(&self) {
        let mut state = self.state();
        state.tx = None;
        if let Some(task) = state.task.take() {
            task.abort();
            tracing::debug!(handle = %self.handle, "queue feeder cancelled");
        }
    }
}

async fn run(
    handle: Handle,
    writer: Arc<Connection>,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    failure: Arc<Mutex<Option<String>>>,
) {
    while let Some(payload) = rx.recv().await {
        if let Err(e) = writer.send_bytes(&payload).await {
            tracing::error!(%handle, error = %e, "queue feeder failed to send");
            let mut slot = failure.lock().unwrap_or_else(|e| e.into_inner());
            if slot.is_none() {
                *slot = Some(e.to_string());
            }
        }
    }
    tracing::debug!(%handle, "queue feeder drained");
}
