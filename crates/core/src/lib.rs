// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cumulus-core: multiprocessing-style primitives over a shared store
//!
//! This crate provides:
//! - [`Context`], the explicit entry point every primitive is created from
//! - Byte-message pipes ([`Connection`]) over store lists
//! - Locks, semaphores, conditions, events and barriers
//! - FIFO queues with a background feeder task
//! - A [`Manager`] handing out reference-counted shared containers
//! - [`Process`] lifecycle on top of a pluggable [`Executor`]

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod id;
pub mod managers;
pub mod process;
pub mod queue;
pub mod sync;
pub mod transport;

pub use config::{Backend, Config, StoreConfig, SyncConfig};
pub use context::Context;
pub use error::{ChannelError, ConfigError, ProcessError, ProxyError, QueueError, SyncError};
pub use id::{Handle, HandleGen, SequentialHandles, UuidHandles};
pub use managers::{
    DictProxy, ListProxy, Manager, ManagerDescriptor, NamespaceProxy, ProxyDescriptor, ProxyKind,
    SharedObject, ValueProxy,
};
pub use process::{
    ExecHandle, ExecStatus, Executor, FunctionRegistry, LocalExecutor, Process, ProcessState,
    WorkerContext, WorkerResult,
};
#[cfg(any(test, feature = "test-support"))]
pub use process::{ExecutorCall, FakeExecutor};
pub use queue::{JoinableQueue, Queue, QueueDescriptor, SimpleQueue};
pub use sync::{Barrier, BoundedSemaphore, Condition, Event, Lock, RLock, Semaphore};
pub use transport::{Connection, ConnectionDescriptor};
