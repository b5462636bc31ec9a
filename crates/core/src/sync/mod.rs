// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking synchronization primitives backed by the store
//!
//! Every primitive is a thin protocol over atomic store scripts. Instances
//! hold a [`Context`](crate::Context) clone and can be described, shipped to
//! another worker and re-attached there.

mod barrier;
mod condition;
mod event;
mod lock;
mod semaphore;

pub use barrier::{Barrier, BarrierAction, BarrierDescriptor};
pub use condition::{Condition, ConditionDescriptor};
pub use event::{Event, EventDescriptor};
pub use lock::{Lock, LockDescriptor, RLock};
pub use semaphore::{BoundedSemaphore, Semaphore, SemaphoreDescriptor, SEM_VALUE_MAX};
