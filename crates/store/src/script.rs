// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compound atomic operations
//!
//! Each script is a check-then-act sequence that must run without any other
//! command interleaving. Backends execute them under whatever atomicity
//! mechanism they have (a single mutex for the in-memory store).

use serde::{Deserialize, Serialize};

/// A compound operation executed indivisibly by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "script", rename_all = "snake_case")]
pub enum Script {
    /// Decrement `counter`; if the result is negative, queue `wake_key` on
    /// `waiters`. Replies `Acquired` or `Queued`.
    SemaphoreAcquire {
        counter: String,
        waiters: String,
        wake_key: String,
    },
    /// Decrement `counter` only if it is positive. Replies `Acquired` or
    /// `Unavailable`.
    SemaphoreTryAcquire { counter: String },
    /// Give one slot back. Replies `AtBound` (counter already at `max`),
    /// `HandedOff` (a queued waiter was popped and signalled) or `Released`.
    SemaphoreRelease {
        counter: String,
        waiters: String,
        max: i64,
        signal: Vec<u8>,
    },
    /// Withdraw a queued acquire. Replies `Cancelled` (the registration was
    /// removed and the decrement undone) or `Signalled` (a release already
    /// handed the slot over).
    SemaphoreCancel {
        counter: String,
        waiters: String,
        wake_key: String,
    },
    /// Pop up to `count` wake-keys from `list` and push `signal` onto each.
    /// Replies `Woken(n)`.
    Notify {
        list: String,
        count: u64,
        signal: Vec<u8>,
    },
    /// Snapshot and clear `list`, then signal every wake-key in the snapshot.
    /// Replies `Woken(n)`.
    NotifyAll { list: String, signal: Vec<u8> },
    /// Remove `wake_key` from `list`. Replies `Cancelled` if it was still
    /// queued, `Signalled` otherwise.
    CancelWait { list: String, wake_key: String },
    /// Decrement `counter` only if positive. Replies `Count(new)` or
    /// `Unavailable`.
    DecrementIfPositive { counter: String },
    /// Increment a live reference count. Replies `Count(new)`, or `Missing`
    /// when the count no longer exists.
    Incref { refcount: String },
    /// Decrement a reference count; at zero delete `keys`, the count itself
    /// and `handle` from `directory`. Replies `Count(remaining)` or `Missing`.
    Decref {
        refcount: String,
        keys: Vec<String>,
        directory: Option<String>,
        handle: String,
    },
    /// Append the contents of `src` to `dest`, `repeat` times. Replies
    /// `Count(new_len)`.
    ExtendList {
        dest: String,
        src: String,
        repeat: u64,
    },
    /// Replace the half-open slice `[start, stop)` (Python conventions) with
    /// `values`. Replies `Count(new_len)`.
    ListSplice {
        key: String,
        start: Option<i64>,
        stop: Option<i64>,
        values: Vec<Vec<u8>>,
    },
    /// Remove and return the element at `index` (negative counts from the
    /// tail). Replies `Removed`.
    ListRemoveAt { key: String, index: i64 },
    /// Replace the whole list. Replies `Count(len)`.
    ListReplace { key: String, values: Vec<Vec<u8>> },
    /// Remove and return one field (`field`, or any when `None`). Replies
    /// `Taken`.
    HashTake { key: String, field: Option<String> },
}

impl Script {
    pub fn name(&self) -> &'static str {
        match self {
            Script::SemaphoreAcquire { .. } => "eval:semaphore_acquire",
            Script::SemaphoreTryAcquire { .. } => "eval:semaphore_try_acquire",
            Script::SemaphoreRelease { .. } => "eval:semaphore_release",
            Script::SemaphoreCancel { .. } => "eval:semaphore_cancel",
            Script::Notify { .. } => "eval:notify",
            Script::NotifyAll { .. } => "eval:notify_all",
            Script::CancelWait { .. } => "eval:cancel_wait",
            Script::DecrementIfPositive { .. } => "eval:decrement_if_positive",
            Script::Incref { .. } => "eval:incref",
            Script::Decref { .. } => "eval:decref",
            Script::ExtendList { .. } => "eval:extend_list",
            Script::ListSplice { .. } => "eval:list_splice",
            Script::ListRemoveAt { .. } => "eval:list_remove_at",
            Script::ListReplace { .. } => "eval:list_replace",
            Script::HashTake { .. } => "eval:hash_take",
        }
    }
}

/// Outcome of a [`Script`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum ScriptReply {
    Acquired,
    Queued,
    Unavailable,
    Released,
    HandedOff,
    AtBound,
    Cancelled,
    Signalled,
    Woken(u64),
    Count(i64),
    Missing,
    Removed(Option<Vec<u8>>),
    Taken(Option<(String, Vec<u8>)>),
}
