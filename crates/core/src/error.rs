// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types, one enum per layer

use std::path::PathBuf;

use cumulus_store::{AuthError, StoreError};
use thiserror::Error;

/// Errors from pipes and connections
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("no message available")]
    WouldBlock,
    #[error("connection is closed")]
    Closed,
    #[error("connection is write-only")]
    NotReadable,
    #[error("connection is read-only")]
    NotWritable,
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),
}

/// Errors from locks, semaphores, conditions, events and barriers
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("resource not available")]
    WouldBlock,
    #[error("timed out")]
    Timeout,
    #[error("cannot operate on un-acquired lock")]
    NotOwner,
    #[error("semaphore or lock released too many times")]
    Overreleased,
    #[error("barrier is broken")]
    BrokenBarrier,
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Errors from queues
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("queue is empty")]
    Empty,
    #[error("queue is closed")]
    Closed,
    #[error("task_done() called too many times")]
    TooManyTaskDone,
    #[error("timed out")]
    Timeout,
    #[error("queue must be closed before joining its feeder")]
    NotClosed,
    #[error("feeder failed: {0}")]
    Feeder(String),
}

/// Errors from the manager and its proxies
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),
    #[error("index {0} out of range")]
    IndexOutOfRange(i64),
    #[error("value not found")]
    ValueNotFound,
    #[error("shared object {0} no longer exists")]
    NoSuchObject(String),
    #[error("unknown shared type: {0}")]
    UnknownType(String),
    #[error("expected a {expected} proxy, found {found}")]
    TypeMismatch { expected: String, found: String },
}

/// Errors from process lifecycle and executors
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("process already started")]
    AlreadyStarted,
    #[error("process not started")]
    NotStarted,
    #[error("not supported by executor: {0}")]
    NotSupported(String),
    #[error("unknown target: {0}")]
    UnknownTarget(String),
    #[error("executor error: {0}")]
    Executor(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Errors while loading configuration or opening the store it names
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
