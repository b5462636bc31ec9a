// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for backing-store operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;
use crate::protocol::ProtocolError;

/// Errors from backing-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("operation against key {0} holding the wrong kind of value")]
    WrongType(String),
    #[error("value at {0} is not an integer or out of range")]
    NotAnInteger(String),
    #[error("index {index} out of range for {key}")]
    IndexOutOfRange { key: String, index: i64 },
    #[error("unexpected reply to {command}")]
    UnexpectedReply { command: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store request timed out")]
    Timeout,
    #[error("store server error: {0}")]
    Remote(String),
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn unexpected(command: impl Into<String>) -> Self {
        StoreError::UnexpectedReply {
            command: command.into(),
        }
    }

    /// Whether retrying the same command on a fresh connection may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Timeout | StoreError::Io(_)
        )
    }
}

/// Serializable form of a command failure, sent by the store server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    WrongType { key: String },
    NotAnInteger { key: String },
    IndexOutOfRange { key: String, index: i64 },
    Other { message: String },
}

impl From<&StoreError> for Failure {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::WrongType(key) => Failure::WrongType { key: key.clone() },
            StoreError::NotAnInteger(key) => Failure::NotAnInteger { key: key.clone() },
            StoreError::IndexOutOfRange { key, index } => Failure::IndexOutOfRange {
                key: key.clone(),
                index: *index,
            },
            other => Failure::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<Failure> for StoreError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::WrongType { key } => StoreError::WrongType(key),
            Failure::NotAnInteger { key } => StoreError::NotAnInteger(key),
            Failure::IndexOutOfRange { key, index } => StoreError::IndexOutOfRange { key, index },
            Failure::Other { message } => StoreError::Remote(message),
        }
    }
}
