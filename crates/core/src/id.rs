// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handle generation
//!
//! Every coordination object lives under a handle of the form
//! `<prefix>:<kind>:<unique>`. Auxiliary keys hang off it as
//! `<handle>:<part>`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque key naming one coordination object in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of an auxiliary structure belonging to this object
    pub fn key(&self, part: &str) -> String {
        format!("{}:{}", self.0, part)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

/// Generates unique handles
pub trait HandleGen: Send + Sync {
    fn next(&self, kind: &str) -> Handle;
}

/// UUID-based generator for production use
#[derive(Clone)]
pub struct UuidHandles {
    prefix: String,
}

impl UuidHandles {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl HandleGen for UuidHandles {
    fn next(&self, kind: &str) -> Handle {
        Handle(format!(
            "{}:{}:{}",
            self.prefix,
            kind,
            uuid::Uuid::new_v4().simple()
        ))
    }
}

/// Sequential generator for testing
#[derive(Clone)]
pub struct SequentialHandles {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialHandles {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialHandles {
    fn default() -> Self {
        Self::new("test")
    }
}

impl HandleGen for SequentialHandles {
    fn next(&self, kind: &str) -> Handle {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Handle(format!("{}:{}:{}", self.prefix, kind, n))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
