// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference-counted handle shared by every proxy type
//!
//! Each live proxy instance owns exactly one reference. Creation sets the
//! count to 1; attaching or sharing adds one; releasing or dropping removes
//! one. When the count reaches zero the store deletes the object, its count
//! and its directory entry in a single script.

use std::sync::atomic::{AtomicBool, Ordering};

use cumulus_store::{Script, ScriptReply, StoreError, StoreExt};
use serde::{Deserialize, Serialize};

use super::ProxyKind;
use crate::context::Context;
use crate::error::ProxyError;
use crate::id::Handle;

/// Serializable form of any proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    pub type_tag: String,
    pub kind: ProxyKind,
    pub handle: Handle,
    pub refcount_key: String,
    pub directory: Option<String>,
}

pub(crate) struct ProxyCore {
    ctx: Context,
    descriptor: ProxyDescriptor,
    released: AtomicBool,
}

fn unexpected(script: &Script, reply: ScriptReply) -> ProxyError {
    tracing::error!(script = script.name(), ?reply, "unexpected script reply");
    ProxyError::Store(StoreError::unexpected(script.name()))
}

impl ProxyCore {
    /// Register a new object with a count of one
    ///
    /// The caller writes any initial contents under [`ProxyCore::key`].
    pub(crate) async fn create(
        ctx: &Context,
        type_tag: &str,
        kind: ProxyKind,
        directory: Option<&str>,
    ) -> Result<Self, ProxyError> {
        let handle = ctx.next_handle(kind.as_str());
        let descriptor = ProxyDescriptor {
            type_tag: type_tag.to_string(),
            kind,
            refcount_key: handle.key("refcount"),
            handle,
            directory: directory.map(str::to_string),
        };

        let store = ctx.store();
        store.set_int(&descriptor.refcount_key, 1).await?;
        if let Some(directory) = &descriptor.directory {
            store
                .sadd(directory, &[descriptor.handle.to_string()])
                .await?;
        }
        tracing::debug!(handle = %descriptor.handle, type_tag, "created shared object");

        Ok(Self::owning(ctx, descriptor))
    }

    /// Take a new reference on the object `descriptor` names
    pub(crate) async fn attach(ctx: &Context, descriptor: ProxyDescriptor) -> Result<Self, ProxyError> {
        let script = Script::Incref {
            refcount: descriptor.refcount_key.clone(),
        };
        match ctx.store().eval(script.clone()).await? {
            ScriptReply::Count(_) => Ok(Self::owning(ctx, descriptor)),
            ScriptReply::Missing => Err(ProxyError::NoSuchObject(descriptor.handle.to_string())),
            other => Err(unexpected(&script, other)),
        }
    }

    fn owning(ctx: &Context, descriptor: ProxyDescriptor) -> Self {
        Self {
            ctx: ctx.clone(),
            descriptor,
            released: AtomicBool::new(false),
        }
    }

    pub(crate) fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Store key holding the object's data
    pub(crate) fn key(&self) -> &str {
        self.descriptor.handle.as_str()
    }

    pub(crate) fn descriptor(&self) -> &ProxyDescriptor {
        &self.descriptor
    }

    pub(crate) async fn share(&self) -> Result<Self, ProxyError> {
        Self::attach(&self.ctx, self.descriptor.clone()).await
    }

    /// Create a sibling object of the same type in the same directory
    pub(crate) async fn sibling(&self) -> Result<Self, ProxyError> {
        Self::create(
            &self.ctx,
            &self.descriptor.type_tag,
            self.descriptor.kind,
            self.descriptor.directory.as_deref(),
        )
        .await
    }

    pub(crate) async fn refcount(&self) -> Result<i64, ProxyError> {
        Ok(self
            .ctx
            .store()
            .get_int(&self.descriptor.refcount_key)
            .await?
            .unwrap_or(0))
    }

    pub(crate) async fn exists(&self) -> Result<bool, ProxyError> {
        Ok(self.ctx.store().exists(&self.descriptor.refcount_key).await?)
    }

    fn decref_script(&self) -> Script {
        Script::Decref {
            refcount: self.descriptor.refcount_key.clone(),
            keys: vec![self.descriptor.handle.to_string()],
            directory: self.descriptor.directory.clone(),
            handle: self.descriptor.handle.to_string(),
        }
    }

    /// Drop this instance's reference and wait for the store to apply it
    pub(crate) async fn release(&self) -> Result<(), ProxyError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let script = self.decref_script();
        match self.ctx.store().eval(script.clone()).await? {
            ScriptReply::Count(0) => {
                tracing::debug!(handle = %self.descriptor.handle, "collected shared object");
                Ok(())
            }
            ScriptReply::Count(_) => Ok(()),
            ScriptReply::Missing => {
                tracing::debug!(handle = %self.descriptor.handle, "shared object already gone");
                Ok(())
            }
            other => Err(unexpected(&script, other)),
        }
    }
}

impl Drop for ProxyCore {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(handle = %self.descriptor.handle, "no runtime to release shared object");
            return;
        };
        let store = self.ctx.store().clone();
        let script = self.decref_script();
        let handle = self.descriptor.handle.clone();
        runtime.spawn(async move {
            if let Err(e) = store.eval(script).await {
                tracing::warn!(%handle, error = %e, "failed to release shared object");
            }
        });
    }
}
