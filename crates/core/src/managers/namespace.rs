// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cumulus_store::StoreExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::proxy::{ProxyCore, ProxyDescriptor};
use super::ProxyKind;
use crate::codec;
use crate::context::Context;
use crate::error::ProxyError;

/// Bag of named attributes, each with its own type
pub struct NamespaceProxy {
    core: ProxyCore,
}

impl NamespaceProxy {
    pub(crate) fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }

    pub(crate) fn into_core(self) -> ProxyCore {
        self.core
    }

    pub async fn attach(ctx: &Context, descriptor: ProxyDescriptor) -> Result<Self, ProxyError> {
        ProxyKind::Namespace.ensure_matches(&descriptor)?;
        Ok(Self::from_core(ProxyCore::attach(ctx, descriptor).await?))
    }

    pub fn descriptor(&self) -> ProxyDescriptor {
        self.core.descriptor().clone()
    }

    pub async fn share(&self) -> Result<Self, ProxyError> {
        Ok(Self::from_core(self.core.share().await?))
    }

    pub async fn release(self) -> Result<(), ProxyError> {
        self.core.release().await
    }

    pub async fn refcount(&self) -> Result<i64, ProxyError> {
        self.core.refcount().await
    }

    pub async fn exists(&self) -> Result<bool, ProxyError> {
        self.core.exists().await
    }

    pub async fn get_attr<T: DeserializeOwned>(&self, name: &str) -> Result<T, ProxyError> {
        match self.core.ctx().store().hget(self.core.key(), name).await? {
            Some(data) => Ok(codec::decode(&data)?),
            None => Err(ProxyError::AttributeNotFound(name.to_string())),
        }
    }

    pub async fn set_attr<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), ProxyError> {
        let data = codec::encode(value)?;
        self.core
            .ctx()
            .store()
            .hset(self.core.key(), vec![(name.to_string(), data)])
            .await?;
        Ok(())
    }

    pub async fn del_attr(&self, name: &str) -> Result<(), ProxyError> {
        let removed = self
            .core
            .ctx()
            .store()
            .hdel(self.core.key(), &[name.to_string()])
            .await?;
        if removed == 0 {
            return Err(ProxyError::AttributeNotFound(name.to_string()));
        }
        Ok(())
    }

    pub async fn has_attr(&self, name: &str) -> Result<bool, ProxyError> {
        Ok(self.core.ctx().store().hexists(self.core.key(), name).await?)
    }

    /// Names of every attribute currently set
    pub async fn attrs(&self) -> Result<Vec<String>, ProxyError> {
        Ok(self.core.ctx().store().hkeys(self.core.key()).await?)
    }
}
