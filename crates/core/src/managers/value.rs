// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::marker::PhantomData;

use cumulus_store::StoreExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::proxy::{ProxyCore, ProxyDescriptor};
use super::ProxyKind;
use crate::codec;
use crate::context::Context;
use crate::error::ProxyError;

/// A single shared scalar, tagged `Value(<typecode>)`
pub struct ValueProxy<T> {
    core: ProxyCore,
    _value: PhantomData<fn(T) -> T>,
}

impl<T> ValueProxy<T> {
    pub(crate) fn from_core(core: ProxyCore) -> Self {
        Self {
            core,
            _value: PhantomData,
        }
    }

    pub(crate) fn into_core(self) -> ProxyCore {
        self.core
    }

    pub async fn attach(ctx: &Context, descriptor: ProxyDescriptor) -> Result<Self, ProxyError> {
        ProxyKind::Value.ensure_matches(&descriptor)?;
        Ok(Self::from_core(ProxyCore::attach(ctx, descriptor).await?))
    }

    pub fn descriptor(&self) -> ProxyDescriptor {
        self.core.descriptor().clone()
    }

    /// The typecode between the parentheses of the type tag
    pub fn typecode(&self) -> &str {
        let tag = self.core.descriptor().type_tag.as_str();
        tag.strip_prefix("Value(")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or("")
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
}

impl<T: Serialize> ValueProxy<T> {
    pub async fn set(&self, value: &T) -> Result<(), ProxyError> {
        let data = codec::encode(value)?;
        self.core.ctx().store().set(self.core.key(), data).await?;
        Ok(())
    }
}

impl<T: DeserializeOwned> ValueProxy<T> {
    pub async fn get(&self) -> Result<T, ProxyError> {
        match self.core.ctx().store().get(self.core.key()).await? {
            Some(data) => Ok(codec::decode(&data)?),
            None => Err(ProxyError::NoSuchObject(
                self.core.descriptor().handle.to_string(),
            )),
        }
    }
}
