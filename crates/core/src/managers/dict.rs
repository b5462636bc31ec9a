// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared dictionary proxy over a store hash

use std::collections::BTreeMap;
use std::marker::PhantomData;

use cumulus_store::{Script, ScriptReply, StoreError, StoreExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::proxy::{ProxyCore, ProxyDescriptor};
use super::ProxyKind;
use crate::codec;
use crate::context::Context;
use crate::error::ProxyError;

/// A string-keyed dictionary living in the store
pub struct DictProxy<V> {
    core: ProxyCore,
    _value: PhantomData<fn(V) -> V>,
}

impl<V> DictProxy<V> {
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
        ProxyKind::Dict.ensure_matches(&descriptor)?;
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

    fn key(&self) -> &str {
        self.core.key()
    }

    async fn take(&self, field: Option<String>) -> Result<Option<(String, Vec<u8>)>, ProxyError> {
        let script = Script::HashTake {
            key: self.key().to_string(),
            field,
        };
        match self.core.ctx().store().eval(script.clone()).await? {
            ScriptReply::Taken(taken) => Ok(taken),
            other => {
                tracing::error!(script = script.name(), ?other, "unexpected script reply");
                Err(ProxyError::Store(StoreError::unexpected(script.name())))
            }
        }
    }

    pub async fn len(&self) -> Result<u64, ProxyError> {
        Ok(self.core.ctx().store().hlen(self.key()).await?)
    }

    pub async fn is_empty(&self) -> Result<bool, ProxyError> {
        Ok(self.len().await? == 0)
    }

    pub async fn contains(&self, key: &str) -> Result<bool, ProxyError> {
        Ok(self.core.ctx().store().hexists(self.key(), key).await?)
    }

    pub async fn keys(&self) -> Result<Vec<String>, ProxyError> {
        Ok(self.core.ctx().store().hkeys(self.key()).await?)
    }

    pub async fn delete(&self, key: &str) -> Result<(), ProxyError> {
        let removed = self
            .core
            .ctx()
            .store()
            .hdel(self.key(), &[key.to_string()])
            .await?;
        if removed == 0 {
            return Err(ProxyError::KeyNotFound(key.to_string()));
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ProxyError> {
        self.core.ctx().store().del(&[self.key().to_string()]).await?;
        Ok(())
    }

    /// Independent shared copy of this dictionary
    pub async fn copy(&self) -> Result<Self, ProxyError> {
        let store = self.core.ctx().store();
        let entries = store.hgetall(self.key()).await?;
        let copy = Self::from_core(self.core.sibling().await?);
        if !entries.is_empty() {
            store.hset(copy.key(), entries).await?;
        }
        Ok(copy)
    }
}

impl<V: Serialize> DictProxy<V> {
    pub async fn set(&self, key: &str, value: &V) -> Result<(), ProxyError> {
        let data = codec::encode(value)?;
        self.core
            .ctx()
            .store()
            .hset(self.key(), vec![(key.to_string(), data)])
            .await?;
        Ok(())
    }

    /// Set many entries in one command
    pub async fn update<'a, I>(&self, entries: I) -> Result<(), ProxyError>
    where
        V: 'a,
        I: IntoIterator<Item = (&'a str, &'a V)>,
    {
        let mut fields = Vec::new();
        for (k, v) in entries {
            fields.push((k.to_string(), codec::encode(v)?));
        }
        if fields.is_empty() {
            return Ok(());
        }
        self.core.ctx().store().hset(self.key(), fields).await?;
        Ok(())
    }
}

impl<V: DeserializeOwned> DictProxy<V> {
    pub async fn get(&self, key: &str) -> Result<V, ProxyError> {
        match self.core.ctx().store().hget(self.key(), key).await? {
            Some(data) => Ok(codec::decode(&data)?),
            None => Err(ProxyError::KeyNotFound(key.to_string())),
        }
    }

    pub async fn get_or(&self, key: &str, default: V) -> Result<V, ProxyError> {
        match self.get(key).await {
            Err(ProxyError::KeyNotFound(_)) => Ok(default),
            other => other,
        }
    }

    pub async fn values(&self) -> Result<Vec<V>, ProxyError> {
        let raw = self.core.ctx().store().hvals(self.key()).await?;
        Ok(codec::decode_all(&raw)?)
    }

    pub async fn items(&self) -> Result<Vec<(String, V)>, ProxyError> {
        let raw = self.core.ctx().store().hgetall(self.key()).await?;
        let mut items = Vec::with_capacity(raw.len());
        for (k, data) in raw {
            items.push((k, codec::decode(&data)?));
        }
        Ok(items)
    }

    pub async fn to_map(&self) -> Result<BTreeMap<String, V>, ProxyError> {
        Ok(self.items().await?.into_iter().collect())
    }

    /// Remove `key` and return its value
    pub async fn pop(&self, key: &str) -> Result<V, ProxyError> {
        match self.take(Some(key.to_string())).await? {
            Some((_, data)) => Ok(codec::decode(&data)?),
            None => Err(ProxyError::KeyNotFound(key.to_string())),
        }
    }

    pub async fn pop_or(&self, key: &str, default: V) -> Result<V, ProxyError> {
        match self.pop(key).await {
            Err(ProxyError::KeyNotFound(_)) => Ok(default),
            other => other,
        }
    }

    /// Remove and return some entry, atomically
    pub async fn popitem(&self) -> Result<(String, V), ProxyError> {
        match self.take(None).await? {
            Some((key, data)) => Ok((key, codec::decode(&data)?)),
            None => Err(ProxyError::KeyNotFound("popitem(): dictionary is empty".to_string())),
        }
    }
}

impl<V: Serialize + DeserializeOwned> DictProxy<V> {
    /// Insert `default` unless `key` is present; return the stored value
    pub async fn setdefault(&self, key: &str, default: &V) -> Result<V, ProxyError> {
        let data = codec::encode(default)?;
        self.core.ctx().store().hsetnx(self.key(), key, data).await?;
        self.get(key).await
    }
}

#[cfg(test)]
#[path = "dict_tests.rs"]
mod tests;
