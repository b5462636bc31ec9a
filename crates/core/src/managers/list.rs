// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared list proxy

use std::marker::PhantomData;
use std::ops::RangeBounds;

use cumulus_store::{Script, ScriptReply, StoreError, StoreExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::proxy::{ProxyCore, ProxyDescriptor};
use super::slice::Slice;
use super::ProxyKind;
use crate::codec;
use crate::context::Context;
use crate::error::ProxyError;

/// A list living in the store, element type `T`
///
/// Elements are compared by their encoded form, so `remove`, `index` and
/// `count` match values that serialize identically.
pub struct ListProxy<T> {
    core: ProxyCore,
    _item: PhantomData<fn(T) -> T>,
}

impl<T> ListProxy<T> {
    pub(crate) fn from_core(core: ProxyCore) -> Self {
        Self {
            core,
            _item: PhantomData,
        }
    }

    pub(crate) fn into_core(self) -> ProxyCore {
        self.core
    }

    pub async fn attach(ctx: &Context, descriptor: ProxyDescriptor) -> Result<Self, ProxyError> {
        ProxyKind::List.ensure_matches(&descriptor)?;
        Ok(Self::from_core(ProxyCore::attach(ctx, descriptor).await?))
    }

    pub fn descriptor(&self) -> ProxyDescriptor {
        self.core.descriptor().clone()
    }

    /// Another proxy on the same list, holding its own reference
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

    async fn eval(&self, script: Script) -> Result<ScriptReply, ProxyError> {
        Ok(self.core.ctx().store().eval(script).await?)
    }

    async fn eval_count(&self, script: Script) -> Result<u64, ProxyError> {
        match self.eval(script.clone()).await? {
            ScriptReply::Count(n) => Ok(n.max(0) as u64),
            other => {
                tracing::error!(script = script.name(), ?other, "unexpected script reply");
                Err(ProxyError::Store(StoreError::unexpected(script.name())))
            }
        }
    }

    async fn raw_items(&self) -> Result<Vec<Vec<u8>>, ProxyError> {
        Ok(self.core.ctx().store().lrange(self.key(), 0, -1).await?)
    }

    pub async fn len(&self) -> Result<u64, ProxyError> {
        Ok(self.core.ctx().store().llen(self.key()).await?)
    }

    pub async fn is_empty(&self) -> Result<bool, ProxyError> {
        Ok(self.len().await? == 0)
    }

    /// Remove the element at `index`
    pub async fn delete(&self, index: i64) -> Result<(), ProxyError> {
        let script = Script::ListRemoveAt {
            key: self.key().to_string(),
            index,
        };
        match self.eval(script).await? {
            ScriptReply::Removed(Some(_)) => Ok(()),
            _ => Err(ProxyError::IndexOutOfRange(index)),
        }
    }

    /// Delete the elements of `range`
    pub async fn delete_slice(&self, range: impl RangeBounds<i64>) -> Result<(), ProxyError> {
        let slice = Slice::from_range(range);
        self.splice(slice, Vec::new()).await
    }

    async fn splice(&self, slice: Slice, values: Vec<Vec<u8>>) -> Result<(), ProxyError> {
        self.eval_count(Script::ListSplice {
            key: self.key().to_string(),
            start: slice.start,
            stop: slice.stop,
            values,
        })
        .await?;
        Ok(())
    }

    /// Reverse the list in place
    pub async fn reverse(&self) -> Result<(), ProxyError> {
        let mut items = self.raw_items().await?;
        items.reverse();
        self.replace(items).await
    }

    async fn replace(&self, values: Vec<Vec<u8>>) -> Result<(), ProxyError> {
        self.eval_count(Script::ListReplace {
            key: self.key().to_string(),
            values,
        })
        .await?;
        Ok(())
    }

    /// Append the contents of `other` in one atomic step
    pub async fn extend_from(&self, other: &ListProxy<T>) -> Result<(), ProxyError> {
        self.eval_count(Script::ExtendList {
            dest: self.key().to_string(),
            src: other.key().to_string(),
            repeat: 1,
        })
        .await?;
        Ok(())
    }

    /// `self *= n`
    pub async fn repeat_in_place(&self, n: i64) -> Result<(), ProxyError> {
        if n <= 0 {
            return self.replace(Vec::new()).await;
        }
        self.eval_count(Script::ExtendList {
            dest: self.key().to_string(),
            src: self.key().to_string(),
            repeat: (n - 1) as u64,
        })
        .await?;
        Ok(())
    }

    /// A new shared list holding `repeat` copies of each source in turn
    async fn build_from(&self, sources: &[(&str, u64)]) -> Result<Self, ProxyError> {
        let copy = Self::from_core(self.core.sibling().await?);
        for (src, repeat) in sources {
            copy.eval_count(Script::ExtendList {
                dest: copy.key().to_string(),
                src: src.to_string(),
                repeat: *repeat,
            })
            .await?;
        }
        Ok(copy)
    }

    /// Independent shared copy of this list
    pub async fn duplicate(&self) -> Result<Self, ProxyError> {
        self.build_from(&[(self.key(), 1)]).await
    }

    /// `self + other` as a new shared list
    pub async fn concat(&self, other: &ListProxy<T>) -> Result<Self, ProxyError> {
        self.build_from(&[(self.key(), 1), (other.key(), 1)]).await
    }

    /// `self * n` as a new shared list
    pub async fn repeat(&self, n: i64) -> Result<Self, ProxyError> {
        self.build_from(&[(self.key(), n.max(0) as u64)]).await
    }
}

impl<T: Serialize> ListProxy<T> {
    pub async fn set(&self, index: i64, value: &T) -> Result<(), ProxyError> {
        let data = codec::encode(value)?;
        match self.core.ctx().store().lset(self.key(), index, data).await {
            Ok(()) => Ok(()),
            Err(StoreError::IndexOutOfRange { .. }) => Err(ProxyError::IndexOutOfRange(index)),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the elements of `range` with `items`, atomically
    pub async fn set_slice(&self, range: impl RangeBounds<i64>, items: &[T]) -> Result<(), ProxyError> {
        let slice = Slice::from_range(range);
        self.splice(slice, codec::encode_all(items)?).await
    }

    pub async fn append(&self, value: &T) -> Result<(), ProxyError> {
        let data = codec::encode(value)?;
        self.core.ctx().store().rpush(self.key(), vec![data]).await?;
        Ok(())
    }

    pub async fn extend(&self, items: &[T]) -> Result<(), ProxyError> {
        if items.is_empty() {
            return Ok(());
        }
        let values = codec::encode_all(items)?;
        self.core.ctx().store().rpush(self.key(), values).await?;
        Ok(())
    }

    /// Insert before `index`; out-of-range indices clamp to either end
    pub async fn insert(&self, index: i64, value: &T) -> Result<(), ProxyError> {
        let data = codec::encode(value)?;
        self.splice(Slice::new(Some(index), Some(index)), vec![data])
            .await
    }

    /// Remove the first element equal to `value`
    pub async fn remove(&self, value: &T) -> Result<(), ProxyError> {
        let data = codec::encode(value)?;
        let removed = self.core.ctx().store().lrem(self.key(), 1, data).await?;
        if removed == 0 {
            return Err(ProxyError::ValueNotFound);
        }
        Ok(())
    }

    /// Position of the first element equal to `value`
    pub async fn index(&self, value: &T) -> Result<u64, ProxyError> {
        let data = codec::encode(value)?;
        self.raw_items()
            .await?
            .iter()
            .position(|item| *item == data)
            .map(|i| i as u64)
            .ok_or(ProxyError::ValueNotFound)
    }

    pub async fn count(&self, value: &T) -> Result<u64, ProxyError> {
        let data = codec::encode(value)?;
        let items = self.raw_items().await?;
        Ok(items.iter().filter(|item| **item == data).count() as u64)
    }
}

impl<T: DeserializeOwned> ListProxy<T> {
    pub async fn get(&self, index: i64) -> Result<T, ProxyError> {
        match self.core.ctx().store().lindex(self.key(), index).await? {
            Some(data) => Ok(codec::decode(&data)?),
            None => Err(ProxyError::IndexOutOfRange(index)),
        }
    }

    /// Elements of `range`, Python slicing rules
    pub async fn slice(&self, range: impl RangeBounds<i64>) -> Result<Vec<T>, ProxyError> {
        let Some((start, end)) = Slice::from_range(range).to_inclusive() else {
            return Ok(Vec::new());
        };
        let raw = self
            .core
            .ctx()
            .store()
            .lrange(self.key(), start, end)
            .await?;
        Ok(codec::decode_all(&raw)?)
    }

    pub async fn to_vec(&self) -> Result<Vec<T>, ProxyError> {
        Ok(codec::decode_all(&self.raw_items().await?)?)
    }

    /// Remove and return the last element
    pub async fn pop(&self) -> Result<T, ProxyError> {
        match self.core.ctx().store().rpop(self.key()).await? {
            Some(data) => Ok(codec::decode(&data)?),
            None => Err(ProxyError::IndexOutOfRange(-1)),
        }
    }

    /// Remove and return the element at `index`
    pub async fn pop_at(&self, index: i64) -> Result<T, ProxyError> {
        let script = Script::ListRemoveAt {
            key: self.key().to_string(),
            index,
        };
        match self.eval(script).await? {
            ScriptReply::Removed(Some(data)) => Ok(codec::decode(&data)?),
            _ => Err(ProxyError::IndexOutOfRange(index)),
        }
    }
}

impl<T: Serialize + DeserializeOwned + Ord> ListProxy<T> {
    /// Sort the list in place
    pub async fn sort(&self) -> Result<(), ProxyError> {
        let mut items: Vec<T> = self.to_vec().await?;
        items.sort();
        self.replace(codec::encode_all(&items)?).await
    }
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
