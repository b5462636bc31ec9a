// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared objects and the manager that creates them
//!
//! A [`Manager`] maps type tags to proxy kinds, creates objects in the store
//! and keeps a directory set of the handles it created. Proxies are
//! reference counted; see [`ProxyDescriptor`] for what crosses the wire.

mod dict;
mod list;
mod namespace;
mod proxy;
mod slice;
mod value;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use cumulus_store::StoreExt;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::context::Context;
use crate::error::ProxyError;
use crate::id::Handle;
use proxy::ProxyCore;

pub use dict::DictProxy;
pub use list::ListProxy;
pub use namespace::NamespaceProxy;
pub use proxy::ProxyDescriptor;
pub use slice::Slice;
pub use value::ValueProxy;

/// The four shapes a shared object can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    List,
    Dict,
    Namespace,
    Value,
}

impl ProxyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProxyKind::List => "list",
            ProxyKind::Dict => "dict",
            ProxyKind::Namespace => "namespace",
            ProxyKind::Value => "value",
        }
    }

    pub(crate) fn ensure_matches(self, descriptor: &ProxyDescriptor) -> Result<(), ProxyError> {
        if descriptor.kind == self {
            Ok(())
        } else {
            Err(ProxyError::TypeMismatch {
                expected: self.as_str().to_string(),
                found: descriptor.type_tag.clone(),
            })
        }
    }
}

/// A proxy whose element types are only known at runtime
pub enum SharedObject {
    List(ListProxy<serde_json::Value>),
    Dict(DictProxy<serde_json::Value>),
    Namespace(NamespaceProxy),
    Value(ValueProxy<serde_json::Value>),
}

impl SharedObject {
    fn from_core(core: ProxyCore) -> Self {
        match core.descriptor().kind {
            ProxyKind::List => SharedObject::List(ListProxy::from_core(core)),
            ProxyKind::Dict => SharedObject::Dict(DictProxy::from_core(core)),
            ProxyKind::Namespace => SharedObject::Namespace(NamespaceProxy::from_core(core)),
            ProxyKind::Value => SharedObject::Value(ValueProxy::from_core(core)),
        }
    }

    fn into_core(self) -> ProxyCore {
        match self {
            SharedObject::List(p) => p.into_core(),
            SharedObject::Dict(p) => p.into_core(),
            SharedObject::Namespace(p) => p.into_core(),
            SharedObject::Value(p) => p.into_core(),
        }
    }

    pub fn kind(&self) -> ProxyKind {
        match self {
            SharedObject::List(_) => ProxyKind::List,
            SharedObject::Dict(_) => ProxyKind::Dict,
            SharedObject::Namespace(_) => ProxyKind::Namespace,
            SharedObject::Value(_) => ProxyKind::Value,
        }
    }

    pub fn descriptor(&self) -> ProxyDescriptor {
        match self {
            SharedObject::List(p) => p.descriptor(),
            SharedObject::Dict(p) => p.descriptor(),
            SharedObject::Namespace(p) => p.descriptor(),
            SharedObject::Value(p) => p.descriptor(),
        }
    }

    /// Narrow to a typed proxy; a mismatch drops this reference
    fn retype(self, kind: ProxyKind) -> Result<ProxyCore, ProxyError> {
        let core = self.into_core();
        kind.ensure_matches(core.descriptor())?;
        Ok(core)
    }

    pub fn into_list<T>(self) -> Result<ListProxy<T>, ProxyError> {
        Ok(ListProxy::from_core(self.retype(ProxyKind::List)?))
    }

    pub fn into_dict<V>(self) -> Result<DictProxy<V>, ProxyError> {
        Ok(DictProxy::from_core(self.retype(ProxyKind::Dict)?))
    }

    pub fn into_namespace(self) -> Result<NamespaceProxy, ProxyError> {
        Ok(NamespaceProxy::from_core(self.retype(ProxyKind::Namespace)?))
    }

    pub fn into_value<T>(self) -> Result<ValueProxy<T>, ProxyError> {
        Ok(ValueProxy::from_core(self.retype(ProxyKind::Value)?))
    }

    pub async fn release(self) -> Result<(), ProxyError> {
        self.into_core().release().await
    }
}

/// Serializable form of a [`Manager`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerDescriptor {
    pub directory: String,
}

/// Creates shared objects and tracks the ones it made
#[derive(Clone)]
pub struct Manager {
    ctx: Context,
    directory: String,
    registry: Arc<RwLock<HashMap<String, ProxyKind>>>,
}

fn builtin_registry() -> HashMap<String, ProxyKind> {
    [
        ("list", ProxyKind::List),
        ("dict", ProxyKind::Dict),
        ("Namespace", ProxyKind::Namespace),
        ("Value", ProxyKind::Value),
    ]
    .into_iter()
    .map(|(tag, kind)| (tag.to_string(), kind))
    .collect()
}

impl Manager {
    pub fn new(ctx: &Context) -> Self {
        Self::from_descriptor(
            ctx,
            ManagerDescriptor {
                directory: ctx.next_handle("manager").key("objects"),
            },
        )
    }

    /// A manager sharing another's directory; registrations stay local
    pub fn from_descriptor(ctx: &Context, descriptor: ManagerDescriptor) -> Self {
        Self {
            ctx: ctx.clone(),
            directory: descriptor.directory,
            registry: Arc::new(RwLock::new(builtin_registry())),
        }
    }

    pub fn descriptor(&self) -> ManagerDescriptor {
        ManagerDescriptor {
            directory: self.directory.clone(),
        }
    }

    /// Make `tag` create objects of `kind`
    pub fn register(&self, tag: impl Into<String>, kind: ProxyKind) {
        self.registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tag.into(), kind);
    }

    /// Resolve a type tag; `Value(<typecode>)` resolves through `Value`
    pub fn kind_of(&self, tag: &str) -> Option<ProxyKind> {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        if let Some(kind) = registry.get(tag) {
            return Some(*kind);
        }
        if tag.starts_with("Value(") && tag.ends_with(')') {
            return registry.get("Value").copied();
        }
        None
    }

    async fn create_core(&self, tag: &str, kind: ProxyKind) -> Result<ProxyCore, ProxyError> {
        ProxyCore::create(&self.ctx, tag, kind, Some(&self.directory)).await
    }

    /// Create an empty object of the type registered under `tag`
    pub async fn create(&self, tag: &str) -> Result<SharedObject, ProxyError> {
        let kind = self
            .kind_of(tag)
            .ok_or_else(|| ProxyError::UnknownType(tag.to_string()))?;
        let core = self.create_core(tag, kind).await?;
        if kind == ProxyKind::Value {
            let null = codec::encode(&serde_json::Value::Null)?;
            self.ctx.store().set(core.key(), null).await?;
        }
        Ok(SharedObject::from_core(core))
    }

    /// Take a new reference on a described object
    pub async fn attach(&self, descriptor: ProxyDescriptor) -> Result<SharedObject, ProxyError> {
        let kind = self
            .kind_of(&descriptor.type_tag)
            .ok_or_else(|| ProxyError::UnknownType(descriptor.type_tag.clone()))?;
        kind.ensure_matches(&descriptor)?;
        Ok(SharedObject::from_core(
            ProxyCore::attach(&self.ctx, descriptor).await?,
        ))
    }

    pub async fn list<T>(&self) -> Result<ListProxy<T>, ProxyError> {
        Ok(ListProxy::from_core(
            self.create_core("list", ProxyKind::List).await?,
        ))
    }

    pub async fn list_from<T: Serialize>(&self, items: &[T]) -> Result<ListProxy<T>, ProxyError> {
        let list = self.list().await?;
        list.extend(items).await?;
        Ok(list)
    }

    pub async fn dict<V>(&self) -> Result<DictProxy<V>, ProxyError> {
        Ok(DictProxy::from_core(
            self.create_core("dict", ProxyKind::Dict).await?,
        ))
    }

    pub async fn dict_from<'a, V, I>(&self, entries: I) -> Result<DictProxy<V>, ProxyError>
    where
        V: Serialize + 'a,
        I: IntoIterator<Item = (&'a str, &'a V)>,
    {
        let dict = self.dict().await?;
        dict.update(entries).await?;
        Ok(dict)
    }

    pub async fn namespace(&self) -> Result<NamespaceProxy, ProxyError> {
        Ok(NamespaceProxy::from_core(
            self.create_core("Namespace", ProxyKind::Namespace).await?,
        ))
    }

    pub async fn value<T: Serialize>(
        &self,
        typecode: &str,
        initial: &T,
    ) -> Result<ValueProxy<T>, ProxyError> {
        let tag = format!("Value({})", typecode);
        let value = ValueProxy::from_core(self.create_core(&tag, ProxyKind::Value).await?);
        value.set(initial).await?;
        Ok(value)
    }

    /// Handles of live objects this manager's directory knows about
    pub async fn handles(&self) -> Result<Vec<Handle>, ProxyError> {
        let members = self.ctx.store().smembers(&self.directory).await?;
        Ok(members.into_iter().map(Handle::new).collect())
    }

    pub async fn object_count(&self) -> Result<u64, ProxyError> {
        Ok(self.handles().await?.len() as u64)
    }

    /// Delete every object in the directory, whatever its refcount
    ///
    /// Returns how many objects were removed. Proxies still alive afterwards
    /// fail with [`ProxyError::NoSuchObject`] on attach.
    pub async fn shutdown(&self) -> Result<u64, ProxyError> {
        let handles = self.handles().await?;
        let store = self.ctx.store();
        for handle in &handles {
            store
                .del(&[handle.to_string(), handle.key("refcount")])
                .await?;
        }
        store.del(&[self.directory.clone()]).await?;
        tracing::info!(
            directory = %self.directory,
            objects = handles.len(),
            "manager shut down"
        );
        Ok(handles.len() as u64)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
