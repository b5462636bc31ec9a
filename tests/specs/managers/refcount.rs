// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference counting specs
//!
//! An object lives while any worker holds a proxy and is deleted from the
//! store when the last one lets go.

use crate::prelude::*;
use cumulus_core::{DictProxy, ProxyError};
use similar_asserts::assert_eq;

#[tokio::test]
async fn last_release_collects_the_object() {
    let cluster = Cluster::start().await;
    let a = cluster.worker().await;
    let b = cluster.worker().await;
    let manager = a.manager();

    let dict: DictProxy<u32> = manager.dict().await.unwrap();
    dict.set("hits", &1).await.unwrap();
    let descriptor = dict.descriptor();
    let key = descriptor.handle.to_string();

    let held_by_b: DictProxy<u32> = DictProxy::attach(&b, descriptor.clone()).await.unwrap();
    assert_eq!(dict.refcount().await.unwrap(), 2);

    dict.release().await.unwrap();
    assert_eq!(held_by_b.get("hits").await.unwrap(), 1);
    assert_eq!(held_by_b.refcount().await.unwrap(), 1);

    held_by_b.release().await.unwrap();
    assert!(!cluster.backing().exists(&key).await.unwrap());
    assert!(!cluster.backing().exists(&descriptor.refcount_key).await.unwrap());
    assert_eq!(manager.object_count().await.unwrap(), 0);

    let late = DictProxy::<u32>::attach(&b, descriptor).await;
    assert!(matches!(late, Err(ProxyError::NoSuchObject(_))));
}

#[tokio::test]
async fn dropping_a_proxy_releases_its_reference() {
    let cluster = Cluster::start().await;
    let a = cluster.worker().await;
    let b = cluster.worker().await;

    let dict: DictProxy<u32> = a.manager().dict().await.unwrap();
    {
        let _held: DictProxy<u32> = DictProxy::attach(&b, dict.descriptor()).await.unwrap();
        assert_eq!(dict.refcount().await.unwrap(), 2);
    }

    let dict = &dict;
    eventually(|| async move { dict.refcount().await.unwrap() == 1 }).await;
    assert!(dict.exists().await.unwrap());
}

#[tokio::test]
async fn manager_shutdown_removes_live_objects() {
    let cluster = Cluster::start().await;
    let ctx = cluster.worker().await;
    let manager = ctx.manager();
    let _list = manager.list_from(&[1, 2, 3]).await.unwrap();
    let _ns = manager.namespace().await.unwrap();

    assert_eq!(manager.shutdown().await.unwrap(), 2);
    assert_eq!(manager.object_count().await.unwrap(), 0);
}
