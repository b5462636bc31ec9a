// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared container specs
//!
//! A proxy attached in another worker observes the same object without any
//! direct message between the two.

use crate::prelude::*;
use cumulus_core::{DictProxy, ListProxy, NamespaceProxy, ValueProxy};
use similar_asserts::assert_eq;

#[tokio::test]
async fn attached_list_sees_appends_from_the_creator() {
    let cluster = Cluster::start().await;
    let creator = cluster.worker().await;
    let observer = cluster.worker().await;

    let list: ListProxy<i64> = creator.manager().list().await.unwrap();
    list.append(&1).await.unwrap();
    list.append(&2).await.unwrap();
    assert_eq!(list.slice(0..2).await.unwrap(), vec![1, 2]);

    // Descriptors cross worker boundaries as JSON
    let wire = serde_json::to_string(&list.descriptor()).unwrap();
    let remote: ListProxy<i64> =
        ListProxy::attach(&observer, serde_json::from_str(&wire).unwrap())
            .await
            .unwrap();
    assert_eq!(remote.to_vec().await.unwrap(), vec![1, 2]);

    remote.append(&3).await.unwrap();
    assert_eq!(list.get(-1).await.unwrap(), 3);
}

#[tokio::test]
async fn dict_namespace_and_value_are_shared() {
    let cluster = Cluster::start().await;
    let a = cluster.worker().await;
    let b = cluster.worker().await;
    let manager = a.manager();

    let dict: DictProxy<String> = manager.dict().await.unwrap();
    let ns = manager.namespace().await.unwrap();
    let value = manager.value("d", &0.5f64).await.unwrap();

    let dict_b: DictProxy<String> = DictProxy::attach(&b, dict.descriptor()).await.unwrap();
    let ns_b = NamespaceProxy::attach(&b, ns.descriptor()).await.unwrap();
    let value_b: ValueProxy<f64> = ValueProxy::attach(&b, value.descriptor()).await.unwrap();

    dict_b.set("status", &"ready".to_string()).await.unwrap();
    ns_b.set_attr("attempts", &2u32).await.unwrap();
    value_b.set(&1.5).await.unwrap();

    assert_eq!(dict.get("status").await.unwrap(), "ready");
    assert_eq!(ns.get_attr::<u32>("attempts").await.unwrap(), 2);
    assert_eq!(value.get().await.unwrap(), 1.5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_are_all_kept() {
    let cluster = Cluster::start().await;
    let owner = cluster.worker().await;
    let list: ListProxy<u32> = owner.manager().list().await.unwrap();
    let descriptor = list.descriptor();

    let mut tasks = Vec::new();
    for worker in 0..4u32 {
        let ctx = cluster.worker().await;
        let descriptor = descriptor.clone();
        tasks.push(tokio::spawn(async move {
            let list: ListProxy<u32> = ListProxy::attach(&ctx, descriptor).await.unwrap();
            for i in 0..10 {
                list.append(&(worker * 100 + i)).await.unwrap();
            }
            list.release().await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut items = list.to_vec().await.unwrap();
    items.sort();
    let mut expected: Vec<u32> = (0..4).flat_map(|w| (0..10).map(move |i| w * 100 + i)).collect();
    expected.sort();
    assert_eq!(items, expected);
    assert_eq!(list.refcount().await.unwrap(), 1);
}
