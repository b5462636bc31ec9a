// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition, event and barrier specs

use crate::prelude::*;
use cumulus_core::sync::{BarrierDescriptor, EventDescriptor};
use cumulus_core::{Barrier, Condition, Event};
use similar_asserts::assert_eq;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn notify_all_wakes_exactly_the_queued_waiters() {
    let cluster = Cluster::start().await;
    let owner = cluster.worker().await;
    let condition = owner.condition(None).await.unwrap();
    let descriptor = condition.descriptor();

    let mut waiters = Vec::new();
    for _ in 0..3 {
        let ctx = cluster.worker().await;
        let descriptor = descriptor.clone();
        waiters.push(tokio::spawn(async move {
            let condition = Condition::attach(&ctx, descriptor);
            condition.acquire().await.unwrap();
            let woken = condition.wait(Some(Duration::from_secs(10))).await.unwrap();
            condition.release().await.unwrap();
            woken
        }));
    }

    eventually(|| {
        let condition = condition.clone();
        async move { condition.waiting().await.unwrap() == 3 }
    })
    .await;

    condition.acquire().await.unwrap();
    assert_eq!(condition.notify_all().await.unwrap(), 3);
    condition.release().await.unwrap();

    for waiter in waiters {
        assert!(waiter.await.unwrap());
    }
    assert_eq!(condition.waiting().await.unwrap(), 0);
}

#[tokio::test]
async fn notify_with_no_waiters_wakes_nobody() {
    let cluster = Cluster::start().await;
    let ctx = cluster.worker().await;
    let condition = ctx.condition(None).await.unwrap();

    condition.acquire().await.unwrap();
    assert_eq!(condition.notify().await.unwrap(), 0);
    condition.release().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn event_set_on_one_worker_releases_another() {
    let cluster = Cluster::start().await;
    let owner = cluster.worker().await;
    let event = owner.event().await.unwrap();
    let descriptor: EventDescriptor = event.descriptor();

    let ctx = cluster.worker().await;
    let waiter = tokio::spawn(async move {
        let event = Event::attach(&ctx, descriptor);
        event.wait(Some(Duration::from_secs(10))).await.unwrap()
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    event.set().await.unwrap();
    assert!(waiter.await.unwrap());
    assert!(event.is_set().await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn barrier_releases_all_parties_together() {
    let cluster = Cluster::start().await;
    let owner = cluster.worker().await;
    let barrier = owner.barrier(3, None).await.unwrap();
    let descriptor: BarrierDescriptor = barrier.descriptor();

    let mut parties = Vec::new();
    for _ in 0..3 {
        let ctx = cluster.worker().await;
        let descriptor = descriptor.clone();
        parties.push(tokio::spawn(async move {
            let barrier = Barrier::attach(&ctx, descriptor);
            barrier.wait(Some(Duration::from_secs(10))).await.unwrap()
        }));
    }

    let mut indices = Vec::new();
    for party in parties {
        indices.push(party.await.unwrap());
    }
    indices.sort();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(!barrier.broken().await.unwrap());
}
