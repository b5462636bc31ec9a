// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock and semaphore specs
//!
//! Mutual exclusion and bounded concurrency between workers that only
//! share the store.

use crate::prelude::*;
use cumulus_core::{BoundedSemaphore, Lock, Semaphore, SyncError};
use similar_asserts::assert_eq;
use std::sync::atomic::{AtomicI64, Ordering};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lock_serializes_read_modify_write_across_workers() {
    let cluster = Cluster::start().await;
    let owner = cluster.worker().await;
    let lock = owner.lock().await.unwrap();
    let descriptor = lock.descriptor();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let ctx = cluster.worker().await;
        let descriptor = descriptor.clone();
        tasks.push(tokio::spawn(async move {
            let lock = Lock::attach(&ctx, descriptor);
            for _ in 0..5 {
                lock.acquire().await.unwrap();
                let seen = ctx.store().get_int("spec:counter").await.unwrap().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(1)).await;
                ctx.store().set_int("spec:counter", seen + 1).await.unwrap();
                lock.release().await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(cluster.backing().get_int("spec:counter").await.unwrap(), Some(20));
    assert!(!lock.locked().await.unwrap());
}

#[tokio::test]
async fn held_lock_blocks_another_worker_until_released() {
    let cluster = Cluster::start().await;
    let a = cluster.worker().await;
    let b = cluster.worker().await;

    let lock = a.lock().await.unwrap();
    let other = Lock::attach(&b, lock.descriptor());
    lock.acquire().await.unwrap();

    assert!(matches!(other.try_acquire().await, Err(SyncError::WouldBlock)));
    assert!(matches!(
        other.acquire_timeout(Duration::from_millis(100)).await,
        Err(SyncError::Timeout)
    ));

    lock.release().await.unwrap();
    other.acquire_timeout(Duration::from_secs(2)).await.unwrap();
    assert!(other.is_owned());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn semaphore_bounds_holders_and_every_worker_finishes() {
    let cluster = Cluster::start().await;
    let owner = cluster.worker().await;
    let semaphore = owner.semaphore(2).await.unwrap();
    let descriptor = semaphore.descriptor();
    let inside = Arc::new(AtomicI64::new(0));
    let peak = Arc::new(AtomicI64::new(0));

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let ctx = cluster.worker().await;
        let descriptor = descriptor.clone();
        let inside = Arc::clone(&inside);
        let peak = Arc::clone(&peak);
        tasks.push(tokio::spawn(async move {
            let semaphore = Semaphore::attach(&ctx, descriptor);
            for _ in 0..3 {
                semaphore.acquire().await.unwrap();
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
                semaphore.release().await.unwrap();
            }
        }));
    }
    for task in tasks {
        tokio::time::timeout(Duration::from_secs(20), task)
            .await
            .unwrap()
            .unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(semaphore.value().await.unwrap(), 2);
}

#[tokio::test]
async fn bounded_semaphore_rejects_release_past_its_bound() {
    let cluster = Cluster::start().await;
    let a = cluster.worker().await;
    let b = cluster.worker().await;

    let semaphore = a.bounded_semaphore(1).await.unwrap();
    let other = BoundedSemaphore::attach(&b, semaphore.descriptor());

    other.acquire().await.unwrap();
    semaphore.release().await.unwrap();
    assert!(matches!(other.release().await, Err(SyncError::Overreleased)));
    assert_eq!(semaphore.value().await.unwrap(), 1);
}
