// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn acquire_and_release_track_value() {
    let ctx = Context::in_memory();
    let sem = Semaphore::new(&ctx, 2).await.unwrap();

    assert_eq!(sem.value().await.unwrap(), 2);
    sem.acquire().await.unwrap();
    sem.acquire().await.unwrap();
    assert_eq!(sem.value().await.unwrap(), 0);

    sem.release().await.unwrap();
    assert_eq!(sem.value().await.unwrap(), 1);
}

#[tokio::test]
async fn try_acquire_on_exhausted_semaphore_would_block() {
    let ctx = Context::in_memory();
    let sem = Semaphore::new(&ctx, 1).await.unwrap();

    sem.try_acquire().await.unwrap();
    assert!(matches!(sem.try_acquire().await, Err(SyncError::WouldBlock)));
    assert_eq!(sem.value().await.unwrap(), 0);
}

#[tokio::test]
async fn acquire_timeout_restores_counter() {
    let ctx = Context::in_memory();
    let sem = Semaphore::new(&ctx, 0).await.unwrap();

    let err = sem
        .acquire_timeout(Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Timeout));

    // The cancelled waiter no longer holds a claim on future releases
    sem.release().await.unwrap();
    assert_eq!(sem.value().await.unwrap(), 1);
    sem.try_acquire().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn release_hands_slot_to_waiter() {
    let ctx = Context::in_memory();
    let sem = Semaphore::new(&ctx, 0).await.unwrap();

    let waiter = {
        let sem = sem.clone();
        tokio::spawn(async move { sem.acquire_timeout(Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    sem.release().await.unwrap();

    waiter.await.unwrap().unwrap();
    assert_eq!(sem.value().await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_initial_values_are_rejected() {
    let ctx = Context::in_memory();
    assert!(matches!(
        Semaphore::new(&ctx, -1).await,
        Err(SyncError::InvalidValue(_))
    ));
    assert!(matches!(
        Semaphore::new(&ctx, SEM_VALUE_MAX + 1).await,
        Err(SyncError::InvalidValue(_))
    ));
}

#[tokio::test]
async fn bounded_semaphore_rejects_overrelease() {
    let ctx = Context::in_memory();
    let sem = BoundedSemaphore::new(&ctx, 1).await.unwrap();

    assert!(matches!(sem.release().await, Err(SyncError::Overreleased)));
    sem.acquire().await.unwrap();
    sem.release().await.unwrap();
    assert_eq!(sem.value().await.unwrap(), 1);
}

#[tokio::test]
async fn attached_semaphore_shares_state() {
    let ctx = Context::in_memory();
    let sem = Semaphore::new(&ctx, 1).await.unwrap();
    let other = Semaphore::attach(&ctx, sem.descriptor());

    other.acquire().await.unwrap();
    assert!(matches!(sem.try_acquire().await, Err(SyncError::WouldBlock)));
    sem.release().await.unwrap();
    other.try_acquire().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn holders_never_exceed_initial_value() {
    let ctx = Context::in_memory();
    let sem = Semaphore::new(&ctx, 3).await.unwrap();
    let holding = Arc::new(AtomicI64::new(0));
    let peak = Arc::new(AtomicI64::new(0));

    let mut tasks = Vec::new();
    for _ in 0..12 {
        let sem = sem.clone();
        let holding = Arc::clone(&holding);
        let peak = Arc::clone(&peak);
        tasks.push(tokio::spawn(async move {
            sem.acquire().await?;
            let now = holding.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            holding.fetch_sub(1, Ordering::SeqCst);
            sem.release().await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(sem.value().await.unwrap(), 3);
}
