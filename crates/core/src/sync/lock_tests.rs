// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Mutex;

#[tokio::test]
async fn lock_tracks_ownership() {
    let ctx = Context::in_memory();
    let lock = Lock::new(&ctx).await.unwrap();

    assert!(!lock.is_owned());
    assert!(!lock.locked().await.unwrap());

    lock.acquire().await.unwrap();
    assert!(lock.is_owned());
    assert!(lock.locked().await.unwrap());

    lock.release().await.unwrap();
    assert!(!lock.is_owned());
    assert!(!lock.locked().await.unwrap());
}

#[tokio::test]
async fn second_instance_cannot_take_held_lock() {
    let ctx = Context::in_memory();
    let lock = Lock::new(&ctx).await.unwrap();
    let other = Lock::attach(&ctx, lock.descriptor());

    lock.acquire().await.unwrap();
    assert!(!other.is_owned());
    assert!(matches!(other.try_acquire().await, Err(SyncError::WouldBlock)));
    assert!(matches!(
        other.acquire_timeout(Duration::from_millis(20)).await,
        Err(SyncError::Timeout)
    ));

    lock.release().await.unwrap();
    other.try_acquire().await.unwrap();
    assert!(other.is_owned());
}

#[tokio::test]
async fn releasing_unlocked_lock_fails() {
    let ctx = Context::in_memory();
    let lock = Lock::new(&ctx).await.unwrap();
    assert!(matches!(lock.release().await, Err(SyncError::Overreleased)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lock_serializes_critical_sections() {
    let ctx = Context::in_memory();
    let lock = Lock::new(&ctx).await.unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut tasks = Vec::new();
    for worker in 0..4u32 {
        let lock = Lock::attach(&ctx, lock.descriptor());
        let log = Arc::clone(&log);
        tasks.push(tokio::spawn(async move {
            for _ in 0..3 {
                lock.acquire().await?;
                log.lock().unwrap_or_else(|e| e.into_inner()).push((worker, "enter"));
                tokio::time::sleep(Duration::from_millis(2)).await;
                log.lock().unwrap_or_else(|e| e.into_inner()).push((worker, "exit"));
                lock.release().await?;
            }
            Ok::<_, SyncError>(())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let log = log.lock().unwrap_or_else(|e| e.into_inner());
    assert_eq!(log.len(), 24);
    for pair in log.chunks(2) {
        assert_eq!(pair[0].0, pair[1].0, "interleaved critical section");
        assert_eq!(pair[0].1, "enter");
        assert_eq!(pair[1].1, "exit");
    }
}

#[tokio::test]
async fn rlock_reenters_within_one_instance() {
    let ctx = Context::in_memory();
    let rlock = RLock::new(&ctx).await.unwrap();

    rlock.acquire().await.unwrap();
    rlock.acquire().await.unwrap();
    rlock.try_acquire().await.unwrap();
    assert_eq!(rlock.depth(), 3);

    let other = RLock::attach(&ctx, rlock.descriptor());
    assert!(matches!(other.try_acquire().await, Err(SyncError::WouldBlock)));

    rlock.release().await.unwrap();
    rlock.release().await.unwrap();
    assert!(matches!(other.try_acquire().await, Err(SyncError::WouldBlock)));

    rlock.release().await.unwrap();
    assert!(!rlock.is_owned());
    other.try_acquire().await.unwrap();
}

#[tokio::test]
async fn rlock_release_without_acquire_is_not_owner() {
    let ctx = Context::in_memory();
    let rlock = RLock::new(&ctx).await.unwrap();
    assert!(matches!(rlock.release().await, Err(SyncError::NotOwner)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handoff_between_clones_keeps_ownership() {
    let ctx = Context::in_memory();
    let lock = Lock::new(&ctx).await.unwrap();

    let mut tasks = Vec::new();
    for lock in [lock.clone(), lock.clone()] {
        tasks.push(tokio::spawn(async move {
            let mut disowned = 0;
            for _ in 0..150 {
                lock.acquire().await?;
                if !lock.is_owned() {
                    disowned += 1;
                }
                tokio::task::yield_now().await;
                lock.release().await?;
            }
            Ok::<_, SyncError>(disowned)
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 0);
    }
    assert!(!lock.locked().await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clone_in_another_task_does_not_own() {
    let ctx = Context::in_memory();
    let lock = Lock::new(&ctx).await.unwrap();
    lock.acquire().await.unwrap();

    let clone = lock.clone();
    let seen = tokio::spawn(async move { clone.is_owned() }).await.unwrap();
    assert!(!seen);
    assert!(lock.is_owned());
    lock.release().await.unwrap();
}

#[tokio::test]
async fn failed_release_keeps_owner() {
    let ctx = Context::in_memory();
    let lock = Lock::new(&ctx).await.unwrap();
    let other = Lock::attach(&ctx, lock.descriptor());

    lock.acquire().await.unwrap();
    other.release().await.unwrap();
    // The store slot is free again while `lock` still records its owner
    assert!(matches!(lock.release().await, Err(SyncError::Overreleased)));
    assert!(lock.is_owned());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rlock_clone_in_another_task_is_excluded() {
    let ctx = Context::in_memory();
    let rlock = RLock::new(&ctx).await.unwrap();
    rlock.acquire().await.unwrap();

    let clone = rlock.clone();
    let attempt = tokio::spawn(async move {
        let acquired = clone.try_acquire().await;
        let released = clone.release().await;
        (acquired, released)
    })
    .await
    .unwrap();
    assert!(matches!(attempt.0, Err(SyncError::WouldBlock)));
    assert!(matches!(attempt.1, Err(SyncError::NotOwner)));
    assert_eq!(rlock.depth(), 1);

    rlock.release().await.unwrap();
    assert!(!rlock.locked().await.unwrap());
}
