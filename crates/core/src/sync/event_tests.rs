// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn set_and_clear_toggle_flag() {
    let ctx = Context::in_memory();
    let event = Event::new(&ctx).await.unwrap();

    assert!(!event.is_set().await.unwrap());
    event.set().await.unwrap();
    assert!(event.is_set().await.unwrap());
    event.clear().await.unwrap();
    assert!(!event.is_set().await.unwrap());
}

#[tokio::test]
async fn wait_on_set_event_returns_immediately() {
    let ctx = Context::in_memory();
    let event = Event::new(&ctx).await.unwrap();
    event.set().await.unwrap();
    assert!(event.wait(None).await.unwrap());
}

#[tokio::test]
async fn wait_times_out_on_unset_event() {
    let ctx = Context::in_memory();
    let event = Event::new(&ctx).await.unwrap();
    assert!(!event.wait(Some(Duration::from_millis(20))).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn set_wakes_waiters_on_attached_instances() {
    let ctx = Context::in_memory();
    let event = Event::new(&ctx).await.unwrap();

    let mut waiters = Vec::new();
    for _ in 0..3 {
        let event = Event::attach(&ctx, event.descriptor());
        waiters.push(tokio::spawn(async move {
            event.wait(Some(Duration::from_secs(5))).await
        }));
    }
    tokio::time::sleep(Duration::from_millis(30)).await;
    event.set().await.unwrap();

    for waiter in waiters {
        assert!(waiter.await.unwrap().unwrap());
    }
}
