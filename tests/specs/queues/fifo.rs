// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue specs
//!
//! Items put by several producers arrive once each, in each producer's
//! order, at a consumer on another connection.

use std::collections::BTreeMap;

use crate::prelude::*;
use cumulus_core::{Queue, QueueError, SimpleQueue};
use serde::{Deserialize, Serialize};
use similar_asserts::assert_eq;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    producer: u32,
    seq: u32,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queue_preserves_per_producer_order() {
    let cluster = Cluster::start().await;
    let consumer_ctx = cluster.worker().await;
    let queue: Queue<Item> = consumer_ctx.queue();
    let descriptor = queue.descriptor();

    let mut producers = Vec::new();
    for producer in 0..3u32 {
        let ctx = cluster.worker().await;
        let descriptor = descriptor.clone();
        producers.push(tokio::spawn(async move {
            let queue: Queue<Item> = Queue::attach(&ctx, descriptor);
            for seq in 0..20 {
                queue.put(&Item { producer, seq }).await.unwrap();
            }
            queue.close();
            queue.join_thread().await.unwrap();
        }));
    }

    let mut received: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for _ in 0..60 {
        let item = queue.get_timeout(Duration::from_secs(10)).await.unwrap();
        received.entry(item.producer).or_default().push(item.seq);
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let expected: Vec<u32> = (0..20).collect();
    assert_eq!(received.len(), 3);
    for seqs in received.values() {
        assert_eq!(seqs, &expected);
    }
    assert!(matches!(queue.get_nowait().await, Err(QueueError::Empty)));
}

#[tokio::test]
async fn get_times_out_on_an_empty_queue() {
    let cluster = Cluster::start().await;
    let ctx = cluster.worker().await;
    let queue: Queue<String> = ctx.queue();

    let result = queue.get_timeout(Duration::from_millis(100)).await;
    assert!(matches!(result, Err(QueueError::Empty)));
}

#[tokio::test]
async fn simple_queue_round_trips_between_workers() {
    let cluster = Cluster::start().await;
    let a = cluster.worker().await;
    let b = cluster.worker().await;

    let queue: SimpleQueue<Vec<String>> = a.simple_queue();
    let other: SimpleQueue<Vec<String>> = SimpleQueue::attach(&b, queue.descriptor());

    queue.put(&vec!["x".to_string(), "y".to_string()]).await.unwrap();
    assert_eq!(
        other.get_timeout(Duration::from_secs(2)).await.unwrap(),
        vec!["x".to_string(), "y".to_string()]
    );
    assert!(other.empty().await.unwrap());
}
