// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JoinableQueue specs

use crate::prelude::*;
use cumulus_core::{JoinableQueue, QueueError};
use similar_asserts::assert_eq;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn join_returns_once_every_task_is_done() {
    let cluster = Cluster::start().await;
    let ctx = cluster.worker().await;
    let queue: JoinableQueue<u32> = ctx.joinable_queue();
    for n in 0..10 {
        queue.put(&n).await.unwrap();
    }
    assert_eq!(queue.unfinished_tasks().await.unwrap(), 10);

    let mut workers = Vec::new();
    for _ in 0..2 {
        let ctx = cluster.worker().await;
        let descriptor = queue.descriptor();
        workers.push(tokio::spawn(async move {
            let queue: JoinableQueue<u32> = JoinableQueue::attach(&ctx, descriptor);
            let mut handled = 0;
            loop {
                match queue.get_timeout(Duration::from_millis(300)).await {
                    Ok(_) => {
                        queue.task_done().await.unwrap();
                        handled += 1;
                    }
                    Err(QueueError::Empty) => break,
                    Err(e) => panic!("unexpected queue error: {e}"),
                }
            }
            handled
        }));
    }

    queue.join_timeout(Duration::from_secs(10)).await.unwrap();
    let mut handled = 0;
    for worker in workers {
        handled += worker.await.unwrap();
    }
    assert_eq!(handled, 10);
    assert_eq!(queue.unfinished_tasks().await.unwrap(), 0);
}

#[tokio::test]
async fn join_times_out_with_work_outstanding() {
    let cluster = Cluster::start().await;
    let ctx = cluster.worker().await;
    let queue: JoinableQueue<String> = ctx.joinable_queue();
    queue.put(&"pending".to_string()).await.unwrap();

    let result = queue.join_timeout(Duration::from_millis(100)).await;
    assert!(matches!(result, Err(QueueError::Timeout)));
}
