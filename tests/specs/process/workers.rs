// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process specs
//!
//! Targets run through the local executor against the shared store and
//! report back only through primitives named in their arguments.

use crate::prelude::*;
use cumulus_core::queue::QueueDescriptor;
use cumulus_core::{
    FunctionRegistry, LocalExecutor, ProcessError, ProcessState, Queue, WorkerContext,
    WorkerResult,
};
use similar_asserts::assert_eq;

async fn square_into_queue(worker: WorkerContext) -> WorkerResult {
    let (queue, n): (QueueDescriptor, u64) = worker.args()?;
    let queue: Queue<u64> = Queue::attach(worker.context(), queue);
    queue.put(&(n * n)).await?;
    queue.close();
    queue.join_thread().await?;
    Ok(())
}

async fn always_fails(_worker: WorkerContext) -> WorkerResult {
    Err("refusing to work".into())
}

async fn pool_context(cluster: &Cluster) -> Context {
    let functions = FunctionRegistry::new();
    functions.register("square", square_into_queue);
    functions.register("fail", always_fails);

    let worker_ctx = cluster.worker().await;
    let executor = Arc::new(LocalExecutor::new(&worker_ctx, functions));
    cluster.worker().await.with_executor(executor)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn processes_report_results_through_a_queue() {
    let cluster = Cluster::start().await;
    let ctx = pool_context(&cluster).await;
    let results: Queue<u64> = ctx.queue();

    let mut processes = Vec::new();
    for n in 1..=4u64 {
        let mut process = ctx.process("square", &(results.descriptor(), n)).unwrap();
        process.start().await.unwrap();
        processes.push(process);
    }
    for process in &mut processes {
        assert_eq!(process.join(Some(Duration::from_secs(10))).await.unwrap(), Some(0));
        assert_eq!(process.state(), ProcessState::Finished);
    }

    let mut squares = Vec::new();
    for _ in 0..4 {
        squares.push(results.get_timeout(Duration::from_secs(5)).await.unwrap());
    }
    squares.sort();
    assert_eq!(squares, vec![1, 4, 9, 16]);
    assert!(ctx.active_children().await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_target_exits_nonzero() {
    let cluster = Cluster::start().await;
    let ctx = pool_context(&cluster).await;

    let mut process = ctx.process("fail", &()).unwrap();
    process.start().await.unwrap();
    assert_eq!(process.join(None).await.unwrap(), Some(1));
    assert_eq!(process.state(), ProcessState::Errored);
}

#[tokio::test]
async fn unregistered_target_cannot_start() {
    let cluster = Cluster::start().await;
    let ctx = pool_context(&cluster).await;

    let mut process = ctx.process("missing", &()).unwrap();
    assert!(matches!(
        process.start().await,
        Err(ProcessError::UnknownTarget(_))
    ));
    assert_eq!(process.state(), ProcessState::Initial);
}
