// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipe specs

use crate::prelude::*;
use cumulus_core::{ChannelError, Connection};
use similar_asserts::assert_eq;

#[tokio::test]
async fn simplex_pipe_between_workers() {
    let cluster = Cluster::start().await;
    let a = cluster.worker().await;
    let b = cluster.worker().await;

    let (reader, writer) = a.pipe(false);
    let remote_writer = Connection::attach(&b, writer.descriptor());

    remote_writer.send(&("hello", 1u8)).await.unwrap();
    remote_writer.send_bytes(b"raw").await.unwrap();

    let first: (String, u8) = reader.recv_timeout(Duration::from_secs(2)).await.unwrap();
    assert_eq!(first, ("hello".to_string(), 1));
    assert_eq!(reader.recv_bytes().await.unwrap(), b"raw".to_vec());
    assert!(matches!(writer.recv_bytes().await, Err(ChannelError::NotReadable)));
}

#[tokio::test]
async fn duplex_pipe_answers_requests() {
    let cluster = Cluster::start().await;
    let a = cluster.worker().await;
    let b = cluster.worker().await;

    let (client, server_end) = a.pipe(true);
    let server = Connection::attach(&b, server_end.descriptor());

    let responder = tokio::spawn(async move {
        let n: u64 = server.recv().await.unwrap();
        server.send(&(n + 1)).await.unwrap();
    });

    client.send(&41u64).await.unwrap();
    let answer: u64 = client.recv_timeout(Duration::from_secs(2)).await.unwrap();
    assert_eq!(answer, 42);
    responder.await.unwrap();
}

#[tokio::test]
async fn wait_reports_readable_connections() {
    let cluster = Cluster::start().await;
    let ctx = cluster.worker().await;
    let (quiet, _quiet_writer) = ctx.pipe(false);
    let (busy, busy_writer) = ctx.pipe(false);

    let ready = cumulus_core::transport::wait(&[&quiet, &busy], Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert!(ready.is_empty());

    busy_writer.send(&"ping").await.unwrap();
    let ready = cumulus_core::transport::wait(&[&quiet, &busy], Some(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(ready, vec![1]);
}
