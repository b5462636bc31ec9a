// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::MemoryStore;
use crate::store::StoreExt;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a future on a fresh runtime with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn successful_command_is_logged_with_its_name() {
    let traced = TracedStore::new(MemoryStore::new());

    let (logs, result) = with_tracing(|| async { traced.rpush("jobs", vec![b"a".to_vec()]).await });

    assert_eq!(result.unwrap(), 1);
    assert!(logs.contains("store.execute"), "logs: {}", logs);
    assert!(logs.contains("command=\"rpush\""), "logs: {}", logs);
    assert!(logs.contains("done"), "logs: {}", logs);
}

#[test]
fn failed_command_logs_error() {
    let traced = TracedStore::new(MemoryStore::new());

    let (logs, result) = with_tracing(|| async {
        traced.set("k", b"text".to_vec()).await?;
        traced.incr_by("k", 1).await
    });

    assert!(matches!(result, Err(StoreError::NotAnInteger(_))));
    assert!(logs.contains("command failed"), "logs: {}", logs);
}

#[tokio::test]
async fn traced_store_passes_replies_through() {
    let traced = TracedStore::new(MemoryStore::new());
    traced.set_int("n", 41).await.unwrap();
    assert_eq!(traced.incr_by("n", 1).await.unwrap(), 42);
}
