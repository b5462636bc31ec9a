// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cumulus daemon (cumulusd)
//!
//! Serves one in-memory backing store over TCP so workers on different
//! hosts can share locks, queues and managed objects.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use cumulus_core::config::AUTHKEY_ENV;
use cumulus_daemon::lifecycle::{self, DaemonConfig};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[derive(Parser)]
#[command(name = "cumulusd", version, about = "Shared backing store for cumulus workers")]
struct Args {
    /// Address to listen on (defaults to the config file's store address)
    #[arg(long)]
    bind: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Client configuration file to take the address and authkey from
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DaemonConfig::from_client_config(args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Ok(key) = std::env::var(AUTHKEY_ENV) {
        config.authkey = Some(key);
    }
    config.log_path = args.log_file;

    let _log_guard = setup_logging(&config)?;

    let daemon = lifecycle::startup(&config).await?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(address = %daemon.local_addr(), "daemon ready");
    // Signal ready for a parent waiting on stdout
    println!("READY {}", daemon.local_addr());

    daemon
        .run_until(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
            }
        })
        .await?;
    Ok(())
}

fn setup_logging(
    config: &DaemonConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_path) = &config.log_path else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let file_name = log_path
        .file_name()
        .with_context(|| format!("log path has no file name: {}", log_path.display()))?;

    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
