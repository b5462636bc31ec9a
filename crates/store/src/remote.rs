// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for a [`StoreServer`](crate::StoreServer)
//!
//! Keeps a small pool of idle connections. A failure is retried only while
//! the request has not been fully written, so a command never runs twice.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::auth::{answer_challenge, deliver_challenge};
use crate::command::{Command, Reply};
use crate::error::StoreError;
use crate::protocol::{self, ProtocolError, Request, Response, StreamChannel, PROTOCOL_VERSION};
use crate::store::Store;

/// Idle connections kept for reuse
const MAX_IDLE: usize = 16;

/// Connection settings for a remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub address: String,
    /// Shared key for the mutual challenge; `None` disables authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authkey: Option<String>,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Longest single server-side wait of a blocking pop
    #[serde(with = "humantime_serde")]
    pub block_slice: Duration,
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7477".to_string(),
            authkey: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            block_slice: Duration::from_secs(1),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl RemoteConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_authkey(mut self, authkey: impl Into<String>) -> Self {
        self.authkey = Some(authkey.into());
        self
    }
}

struct Pool {
    config: RemoteConfig,
    idle: Mutex<Vec<TcpStream>>,
}

/// Store backend reached over TCP
#[derive(Clone)]
pub struct RemoteStore {
    pool: Arc<Pool>,
}

fn protocol_error(e: ProtocolError) -> StoreError {
    match e {
        ProtocolError::Timeout => StoreError::Timeout,
        ProtocolError::ConnectionClosed => {
            StoreError::Unavailable("connection closed by server".to_string())
        }
        other => StoreError::Protocol(other),
    }
}

impl RemoteStore {
    /// Create a client without contacting the server
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            pool: Arc::new(Pool {
                config,
                idle: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a client and verify the server is reachable
    pub async fn connect(config: RemoteConfig) -> Result<Self, StoreError> {
        let store = Self::new(config);
        let stream = store.open().await?;
        store.checkin(stream);
        Ok(store)
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.pool.config
    }

    fn checkout(&self) -> Option<TcpStream> {
        self.pool
            .idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
    }

    fn checkin(&self, stream: TcpStream) {
        let mut idle = self.pool.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < MAX_IDLE {
            idle.push(stream);
        }
    }

    async fn open(&self) -> Result<TcpStream, StoreError> {
        let config = &self.pool.config;
        let mut stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect(&config.address),
        )
        .await
        .map_err(|_| StoreError::Timeout)?
        .map_err(|e| StoreError::Unavailable(format!("{}: {}", config.address, e)))?;
        stream.set_nodelay(true)?;

        if let Some(key) = &config.authkey {
            let mut channel = StreamChannel::new(&mut stream, config.request_timeout);
            answer_challenge(&mut channel, key.as_bytes()).await?;
            deliver_challenge(&mut channel, key.as_bytes()).await?;
        }

        let hello = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        protocol::write_request(&mut stream, &hello, config.request_timeout)
            .await
            .map_err(protocol_error)?;
        match protocol::read_response(&mut stream, config.request_timeout)
            .await
            .map_err(protocol_error)?
        {
            Response::Hello { version } if version == PROTOCOL_VERSION => {}
            Response::Hello { version } => {
                return Err(StoreError::Protocol(ProtocolError::VersionMismatch {
                    ours: PROTOCOL_VERSION.to_string(),
                    theirs: version,
                }))
            }
            other => {
                return Err(StoreError::Protocol(ProtocolError::Unexpected(format!(
                    "{:?}",
                    other
                ))))
            }
        }

        tracing::debug!(address = %config.address, "store connection opened");
        Ok(stream)
    }

    /// Send one request, retrying while nothing has reached the server
    async fn round_trip(&self, command: Command, extra_wait: Duration) -> Result<Reply, StoreError> {
        let config = &self.pool.config;
        let request = Request::Execute { command };
        let data = protocol::encode(&request).map_err(protocol_error)?;

        let mut attempt: u32 = 0;
        let mut stream = loop {
            attempt += 1;
            let written = async {
                let mut stream = match self.checkout() {
                    Some(stream) => stream,
                    None => self.open().await?,
                };
                tokio::time::timeout(
                    config.request_timeout,
                    protocol::write_message(&mut stream, &data),
                )
                .await
                .map_err(|_| StoreError::Timeout)?
                .map_err(protocol_error)?;
                Ok::<_, StoreError>(stream)
            }
            .await;

            match written {
                Ok(stream) => break stream,
                Err(e) if e.is_transient() && attempt < config.max_attempts => {
                    tracing::warn!(attempt, error = %e, "store request not sent, retrying");
                    tokio::time::sleep(config.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        };

        let response = protocol::read_message(&mut stream);
        let data = tokio::time::timeout(config.request_timeout + extra_wait, response)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(protocol_error)?;
        let response: Response = protocol::decode(&data).map_err(protocol_error)?;
        self.checkin(stream);

        match response {
            Response::Reply { reply } => Ok(reply),
            Response::Failed { failure } => Err(failure.into()),
            other => Err(StoreError::Protocol(ProtocolError::Unexpected(format!(
                "{:?}",
                other
            )))),
        }
    }

    /// Blocking pop split into bounded server-side waits
    async fn wait_pop(
        &self,
        keys: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<Reply, StoreError> {
        let slice = self.pool.config.block_slice;
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let wait = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()).min(slice),
                None => slice,
            };
            let command = Command::BLPop {
                keys: keys.clone(),
                timeout: Some(wait),
            };
            match self.round_trip(command, wait).await? {
                Reply::Popped(Some(popped)) => return Ok(Reply::Popped(Some(popped))),
                Reply::Popped(None) => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return Ok(Reply::Popped(None));
                    }
                }
                _ => return Err(StoreError::unexpected("blpop")),
            }
        }
    }
}

#[async_trait]
impl Store for RemoteStore {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        match command {
            Command::BLPop { keys, timeout } => self.wait_pop(keys, timeout).await,
            command => self.round_trip(command, Duration::ZERO).await,
        }
    }
}
