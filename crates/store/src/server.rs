// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP server exposing a [`Store`](crate::Store) to remote workers

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::auth::{answer_challenge, deliver_challenge};
use crate::command::{Command, Reply};
use crate::error::{Failure, StoreError};
use crate::protocol::{
    self, ProtocolError, Request, Response, StreamChannel, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};
use crate::store::{SharedStore, Store};

/// Accepts connections and executes their commands against one store
pub struct StoreServer {
    listener: TcpListener,
    store: SharedStore,
    authkey: Option<Arc<Vec<u8>>>,
    io_timeout: Duration,
}

impl StoreServer {
    pub async fn bind(address: &str, store: SharedStore) -> Result<Self, StoreError> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            store,
            authkey: None,
            io_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Require every client to pass the mutual challenge with `authkey`
    pub fn with_authkey(mut self, authkey: impl Into<Vec<u8>>) -> Self {
        self.authkey = Some(Arc::new(authkey.into()));
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, StoreError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves
    pub async fn serve_until<F>(self, shutdown: F) -> Result<(), StoreError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(address = ?self.listener.local_addr().ok(), "store server listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("store server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted connection");
                        let store = Arc::clone(&self.store);
                        let authkey = self.authkey.clone();
                        let io_timeout = self.io_timeout;
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, store, authkey, io_timeout).await {
                                warn!(%peer, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => error!("Error accepting connection: {}", e),
                }
            }
        }
    }

    pub async fn serve(self) -> Result<(), StoreError> {
        self.serve_until(std::future::pending()).await
    }
}

/// Handle a single client connection until it disconnects
async fn handle_connection(
    mut stream: TcpStream,
    store: SharedStore,
    authkey: Option<Arc<Vec<u8>>>,
    io_timeout: Duration,
) -> Result<(), StoreError> {
    stream.set_nodelay(true)?;

    if let Some(key) = authkey {
        let mut channel = StreamChannel::new(&mut stream, io_timeout);
        deliver_challenge(&mut channel, &key).await?;
        answer_challenge(&mut channel, &key).await?;
        debug!("client authenticated");
    }

    let (mut reader, mut writer) = stream.into_split();
    loop {
        // Pooled connections sit idle between requests, so no read timeout here
        let request: Request = match protocol::read_message(&mut reader).await {
            Ok(data) => protocol::decode(&data)?,
            Err(ProtocolError::ConnectionClosed) => {
                debug!("client disconnected");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let blocking = matches!(&request, Request::Execute { command } if command.is_blocking());
        if !blocking {
            let response = handle_request(&store, request).await;
            protocol::write_response(&mut writer, &response, io_timeout).await?;
            continue;
        }

        // A client that gives up on a blocking pop closes its socket; stop
        // waiting so the pop cannot take an item nobody will receive.
        let response = tokio::select! {
            biased;
            response = handle_request(&store, request) => response,
            _ = peer_closed(&mut reader) => {
                debug!("client left during a blocking request");
                return Ok(());
            }
        };
        if let Response::Reply {
            reply: Reply::Popped(Some((key, value))),
        } = &response
        {
            if has_closed(&mut reader).await {
                requeue(&store, key, value).await;
                return Ok(());
            }
        }
        if let Err(e) = protocol::write_response(&mut writer, &response, io_timeout).await {
            if let Response::Reply {
                reply: Reply::Popped(Some((key, value))),
            } = &response
            {
                requeue(&store, key, value).await;
            }
            return Err(e.into());
        }
    }
}

/// Resolves once the client has closed its end of the connection
async fn peer_closed(reader: &mut OwnedReadHalf) {
    let mut byte = [0u8; 1];
    match reader.peek(&mut byte).await {
        Ok(0) | Err(_) => {}
        // Data pending means the client is still there
        Ok(_) => std::future::pending().await,
    }
}

/// Whether the client has already closed, without waiting
async fn has_closed(reader: &mut OwnedReadHalf) -> bool {
    tokio::time::timeout(Duration::ZERO, peer_closed(reader))
        .await
        .is_ok()
}

/// Put an undelivered item back at the head of its list
async fn requeue(store: &SharedStore, key: &str, value: &[u8]) {
    let command = Command::LPush {
        key: key.to_string(),
        values: vec![value.to_vec()],
    };
    match store.execute(command).await {
        Ok(_) => debug!(key, "requeued undelivered item"),
        Err(e) => error!(key, error = %e, "failed to requeue undelivered item"),
    }
}

async fn handle_request(store: &SharedStore, request: Request) -> Response {
    match request {
        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(client = %version, server = PROTOCOL_VERSION, "protocol version mismatch");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }
        }
        Request::Execute { command } => match store.execute(command).await {
            Ok(reply) => Response::Reply { reply },
            Err(e) => Response::Failed {
                failure: Failure::from(&e),
            },
        },
    }
}
