// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between [`RemoteStore`](crate::RemoteStore) and
//! [`StoreServer`](crate::StoreServer)
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::auth::{AuthError, MessageChannel};
use crate::command::{Command, Reply};
use crate::error::Failure;

/// Protocol version exchanged in the hello
pub const PROTOCOL_VERSION: &str = "1";

/// Default per-message timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a single frame
pub const MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// Request from a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Hello { version: String },
    Execute { command: Command },
}

/// Response from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Hello { version: String },
    Reply { reply: Reply },
    Failed { failure: Failure },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out")]
    Timeout,
    #[error("message of {size} bytes exceeds limit of {max}")]
    MessageTooLarge { size: usize, max: usize },
    #[error("protocol version mismatch: ours {ours}, theirs {theirs}")]
    VersionMismatch { ours: String, theirs: String },
    #[error("unexpected response: {0}")]
    Unexpected(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a message to JSON (no length prefix)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(data)?)
}

/// Read one length-prefixed frame of at most `max_len` bytes
pub async fn read_message_limited<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_len: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
            _ => ProtocolError::Io(e),
        });
    }

    let size = u32::from_be_bytes(len_buf) as usize;
    if size > max_len {
        return Err(ProtocolError::MessageTooLarge { size, max: max_len });
    }

    let mut data = vec![0u8; size];
    reader.read_exact(&mut data).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
        _ => ProtocolError::Io(e),
    })?;
    Ok(data)
}

pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    read_message_limited(reader, MAX_MESSAGE_LEN).await
}

/// Write one frame with its length prefix
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let size = u32::try_from(data.len()).map_err(|_| ProtocolError::MessageTooLarge {
        size: data.len(),
        max: MAX_MESSAGE_LEN,
    })?;
    writer.write_all(&size.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_with_timeout<R, T>(reader: &mut R, timeout: Duration) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let data = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&data)
}

async fn write_with_timeout<W, T>(
    writer: &mut W,
    message: &T,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let data = encode(message)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    read_with_timeout(reader, timeout).await
}

pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    write_with_timeout(writer, request, timeout).await
}

pub async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Response, ProtocolError> {
    read_with_timeout(reader, timeout).await
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    write_with_timeout(writer, response, timeout).await
}

/// Framed byte stream usable for the authentication handshake
pub struct StreamChannel<'a, S> {
    stream: &'a mut S,
    timeout: Duration,
}

impl<'a, S> StreamChannel<'a, S> {
    pub fn new(stream: &'a mut S, timeout: Duration) -> Self {
        Self { stream, timeout }
    }
}

fn channel_error(e: ProtocolError) -> AuthError {
    match e {
        ProtocolError::MessageTooLarge { size, max } => AuthError::MessageTooLong { size, max },
        other => AuthError::Channel(other.to_string()),
    }
}

#[async_trait]
impl<S> MessageChannel for StreamChannel<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_message(&mut self, data: &[u8]) -> Result<(), AuthError> {
        tokio::time::timeout(self.timeout, write_message(&mut *self.stream, data))
            .await
            .map_err(|_| channel_error(ProtocolError::Timeout))?
            .map_err(channel_error)
    }

    async fn recv_message(&mut self, max_len: usize) -> Result<Vec<u8>, AuthError> {
        tokio::time::timeout(self.timeout, read_message_limited(&mut *self.stream, max_len))
            .await
            .map_err(|_| channel_error(ProtocolError::Timeout))?
            .map_err(channel_error)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
