// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared-key challenge/response authentication
//!
//! The challenger sends `#CHALLENGE#` followed by a random nonce. The peer
//! answers with HMAC-SHA256(authkey, nonce) and the challenger replies
//! `#WELCOME#` or `#FAILURE#`. Servers run [`deliver_challenge`] then
//! [`answer_challenge`]; clients run them in the opposite order, so both
//! sides prove knowledge of the key.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const CHALLENGE: &[u8] = b"#CHALLENGE#";
pub const WELCOME: &[u8] = b"#WELCOME#";
pub const FAILURE: &[u8] = b"#FAILURE#";

/// Length of the random challenge nonce
pub const NONCE_LEN: usize = 20;

/// Largest message accepted during the handshake
const MAX_HANDSHAKE_MESSAGE: usize = 256;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("digest received was wrong")]
    DigestMismatch,
    #[error("digest sent was rejected")]
    Rejected,
    #[error("malformed handshake message: {0}")]
    Malformed(String),
    #[error("handshake message of {size} bytes exceeds {max}")]
    MessageTooLong { size: usize, max: usize },
    #[error("channel error: {0}")]
    Channel(String),
}

/// A bidirectional channel carrying discrete messages
#[async_trait]
pub trait MessageChannel: Send {
    async fn send_message(&mut self, data: &[u8]) -> Result<(), AuthError>;

    /// Receive one message, failing if it is longer than `max_len`
    async fn recv_message(&mut self, max_len: usize) -> Result<Vec<u8>, AuthError>;
}

fn digest(authkey: &[u8], nonce: &[u8]) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(authkey)
        .map_err(|e| AuthError::Malformed(format!("invalid key: {}", e)))?;
    mac.update(nonce);
    Ok(mac)
}

/// Challenge the peer to prove it holds `authkey`
pub async fn deliver_challenge<C: MessageChannel + ?Sized>(
    channel: &mut C,
    authkey: &[u8],
) -> Result<(), AuthError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut message = CHALLENGE.to_vec();
    message.extend_from_slice(&nonce);
    channel.send_message(&message).await?;

    let response = channel.recv_message(MAX_HANDSHAKE_MESSAGE).await?;
    if digest(authkey, &nonce)?.verify_slice(&response).is_ok() {
        channel.send_message(WELCOME).await?;
        Ok(())
    } else {
        tracing::warn!("peer failed authentication challenge");
        channel.send_message(FAILURE).await?;
        Err(AuthError::DigestMismatch)
    }
}

/// Answer a challenge sent by [`deliver_challenge`]
pub async fn answer_challenge<C: MessageChannel + ?Sized>(
    channel: &mut C,
    authkey: &[u8],
) -> Result<(), AuthError> {
    let message = channel.recv_message(MAX_HANDSHAKE_MESSAGE).await?;
    let nonce = message
        .strip_prefix(CHALLENGE)
        .ok_or_else(|| AuthError::Malformed("missing challenge prefix".to_string()))?;

    let response = digest(authkey, nonce)?.finalize().into_bytes();
    channel.send_message(&response).await?;

    let verdict = channel.recv_message(MAX_HANDSHAKE_MESSAGE).await?;
    if verdict == WELCOME {
        Ok(())
    } else {
        Err(AuthError::Rejected)
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
