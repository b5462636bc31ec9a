// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cumulus-store: the shared backing store behind every cumulus primitive
//!
//! This crate provides:
//! - The [`Store`] contract: a closed command set plus atomic [`Script`]s
//! - [`MemoryStore`], an in-process backend
//! - [`StoreServer`] and [`RemoteStore`], a TCP backend with optional
//!   shared-key authentication
//! - [`TracedStore`], a logging wrapper for any backend

pub mod auth;
pub mod command;
pub mod error;
pub mod memory;
pub mod protocol;
pub mod remote;
pub mod script;
pub mod server;
pub mod store;
pub mod traced;

pub use auth::{answer_challenge, deliver_challenge, AuthError, MessageChannel};
pub use command::{Command, Reply};
pub use error::{Failure, StoreError};
pub use memory::MemoryStore;
pub use protocol::ProtocolError;
pub use remote::{RemoteConfig, RemoteStore};
pub use script::{Script, ScriptReply};
pub use server::StoreServer;
pub use store::{parse_int, SharedStore, Store, StoreExt};
pub use traced::TracedStore;
