// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store commands and their replies
//!
//! Every backend executes the same closed set of commands. Compound
//! check-then-act sequences go through [`Command::Eval`] so the backend can
//! run them indivisibly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::script::{Script, ScriptReply};

/// A single operation against the backing store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Ping,

    // Strings and counters
    Get { key: String },
    Set { key: String, value: Vec<u8> },
    IncrBy { key: String, delta: i64 },
    Del { keys: Vec<String> },
    Exists { key: String },

    // Lists
    RPush { key: String, values: Vec<Vec<u8>> },
    LPush { key: String, values: Vec<Vec<u8>> },
    LPop { key: String },
    RPop { key: String },
    /// Pop from the head of the first non-empty list, waiting up to `timeout`
    /// (forever when `None`)
    BLPop {
        keys: Vec<String>,
        timeout: Option<Duration>,
    },
    LLen { key: String },
    LIndex { key: String, index: i64 },
    LSet { key: String, index: i64, value: Vec<u8> },
    /// Inclusive range; negative indices count from the tail
    LRange { key: String, start: i64, stop: i64 },
    LTrim { key: String, start: i64, stop: i64 },
    /// Remove up to `count` occurrences (all when 0, from the tail when negative)
    LRem { key: String, count: i64, value: Vec<u8> },

    // Hashes
    HGet { key: String, field: String },
    HSet { key: String, entries: Vec<(String, Vec<u8>)> },
    HSetNx { key: String, field: String, value: Vec<u8> },
    HDel { key: String, fields: Vec<String> },
    HExists { key: String, field: String },
    HLen { key: String },
    HKeys { key: String },
    HVals { key: String },
    HGetAll { key: String },

    // Sets
    SAdd { key: String, members: Vec<String> },
    SRem { key: String, members: Vec<String> },
    SMembers { key: String },

    /// Run a compound operation atomically
    Eval { script: Script },
}

impl Command {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::IncrBy { .. } => "incrby",
            Command::Del { .. } => "del",
            Command::Exists { .. } => "exists",
            Command::RPush { .. } => "rpush",
            Command::LPush { .. } => "lpush",
            Command::LPop { .. } => "lpop",
            Command::RPop { .. } => "rpop",
            Command::BLPop { .. } => "blpop",
            Command::LLen { .. } => "llen",
            Command::LIndex { .. } => "lindex",
            Command::LSet { .. } => "lset",
            Command::LRange { .. } => "lrange",
            Command::LTrim { .. } => "ltrim",
            Command::LRem { .. } => "lrem",
            Command::HGet { .. } => "hget",
            Command::HSet { .. } => "hset",
            Command::HSetNx { .. } => "hsetnx",
            Command::HDel { .. } => "hdel",
            Command::HExists { .. } => "hexists",
            Command::HLen { .. } => "hlen",
            Command::HKeys { .. } => "hkeys",
            Command::HVals { .. } => "hvals",
            Command::HGetAll { .. } => "hgetall",
            Command::SAdd { .. } => "sadd",
            Command::SRem { .. } => "srem",
            Command::SMembers { .. } => "smembers",
            Command::Eval { script } => script.name(),
        }
    }

    /// Whether the command may park the connection waiting for data
    pub fn is_blocking(&self) -> bool {
        matches!(self, Command::BLPop { .. })
    }
}

/// Result of a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", content = "data", rename_all = "snake_case")]
pub enum Reply {
    Ok,
    Pong,
    Int(i64),
    Bool(bool),
    Value(Option<Vec<u8>>),
    Values(Vec<Vec<u8>>),
    Keys(Vec<String>),
    Entries(Vec<(String, Vec<u8>)>),
    Popped(Option<(String, Vec<u8>)>),
    Script(ScriptReply),
}
