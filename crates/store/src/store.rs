// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The backing-store contract

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::{Command, Reply};
use crate::error::StoreError;
use crate::script::{Script, ScriptReply};

/// A key/list/hash/set store reachable by every worker
///
/// Implementations must execute each [`Command`] atomically with respect to
/// every other command, and [`Command::Eval`] scripts as one indivisible step.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError>;
}

/// Store handle shared by every primitive bound to it
pub type SharedStore = Arc<dyn Store>;

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        (**self).execute(command).await
    }
}

fn unit(reply: Reply, command: &str) -> Result<(), StoreError> {
    match reply {
        Reply::Ok | Reply::Pong => Ok(()),
        _ => Err(StoreError::unexpected(command)),
    }
}

fn int(reply: Reply, command: &str) -> Result<i64, StoreError> {
    match reply {
        Reply::Int(n) => Ok(n),
        _ => Err(StoreError::unexpected(command)),
    }
}

fn count(reply: Reply, command: &str) -> Result<u64, StoreError> {
    int(reply, command).map(|n| u64::try_from(n).unwrap_or(0))
}

fn boolean(reply: Reply, command: &str) -> Result<bool, StoreError> {
    match reply {
        Reply::Bool(b) => Ok(b),
        _ => Err(StoreError::unexpected(command)),
    }
}

fn value(reply: Reply, command: &str) -> Result<Option<Vec<u8>>, StoreError> {
    match reply {
        Reply::Value(v) => Ok(v),
        _ => Err(StoreError::unexpected(command)),
    }
}

fn values(reply: Reply, command: &str) -> Result<Vec<Vec<u8>>, StoreError> {
    match reply {
        Reply::Values(v) => Ok(v),
        _ => Err(StoreError::unexpected(command)),
    }
}

fn keys(reply: Reply, command: &str) -> Result<Vec<String>, StoreError> {
    match reply {
        Reply::Keys(k) => Ok(k),
        _ => Err(StoreError::unexpected(command)),
    }
}

fn entries(reply: Reply, command: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
    match reply {
        Reply::Entries(e) => Ok(e),
        _ => Err(StoreError::unexpected(command)),
    }
}

/// Parse a counter stored in the store's decimal encoding
pub fn parse_int(key: &str, raw: &[u8]) -> Result<i64, StoreError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| StoreError::NotAnInteger(key.to_string()))
}

/// Typed helpers over [`Store::execute`]
#[async_trait]
pub trait StoreExt: Store {
    async fn ping(&self) -> Result<(), StoreError> {
        unit(self.execute(Command::Ping).await?, "ping")
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let reply = self.execute(Command::Get { key: key.to_string() }).await?;
        value(reply, "get")
    }

    /// Read a counter; `None` when the key does not exist
    async fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError> {
        match self.get(key).await? {
            Some(raw) => parse_int(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let reply = self
            .execute(Command::Set {
                key: key.to_string(),
                value,
            })
            .await?;
        unit(reply, "set")
    }

    async fn set_int(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.set(key, value.to_string().into_bytes()).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let reply = self
            .execute(Command::IncrBy {
                key: key.to_string(),
                delta,
            })
            .await?;
        int(reply, "incrby")
    }

    async fn del(&self, keys: &[String]) -> Result<u64, StoreError> {
        let reply = self
            .execute(Command::Del {
                keys: keys.to_vec(),
            })
            .await?;
        count(reply, "del")
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let reply = self
            .execute(Command::Exists {
                key: key.to_string(),
            })
            .await?;
        boolean(reply, "exists")
    }

    async fn rpush(&self, key: &str, values: Vec<Vec<u8>>) -> Result<u64, StoreError> {
        let reply = self
            .execute(Command::RPush {
                key: key.to_string(),
                values,
            })
            .await?;
        count(reply, "rpush")
    }

    async fn lpush(&self, key: &str, values: Vec<Vec<u8>>) -> Result<u64, StoreError> {
        let reply = self
            .execute(Command::LPush {
                key: key.to_string(),
                values,
            })
            .await?;
        count(reply, "lpush")
    }

    async fn lpop(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let reply = self.execute(Command::LPop { key: key.to_string() }).await?;
        value(reply, "lpop")
    }

    async fn rpop(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let reply = self.execute(Command::RPop { key: key.to_string() }).await?;
        value(reply, "rpop")
    }

    /// Blocking pop from the head of the first non-empty list
    async fn blpop(
        &self,
        keys: &[String],
        timeout: Option<Duration>,
    ) -> Result<Option<(String, Vec<u8>)>, StoreError> {
        let reply = self
            .execute(Command::BLPop {
                keys: keys.to_vec(),
                timeout,
            })
            .await?;
        match reply {
            Reply::Popped(p) => Ok(p),
            _ => Err(StoreError::unexpected("blpop")),
        }
    }

    async fn llen(&self, key: &str) -> Result<u64, StoreError> {
        let reply = self.execute(Command::LLen { key: key.to_string() }).await?;
        count(reply, "llen")
    }

    async fn lindex(&self, key: &str, index: i64) -> Result<Option<Vec<u8>>, StoreError> {
        let reply = self
            .execute(Command::LIndex {
                key: key.to_string(),
                index,
            })
            .await?;
        value(reply, "lindex")
    }

    async fn lset(&self, key: &str, index: i64, value: Vec<u8>) -> Result<(), StoreError> {
        let reply = self
            .execute(Command::LSet {
                key: key.to_string(),
                index,
                value,
            })
            .await?;
        unit(reply, "lset")
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>, StoreError> {
        let reply = self
            .execute(Command::LRange {
                key: key.to_string(),
                start,
                stop,
            })
            .await?;
        values(reply, "lrange")
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        let reply = self
            .execute(Command::LTrim {
                key: key.to_string(),
                start,
                stop,
            })
            .await?;
        unit(reply, "ltrim")
    }

    async fn lrem(&self, key: &str, count_: i64, value: Vec<u8>) -> Result<u64, StoreError> {
        let reply = self
            .execute(Command::LRem {
                key: key.to_string(),
                count: count_,
                value,
            })
            .await?;
        count(reply, "lrem")
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let reply = self
            .execute(Command::HGet {
                key: key.to_string(),
                field: field.to_string(),
            })
            .await?;
        value(reply, "hget")
    }

    /// Set several fields; returns how many were newly created
    async fn hset(&self, key: &str, fields: Vec<(String, Vec<u8>)>) -> Result<u64, StoreError> {
        let reply = self
            .execute(Command::HSet {
                key: key.to_string(),
                entries: fields,
            })
            .await?;
        count(reply, "hset")
    }

    async fn hsetnx(&self, key: &str, field: &str, value: Vec<u8>) -> Result<bool, StoreError> {
        let reply = self
            .execute(Command::HSetNx {
                key: key.to_string(),
                field: field.to_string(),
                value,
            })
            .await?;
        boolean(reply, "hsetnx")
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<u64, StoreError> {
        let reply = self
            .execute(Command::HDel {
                key: key.to_string(),
                fields: fields.to_vec(),
            })
            .await?;
        count(reply, "hdel")
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let reply = self
            .execute(Command::HExists {
                key: key.to_string(),
                field: field.to_string(),
            })
            .await?;
        boolean(reply, "hexists")
    }

    async fn hlen(&self, key: &str) -> Result<u64, StoreError> {
        let reply = self.execute(Command::HLen { key: key.to_string() }).await?;
        count(reply, "hlen")
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let reply = self.execute(Command::HKeys { key: key.to_string() }).await?;
        keys(reply, "hkeys")
    }

    async fn hvals(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let reply = self.execute(Command::HVals { key: key.to_string() }).await?;
        values(reply, "hvals")
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let reply = self
            .execute(Command::HGetAll {
                key: key.to_string(),
            })
            .await?;
        entries(reply, "hgetall")
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        let reply = self
            .execute(Command::SAdd {
                key: key.to_string(),
                members: members.to_vec(),
            })
            .await?;
        count(reply, "sadd")
    }

    async fn srem(&self, key: &str, members: &[String]) -> Result<u64, StoreError> {
        let reply = self
            .execute(Command::SRem {
                key: key.to_string(),
                members: members.to_vec(),
            })
            .await?;
        count(reply, "srem")
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let reply = self
            .execute(Command::SMembers {
                key: key.to_string(),
            })
            .await?;
        keys(reply, "smembers")
    }

    async fn eval(&self, script: Script) -> Result<ScriptReply, StoreError> {
        let name = script.name();
        match self.execute(Command::Eval { script }).await? {
            Reply::Script(outcome) => Ok(outcome),
            _ => Err(StoreError::unexpected(name)),
        }
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
