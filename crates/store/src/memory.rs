// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process store backend
//!
//! Holds every entry behind one mutex, so each command and each script is
//! trivially atomic. Blocking pops park on a [`Notify`] that is signalled
//! after any command capable of growing a list.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::command::{Command, Reply};
use crate::error::StoreError;
use crate::script::{Script, ScriptReply};
use crate::store::{parse_int, Store};

#[derive(Debug, Clone)]
enum Entry {
    Bytes(Vec<u8>),
    List(VecDeque<Vec<u8>>),
    Hash(BTreeMap<String, Vec<u8>>),
    Set(BTreeSet<String>),
}

impl Entry {
    fn is_empty_container(&self) -> bool {
        match self {
            Entry::Bytes(_) => false,
            Entry::List(l) => l.is_empty(),
            Entry::Hash(h) => h.is_empty(),
            Entry::Set(s) => s.is_empty(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
}

/// Store backend living in the current process
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    pushed: Arc<Notify>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of every live key
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn wait_pop(
        &self,
        keys: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<Reply, StoreError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let popped = self.lock().pop_first(&keys)?;
            if popped.is_some() {
                return Ok(Reply::Popped(popped));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(Reply::Popped(None));
                    }
                }
                None => notified.await,
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        if let Command::BLPop { keys, timeout } = command {
            return self.wait_pop(keys, timeout).await;
        }

        let grows_lists = matches!(
            command,
            Command::RPush { .. } | Command::LPush { .. } | Command::Eval { .. }
        );
        let reply = self.lock().apply(command);
        if grows_lists {
            self.pushed.notify_waiters();
        }
        reply
    }
}

/// Resolve a Redis-style inclusive range against a list of `len` elements
fn inclusive_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Resolve a single index, negative counting from the tail
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Clamp a Python-style slice bound into `0..=len`
fn clamp_bound(len: usize, bound: Option<i64>, default: usize) -> usize {
    match bound {
        None => default,
        Some(b) if b < 0 => (len as i64 + b).max(0) as usize,
        Some(b) => (b as usize).min(len),
    }
}

impl Inner {
    fn prune(&mut self, key: &str) {
        if self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_empty_container())
        {
            self.entries.remove(key);
        }
    }

    fn bytes(&self, key: &str) -> Result<Option<&Vec<u8>>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Bytes(b)) => Ok(Some(b)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn int(&self, key: &str) -> Result<Option<i64>, StoreError> {
        self.bytes(key)?.map(|raw| parse_int(key, raw)).transpose()
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.entries
            .insert(key.to_string(), Entry::Bytes(value.to_string().into_bytes()));
    }

    fn incr_by(&mut self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let current = self.int(key)?.unwrap_or(0);
        let next = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::NotAnInteger(key.to_string()))?;
        self.set_int(key, next);
        Ok(next)
    }

    fn list(&self, key: &str) -> Result<Option<&VecDeque<Vec<u8>>>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::List(l)) => Ok(Some(l)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn list_mut(&mut self, key: &str) -> Result<Option<&mut VecDeque<Vec<u8>>>, StoreError> {
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(Entry::List(l)) => Ok(Some(l)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn list_entry(&mut self, key: &str) -> Result<&mut VecDeque<Vec<u8>>, StoreError> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(VecDeque::new()));
        match entry {
            Entry::List(l) => Ok(l),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn list_snapshot(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .list(key)?
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn rpush(&mut self, key: &str, values: Vec<Vec<u8>>) -> Result<usize, StoreError> {
        let list = self.list_entry(key)?;
        list.extend(values);
        let len = list.len();
        self.prune(key);
        Ok(len)
    }

    fn lpop(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let popped = self.list_mut(key)?.and_then(|l| l.pop_front());
        self.prune(key);
        Ok(popped)
    }

    fn lrem(&mut self, key: &str, count: i64, value: &[u8]) -> Result<usize, StoreError> {
        let Some(list) = self.list_mut(key)? else {
            return Ok(0);
        };
        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs() as usize
        };
        let mut removed = 0;
        if count >= 0 {
            let mut i = 0;
            while i < list.len() && removed < limit {
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < limit {
                i -= 1;
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }
        self.prune(key);
        Ok(removed)
    }

    fn pop_first(&mut self, keys: &[String]) -> Result<Option<(String, Vec<u8>)>, StoreError> {
        for key in keys {
            if let Some(value) = self.lpop(key)? {
                return Ok(Some((key.clone(), value)));
            }
        }
        Ok(None)
    }

    fn hash(&self, key: &str) -> Result<Option<&BTreeMap<String, Vec<u8>>>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Hash(h)) => Ok(Some(h)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn hash_mut(
        &mut self,
        key: &str,
    ) -> Result<Option<&mut BTreeMap<String, Vec<u8>>>, StoreError> {
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(Entry::Hash(h)) => Ok(Some(h)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn hash_entry(&mut self, key: &str) -> Result<&mut BTreeMap<String, Vec<u8>>, StoreError> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(BTreeMap::new()));
        match entry {
            Entry::Hash(h) => Ok(h),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn set(&self, key: &str) -> Result<Option<&BTreeSet<String>>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Set(s)) => Ok(Some(s)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn set_entry(&mut self, key: &str) -> Result<&mut BTreeSet<String>, StoreError> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()));
        match entry {
            Entry::Set(s) => Ok(s),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn srem(&mut self, key: &str, members: &[String]) -> Result<usize, StoreError> {
        let removed = match self.entries.get_mut(key) {
            None => 0,
            Some(Entry::Set(s)) => members.iter().filter(|m| s.remove(m.as_str())).count(),
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };
        self.prune(key);
        Ok(removed)
    }

    fn apply(&mut self, command: Command) -> Result<Reply, StoreError> {
        let reply = match command {
            Command::Ping => Reply::Pong,

            Command::Get { key } => Reply::Value(self.bytes(&key)?.cloned()),
            Command::Set { key, value } => {
                self.entries.insert(key, Entry::Bytes(value));
                Reply::Ok
            }
            Command::IncrBy { key, delta } => Reply::Int(self.incr_by(&key, delta)?),
            Command::Del { keys } => {
                let removed = keys
                    .iter()
                    .filter(|k| self.entries.remove(k.as_str()).is_some())
                    .count();
                Reply::Int(removed as i64)
            }
            Command::Exists { key } => Reply::Bool(self.entries.contains_key(&key)),

            Command::RPush { key, values } => Reply::Int(self.rpush(&key, values)? as i64),
            Command::LPush { key, values } => {
                let list = self.list_entry(&key)?;
                for value in values {
                    list.push_front(value);
                }
                let len = list.len();
                self.prune(&key);
                Reply::Int(len as i64)
            }
            Command::LPop { key } => Reply::Value(self.lpop(&key)?),
            Command::RPop { key } => {
                let popped = self.list_mut(&key)?.and_then(|l| l.pop_back());
                self.prune(&key);
                Reply::Value(popped)
            }
            Command::BLPop { keys, .. } => Reply::Popped(self.pop_first(&keys)?),
            Command::LLen { key } => Reply::Int(self.list(&key)?.map_or(0, |l| l.len()) as i64),
            Command::LIndex { key, index } => {
                let value = self
                    .list(&key)?
                    .and_then(|l| resolve_index(l.len(), index).map(|i| l[i].clone()));
                Reply::Value(value)
            }
            Command::LSet { key, index, value } => {
                let slot = self
                    .list_mut(&key)?
                    .and_then(|l| {
                        let i = resolve_index(l.len(), index)?;
                        l.get_mut(i)
                    })
                    .ok_or_else(|| StoreError::IndexOutOfRange {
                        key: key.clone(),
                        index,
                    })?;
                *slot = value;
                Reply::Ok
            }
            Command::LRange { key, start, stop } => {
                let values = match self.list(&key)? {
                    Some(l) => match inclusive_range(l.len(), start, stop) {
                        Some((from, to)) => l.range(from..=to).cloned().collect(),
                        None => Vec::new(),
                    },
                    None => Vec::new(),
                };
                Reply::Values(values)
            }
            Command::LTrim { key, start, stop } => {
                if let Some(list) = self.list_mut(&key)? {
                    match inclusive_range(list.len(), start, stop) {
                        Some((from, to)) => {
                            list.truncate(to + 1);
                            list.drain(..from);
                        }
                        None => list.clear(),
                    }
                }
                self.prune(&key);
                Reply::Ok
            }
            Command::LRem { key, count, value } => {
                Reply::Int(self.lrem(&key, count, &value)? as i64)
            }

            Command::HGet { key, field } => {
                Reply::Value(self.hash(&key)?.and_then(|h| h.get(&field).cloned()))
            }
            Command::HSet { key, entries } => {
                let hash = self.hash_entry(&key)?;
                let created = entries
                    .into_iter()
                    .filter(|(field, value)| hash.insert(field.clone(), value.clone()).is_none())
                    .count();
                self.prune(&key);
                Reply::Int(created as i64)
            }
            Command::HSetNx { key, field, value } => {
                let hash = self.hash_entry(&key)?;
                let created = !hash.contains_key(&field);
                if created {
                    hash.insert(field, value);
                }
                Reply::Bool(created)
            }
            Command::HDel { key, fields } => {
                let removed = match self.hash_mut(&key)? {
                    Some(h) => fields.iter().filter(|f| h.remove(f.as_str()).is_some()).count(),
                    None => 0,
                };
                self.prune(&key);
                Reply::Int(removed as i64)
            }
            Command::HExists { key, field } => {
                Reply::Bool(self.hash(&key)?.is_some_and(|h| h.contains_key(&field)))
            }
            Command::HLen { key } => Reply::Int(self.hash(&key)?.map_or(0, |h| h.len()) as i64),
            Command::HKeys { key } => Reply::Keys(
                self.hash(&key)?
                    .map(|h| h.keys().cloned().collect())
                    .unwrap_or_default(),
            ),
            Command::HVals { key } => Reply::Values(
                self.hash(&key)?
                    .map(|h| h.values().cloned().collect())
                    .unwrap_or_default(),
            ),
            Command::HGetAll { key } => Reply::Entries(
                self.hash(&key)?
                    .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default(),
            ),

            Command::SAdd { key, members } => {
                let set = self.set_entry(&key)?;
                let added = members.into_iter().filter(|m| set.insert(m.clone())).count();
                self.prune(&key);
                Reply::Int(added as i64)
            }
            Command::SRem { key, members } => Reply::Int(self.srem(&key, &members)? as i64),
            Command::SMembers { key } => Reply::Keys(
                self.set(&key)?
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default(),
            ),

            Command::Eval { script } => Reply::Script(self.run(script)?),
        };
        Ok(reply)
    }

    fn signal_waiters(&mut self, list: &str, limit: u64, signal: &[u8]) -> Result<u64, StoreError> {
        let mut woken = 0;
        while woken < limit {
            let Some(raw) = self.lpop(list)? else {
                break;
            };
            let wake_key = String::from_utf8_lossy(&raw).into_owned();
            self.rpush(&wake_key, vec![signal.to_vec()])?;
            woken += 1;
        }
        Ok(woken)
    }

    fn run(&mut self, script: Script) -> Result<ScriptReply, StoreError> {
        let reply = match script {
            Script::SemaphoreAcquire {
                counter,
                waiters,
                wake_key,
            } => {
                if self.incr_by(&counter, -1)? >= 0 {
                    ScriptReply::Acquired
                } else {
                    self.rpush(&waiters, vec![wake_key.into_bytes()])?;
                    ScriptReply::Queued
                }
            }
            Script::SemaphoreTryAcquire { counter } => {
                let current = self.int(&counter)?.unwrap_or(0);
                if current > 0 {
                    self.set_int(&counter, current - 1);
                    ScriptReply::Acquired
                } else {
                    ScriptReply::Unavailable
                }
            }
            Script::SemaphoreRelease {
                counter,
                waiters,
                max,
                signal,
            } => {
                let current = self.int(&counter)?.unwrap_or(0);
                if current >= max {
                    ScriptReply::AtBound
                } else {
                    self.set_int(&counter, current + 1);
                    if current < 0 && self.signal_waiters(&waiters, 1, &signal)? == 1 {
                        ScriptReply::HandedOff
                    } else {
                        ScriptReply::Released
                    }
                }
            }
            Script::SemaphoreCancel {
                counter,
                waiters,
                wake_key,
            } => {
                if self.lrem(&waiters, 1, wake_key.as_bytes())? > 0 {
                    self.incr_by(&counter, 1)?;
                    ScriptReply::Cancelled
                } else {
                    ScriptReply::Signalled
                }
            }
            Script::Notify {
                list,
                count,
                signal,
            } => ScriptReply::Woken(self.signal_waiters(&list, count, &signal)?),
            Script::NotifyAll { list, signal } => {
                ScriptReply::Woken(self.signal_waiters(&list, u64::MAX, &signal)?)
            }
            Script::CancelWait { list, wake_key } => {
                if self.lrem(&list, 1, wake_key.as_bytes())? > 0 {
                    ScriptReply::Cancelled
                } else {
                    ScriptReply::Signalled
                }
            }
            Script::DecrementIfPositive { counter } => {
                let current = self.int(&counter)?.unwrap_or(0);
                if current > 0 {
                    self.set_int(&counter, current - 1);
                    ScriptReply::Count(current - 1)
                } else {
                    ScriptReply::Unavailable
                }
            }
            Script::Incref { refcount } => match self.int(&refcount)? {
                Some(_) => ScriptReply::Count(self.incr_by(&refcount, 1)?),
                None => ScriptReply::Missing,
            },
            Script::Decref {
                refcount,
                keys,
                directory,
                handle,
            } => match self.int(&refcount)? {
                None => ScriptReply::Missing,
                Some(current) if current > 1 => {
                    self.set_int(&refcount, current - 1);
                    ScriptReply::Count(current - 1)
                }
                Some(_) => {
                    for key in &keys {
                        self.entries.remove(key);
                    }
                    self.entries.remove(&refcount);
                    if let Some(directory) = directory {
                        self.srem(&directory, &[handle])?;
                    }
                    ScriptReply::Count(0)
                }
            },
            Script::ExtendList { dest, src, repeat } => {
                let source = self.list_snapshot(&src)?;
                let list = self.list_entry(&dest)?;
                for _ in 0..repeat {
                    list.extend(source.iter().cloned());
                }
                let len = list.len();
                self.prune(&dest);
                ScriptReply::Count(len as i64)
            }
            Script::ListSplice {
                key,
                start,
                stop,
                values,
            } => {
                let list = self.list_entry(&key)?;
                let len = list.len();
                let from = clamp_bound(len, start, 0);
                let to = clamp_bound(len, stop, len).max(from);
                let tail = list.split_off(to);
                list.truncate(from);
                list.extend(values);
                list.extend(tail);
                let len = list.len();
                self.prune(&key);
                ScriptReply::Count(len as i64)
            }
            Script::ListRemoveAt { key, index } => {
                let removed = match self.list_mut(&key)? {
                    Some(l) => resolve_index(l.len(), index).and_then(|i| l.remove(i)),
                    None => None,
                };
                self.prune(&key);
                ScriptReply::Removed(removed)
            }
            Script::ListReplace { key, values } => {
                let len = values.len();
                self.entries
                    .insert(key.clone(), Entry::List(values.into_iter().collect()));
                self.prune(&key);
                ScriptReply::Count(len as i64)
            }
            Script::HashTake { key, field } => {
                let taken = match self.hash_mut(&key)? {
                    Some(h) => match field {
                        Some(field) => h.remove(&field).map(|v| (field, v)),
                        None => h.pop_first(),
                    },
                    None => None,
                };
                self.prune(&key);
                ScriptReply::Taken(taken)
            }
        };
        Ok(reply)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
