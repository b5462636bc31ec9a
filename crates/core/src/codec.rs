// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Value encoding for everything stored or sent through the store

use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn encode_all<'a, T, I>(items: I) -> Result<Vec<Vec<u8>>, serde_json::Error>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().map(encode).collect()
}

pub fn decode_all<T: DeserializeOwned>(raw: &[Vec<u8>]) -> Result<Vec<T>, serde_json::Error> {
    raw.iter().map(|bytes| decode(bytes)).collect()
}
