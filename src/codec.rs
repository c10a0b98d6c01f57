// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical binary encoding.
//!
//! Every byte string that is signed, hashed or replicated goes through
//! these two functions so leader and followers agree on the exact bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{KernelError, Result};

fn config() -> bincode::config::Configuration {
    bincode::config::standard()
}

/// Encode a value into its canonical byte form.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config()).map_err(|e| KernelError::Encode(e.to_string()))
}

/// Decode a value from its canonical byte form.
///
/// Trailing bytes are rejected: a canonical encoding has exactly one length.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, read) = bincode::serde::decode_from_slice::<T, _>(bytes, config())
        .map_err(|e| KernelError::Decode(e.to_string()))?;
    if read != bytes.len() {
        return Err(KernelError::Decode(format!(
            "{} trailing bytes after value",
            bytes.len() - read
        )));
    }
    Ok(value)
}
