// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Serde adapter for byte fields: hex in human-readable formats (JSON),
//! length-prefixed raw bytes in binary formats (bincode).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&hex::encode(bytes))
    } else {
        serde_bytes::serialize(bytes, serializer)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    if deserializer.is_human_readable() {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)
    } else {
        serde_bytes::ByteBuf::deserialize(deserializer).map(|b| b.into_vec())
    }
}

/// Same adapter for lists of byte strings (signer sets).
pub mod list {
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let human = serializer.is_human_readable();
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            if human {
                seq.serialize_element(&hex::encode(item))?;
            } else {
                seq.serialize_element(serde_bytes::Bytes::new(item))?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        if deserializer.is_human_readable() {
            let items = Vec::<String>::deserialize(deserializer)?;
            items
                .iter()
                .map(|s| hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom))
                .collect()
        } else {
            let items = Vec::<serde_bytes::ByteBuf>::deserialize(deserializer)?;
            Ok(items.into_iter().map(|b| b.into_vec()).collect())
        }
    }
}
