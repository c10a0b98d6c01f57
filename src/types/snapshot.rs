// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

/// Engine state as of the end of `tick_height`, which closed `epoch_height`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub epoch_height: u64,
    pub tick_height: u64,
    /// Unix milliseconds at capture.
    pub timestamp: u64,
    #[serde(with = "crate::types::bytes")]
    pub state_hash: Vec<u8>,
    /// Opaque `ShardEngine::snapshot` output.
    #[serde(with = "crate::types::bytes")]
    pub data: Vec<u8>,
}
