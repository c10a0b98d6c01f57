// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};
use tessera_kernel::proof::MerkleProof;

use crate::config::ShardMode;
use crate::errors::RegistryError;

/// Body of a successful command submission.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CommandAccepted {}

#[derive(Serialize, Deserialize, Debug)]
pub struct ShardStateResponse {
    pub phase: String,
    pub mode: ShardMode,
    pub tick_height: u64,
    pub epoch_height: u64,
    pub last_published_seq: u64,
    pub snapshots_written: u64,
    pub snapshot_failures: u64,
    pub last_snapshot_error: Option<String>,
}

// Registry wire types

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersonaQuery {
    pub persona: String,
    /// Unix milliseconds.
    pub timestamp: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersonaRecord {
    pub persona: String,
    #[serde(with = "tessera_kernel::types::bytes::list")]
    pub signers: Vec<Vec<u8>>,
    /// Unix milliseconds after which the binding must be re-fetched.
    pub expires_at: u64,
    pub version: i64,
    pub proof: MerkleProof,
    #[serde(with = "tessera_kernel::types::bytes")]
    pub root: Vec<u8>,
}

impl PersonaRecord {
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.persona.is_empty() {
            return Err(RegistryError::Schema("empty persona".into()));
        }
        if let Some(bad) = self.signers.iter().find(|s| s.len() != 32) {
            return Err(RegistryError::Schema(format!("signer key of {} bytes", bad.len())));
        }
        if self.root.len() != 32 {
            return Err(RegistryError::Schema(format!("merkle root of {} bytes", self.root.len())));
        }
        if self.version < 0 {
            return Err(RegistryError::Schema(format!("negative version {}", self.version)));
        }
        if self.expires_at == 0 {
            return Err(RegistryError::Schema("missing expiry".into()));
        }
        Ok(())
    }
}
