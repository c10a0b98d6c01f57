// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::HashMap;

use parking_lot::RwLock;
use tessera_kernel::proof::{canonical_signers, verify_inclusion, MerkleProof};

use crate::api::PersonaRecord;

/// A persona binding whose merkle proof has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaWithProof {
    pub id: String,
    pub signers: Vec<Vec<u8>>,
    pub expires_at: u64,
    pub version: i64,
    pub proof: MerkleProof,
    pub root: Vec<u8>,
}

impl PersonaWithProof {
    /// Check the registry's inclusion proof for `(persona, signers)`.
    pub fn verify(record: PersonaRecord) -> Result<Self, String> {
        let value = canonical_signers(&record.signers).map_err(|e| e.to_string())?;
        verify_inclusion(&record.root, record.persona.as_bytes(), &value, &record.proof)
            .map_err(|e| format!("persona {:?}: {}", record.persona, e))?;
        Ok(Self {
            id: record.persona,
            signers: record.signers,
            expires_at: record.expires_at,
            version: record.version,
            proof: record.proof,
            root: record.root,
        })
    }

    pub fn authorizes(&self, signer: &[u8]) -> bool {
        self.signers.iter().any(|s| s.as_slice() == signer)
    }
}

/// Verified persona bindings, read concurrently by request handlers.
#[derive(Default)]
pub struct PersonaCache {
    entries: RwLock<HashMap<String, PersonaWithProof>>,
}

impl PersonaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entry for `persona`, if any.
    pub fn get(&self, persona: &str, now: u64) -> Option<PersonaWithProof> {
        self.entries
            .read()
            .get(persona)
            .filter(|e| e.expires_at > now)
            .cloned()
    }

    /// Store `entry` unless a higher version is cached and still live at
    /// `now`. Returns the entry that ends up cached.
    pub fn insert(&self, entry: PersonaWithProof, now: u64) -> PersonaWithProof {
        let mut entries = self.entries.write();
        match entries.get(&entry.id) {
            Some(current) if current.version > entry.version && current.expires_at > now => {
                tracing::debug!(
                    persona = %entry.id,
                    cached = current.version,
                    fetched = entry.version,
                    "ignoring stale persona binding"
                );
                current.clone()
            }
            _ => {
                entries.insert(entry.id.clone(), entry.clone());
                entry
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
