// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Merkle inclusion proofs (BLAKE3).
//!
//! Used to trust persona bindings handed out by the registry: the registry
//! returns the signer set together with a proof that `(persona, signers)` is a
//! leaf of the tree committed to by `root`.
//!
//! # Hashing
//! ```text
//! leaf  = H(0x00 || len(key) u32 LE || key || len(value) u32 LE || value)
//! inner = H(0x01 || left || right)
//! ```
//! An odd node at the end of a level is carried up unchanged.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{KernelError, Result};

pub type Hash = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const INNER_PREFIX: u8 = 0x01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// One step of the path from leaf to root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// Which side the sibling sits on.
    pub side: Side,
    pub sibling: Hash,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub steps: Vec<ProofStep>,
}

pub fn leaf_hash(key: &[u8], value: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(&(key.len() as u32).to_le_bytes());
    hasher.update(key);
    hasher.update(&(value.len() as u32).to_le_bytes());
    hasher.update(value);
    *hasher.finalize().as_bytes()
}

fn inner_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[INNER_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

impl MerkleProof {
    /// Fold the path starting from `leaf`.
    pub fn compute_root(&self, leaf: Hash) -> Hash {
        self.steps.iter().fold(leaf, |acc, step| match step.side {
            Side::Left => inner_hash(&step.sibling, &acc),
            Side::Right => inner_hash(&acc, &step.sibling),
        })
    }
}

/// Check that `(key, value)` is committed to by `root`.
pub fn verify_inclusion(root: &[u8], key: &[u8], value: &[u8], proof: &MerkleProof) -> Result<()> {
    let computed = proof.compute_root(leaf_hash(key, value));
    if computed.as_slice() == root {
        Ok(())
    } else {
        Err(KernelError::ProofRejected)
    }
}

/// Canonical encoding of a signer list, the value proven for a persona.
pub fn canonical_signers(signers: &[Vec<u8>]) -> Result<Vec<u8>> {
    codec::encode(&signers)
}

/// Tree over an ordered set of key/value leaves.
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    pub fn new<K: AsRef<[u8]>, V: AsRef<[u8]>>(entries: &[(K, V)]) -> Self {
        let leaves: Vec<Hash> = entries
            .iter()
            .map(|(k, v)| leaf_hash(k.as_ref(), v.as_ref()))
            .collect();

        let mut levels = vec![leaves];
        while levels.last().map_or(false, |l| l.len() > 1) {
            let next = levels
                .last()
                .map(|level| {
                    level
                        .chunks(2)
                        .map(|pair| match pair.get(1) {
                            Some(right) => inner_hash(&pair[0], right),
                            // Odd node: promoted unchanged.
                            None => pair[0],
                        })
                        .collect()
                })
                .unwrap_or_default();
            levels.push(next);
        }
        Self { levels }
    }

    /// Root hash; `None` for an empty tree.
    pub fn root(&self) -> Option<Hash> {
        self.levels.last().and_then(|l| l.first().copied())
    }

    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.len() {
            return None;
        }
        let mut steps = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = idx ^ 1;
            if sibling < level.len() {
                let side = if sibling < idx { Side::Left } else { Side::Right };
                steps.push(ProofStep { side, sibling: level[sibling] });
            }
            idx /= 2;
        }
        Some(MerkleProof { steps })
    }
}
