// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! tessera-kernel: deterministic data model for single-writer shard replication.
//!
//! Ticks, epochs, signed commands and snapshots, the `ShardEngine` contract,
//! and the cryptographic primitives (Ed25519 envelopes, BLAKE3 merkle proofs)
//! the runtime builds on. No I/O and no async live here.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod proof;
pub mod types;
pub mod verify;

pub use engine::ShardEngine;
pub use error::{KernelError, KernelResult};

#[cfg(test)]
pub mod tests;
