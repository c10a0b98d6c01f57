// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Canonical encoding failed.
    #[error("encode error: {0}")]
    Encode(String),
    /// Canonical decoding failed (truncated, trailing bytes, bad layout).
    #[error("decode error: {0}")]
    Decode(String),
    /// Decoded value violates the schema.
    #[error("schema violation: {0}")]
    Schema(String),
    /// Signer address is not a valid Ed25519 verifying key.
    #[error("invalid signer address")]
    InvalidSignerAddress,
    /// Signature bytes are malformed or do not verify.
    #[error("invalid signature")]
    InvalidSignature,
    /// Merkle proof does not fold to the expected root.
    #[error("merkle proof rejected")]
    ProofRejected,
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
pub type Result<T> = KernelResult<T>;
