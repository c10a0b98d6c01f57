// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Command signing and signature verification (Ed25519).
//!
//! The signature always covers `command_bytes` verbatim. Nothing is
//! re-encoded before verification, so a verifier never depends on encoder
//! stability for the bytes it checks.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::error::{KernelError, Result};
use crate::types::command::{AuthInfo, AuthMode, CommandRaw, SignedCommand};

/// Client-side signer.
pub struct CommandSigner {
    key: SigningKey,
}

impl CommandSigner {
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self { key: SigningKey::from_bytes(secret) }
    }

    /// The signer address: the 32-byte verifying key.
    pub fn address(&self) -> Vec<u8> {
        self.key.verifying_key().to_bytes().to_vec()
    }

    pub fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        self.key.sign(message).to_bytes().to_vec()
    }

    /// Encode `raw` canonically and sign the result.
    pub fn sign(&self, raw: &CommandRaw, mode: AuthMode) -> Result<SignedCommand> {
        let command_bytes = raw.to_bytes()?;
        Ok(SignedCommand {
            signature: self.sign_bytes(&command_bytes),
            auth_info: AuthInfo { mode, signer_address: self.address() },
            command_bytes,
        })
    }
}

fn verifying_key(signer_address: &[u8]) -> Result<VerifyingKey> {
    let bytes: &[u8; 32] = signer_address
        .try_into()
        .map_err(|_| KernelError::InvalidSignerAddress)?;
    VerifyingKey::from_bytes(bytes).map_err(|_| KernelError::InvalidSignerAddress)
}

/// Check an Ed25519 signature by `signer_address` over `message`.
pub fn verify_signature(signer_address: &[u8], signature: &[u8], message: &[u8]) -> Result<()> {
    let key = verifying_key(signer_address)?;
    let signature = Signature::from_slice(signature).map_err(|_| KernelError::InvalidSignature)?;
    key.verify_strict(message, &signature)
        .map_err(|_| KernelError::InvalidSignature)
}

/// Verify a wire envelope's signature against its own declared signer.
pub fn verify_envelope(command: &SignedCommand) -> Result<()> {
    verify_signature(
        &command.auth_info.signer_address,
        &command.signature,
        &command.command_bytes,
    )
}

/// BLAKE3 digest, the hash engines are expected to use for `state_hash`.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}
