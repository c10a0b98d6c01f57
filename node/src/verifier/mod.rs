// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Command authentication.
//!
//! Pipeline, in order:
//! 1. decode and schema-check `command_bytes`
//! 2. target address must be this shard
//! 3. freshness window (leader only)
//! 4. replay cache lookup (leader only)
//! 5. signature, plus persona binding for persona-mode commands
//! 6. replay cache insert
//!
//! Followers skip 3 and 4: they apply what the leader already accepted, and
//! re-checking freshness against a later clock would reject committed input.

pub mod persona;
pub mod replay_cache;

use std::sync::Arc;

use tessera_kernel::config::{COMMAND_TTL_MS, MAX_CLOCK_DRIFT_MS, REPLAY_CACHE_GRACE_MS};
use tessera_kernel::types::{AuthMode, Command, ShardAddress, SignedCommand};
use tessera_kernel::verify::verify_envelope;

use crate::api::PersonaQuery;
use crate::errors::CommandError;
use crate::network::RegistryClient;

pub use persona::{PersonaCache, PersonaWithProof};
pub use replay_cache::ReplayCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Fresh submission to the leader.
    Leader,
    /// Command read back from a committed epoch.
    Replay,
}

pub struct CommandVerifier {
    address: ShardAddress,
    replay_cache: ReplayCache,
    personas: PersonaCache,
    registry: Option<Arc<dyn RegistryClient>>,
}

impl CommandVerifier {
    /// `registry` is `None` when persona verification is disabled.
    pub fn new(address: ShardAddress, registry: Option<Arc<dyn RegistryClient>>) -> Self {
        Self {
            address,
            replay_cache: ReplayCache::new(),
            personas: PersonaCache::new(),
            registry,
        }
    }

    pub fn address(&self) -> &ShardAddress {
        &self.address
    }

    pub fn replay_cache(&self) -> &ReplayCache {
        &self.replay_cache
    }

    pub fn personas(&self) -> &PersonaCache {
        &self.personas
    }

    /// Run the pipeline; `now` is unix milliseconds.
    pub async fn verify(
        &self,
        signed: &SignedCommand,
        mode: VerifyMode,
        now: u64,
    ) -> Result<Command, CommandError> {
        let command = Command::from_signed(signed.clone())
            .map_err(|e| CommandError::Malformed(e.to_string()))?;

        if command.decoded.body.address != self.address {
            return Err(CommandError::WrongShard(command.decoded.body.address.to_string()));
        }

        let timestamp = command.timestamp();
        if mode == VerifyMode::Leader {
            check_freshness(timestamp, now)?;
            if self.replay_cache.contains(&command.signature, now) {
                return Err(CommandError::Replayed);
            }
        }

        verify_envelope(signed).map_err(|e| CommandError::Unauthorized(e.to_string()))?;

        if command.auth_info.mode == AuthMode::Persona {
            self.authorize_persona(&command, now).await?;
        }

        match mode {
            VerifyMode::Leader => {
                let expires_at = now.saturating_add(COMMAND_TTL_MS + REPLAY_CACHE_GRACE_MS);
                if !self.replay_cache.insert_if_absent(&command.signature, expires_at, now) {
                    return Err(CommandError::Replayed);
                }
            }
            VerifyMode::Replay => {
                self.remember(&command, now);
            }
        }

        Ok(command)
    }

    /// Record the signature of a committed command while it could still be
    /// resubmitted, so a leader that caught up from the log refuses it.
    /// Returns whether it was recorded.
    pub fn remember(&self, command: &Command, now: u64) -> bool {
        let deadline = command.timestamp().saturating_add(COMMAND_TTL_MS);
        if now > deadline {
            return false;
        }
        let expires_at = deadline.saturating_add(REPLAY_CACHE_GRACE_MS);
        self.replay_cache.record(&command.signature, expires_at, now);
        true
    }

    async fn authorize_persona(&self, command: &Command, now: u64) -> Result<(), CommandError> {
        let Some(registry) = &self.registry else {
            return Err(CommandError::Unauthorized("persona verification is disabled".into()));
        };

        let persona = command.persona();
        let entry = match self.personas.get(persona, now) {
            Some(entry) => entry,
            None => {
                let query = PersonaQuery { persona: persona.to_string(), timestamp: now };
                let record = registry
                    .query_persona(&query)
                    .await
                    .map_err(|e| CommandError::RegistryUnavailable(e.to_string()))?;
                let verified = PersonaWithProof::verify(record).map_err(CommandError::Unauthorized)?;
                tracing::debug!(persona, version = verified.version, "persona binding refreshed");
                self.personas.insert(verified, now)
            }
        };

        if !entry.authorizes(&command.auth_info.signer_address) {
            return Err(CommandError::Unauthorized(format!(
                "signer {} is not bound to persona {:?}",
                hex::encode(&command.auth_info.signer_address),
                persona
            )));
        }
        Ok(())
    }
}

fn check_freshness(timestamp: u64, now: u64) -> Result<(), CommandError> {
    // Client-controlled; must not overflow.
    if now > timestamp.saturating_add(COMMAND_TTL_MS) {
        return Err(CommandError::Expired { timestamp, now });
    }
    if timestamp > now.saturating_add(MAX_CLOCK_DRIFT_MS) {
        return Err(CommandError::FromFuture { timestamp, now });
    }
    Ok(())
}
