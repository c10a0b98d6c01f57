// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod channel;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tessera_kernel::types::{Command, CommandKind, SignedCommand, TickData};

use crate::errors::CommandError;
use crate::verifier::{CommandVerifier, VerifyMode};

pub use channel::{CommandChannel, CommandQueue};

/// Owns the per-kind channels and the verifier in front of them.
pub struct CommandManager {
    channels: RwLock<BTreeMap<&'static str, Arc<dyn CommandQueue>>>,
    verifier: Arc<CommandVerifier>,
}

impl CommandManager {
    pub fn new(verifier: Arc<CommandVerifier>) -> Self {
        Self { channels: RwLock::new(BTreeMap::new()), verifier }
    }

    pub fn verifier(&self) -> &CommandVerifier {
        &self.verifier
    }

    /// Register kind `T`. Returns `false` if it was already registered.
    pub fn register<T: CommandKind>(&self) -> bool {
        let mut channels = self.channels.write();
        if channels.contains_key(T::NAME) {
            return false;
        }
        channels.insert(T::NAME, Arc::new(CommandChannel::<T>::new()));
        tracing::debug!(kind = T::NAME, "command kind registered");
        true
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.channels.read().keys().copied().collect()
    }

    fn channel(&self, name: &str) -> Result<Arc<dyn CommandQueue>, CommandError> {
        self.channels
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))
    }

    /// Accept a fresh submission for kind `name`.
    pub async fn submit(&self, name: &str, signed: SignedCommand, now: u64) -> Result<(), CommandError> {
        let channel = self.channel(name)?;
        // Shape first, so a malformed body never reaches the replay cache.
        let decoded = Command::from_signed(signed.clone())
            .map_err(|e| CommandError::Malformed(e.to_string()))?;
        channel.check(&decoded)?;

        let command = self.verifier.verify(&signed, VerifyMode::Leader, now).await?;
        channel.enqueue(command)
    }

    /// Re-verify a command read back from the log and shape-check it against
    /// its registered kind.
    pub async fn verify_recorded(&self, command: &Command, now: u64) -> Result<Command, CommandError> {
        let channel = self.channel(command.name())?;
        let verified = self
            .verifier
            .verify(&command.to_signed(), VerifyMode::Replay, now)
            .await?;
        channel.check(&verified)?;
        Ok(verified)
    }

    /// Drain every channel, in kind-name order.
    pub fn tick_data(&self) -> TickData {
        let channels = self.channels.read();
        let mut commands = Vec::with_capacity(channels.values().map(|c| c.len()).sum());
        for channel in channels.values() {
            channel.drain_into(&mut commands);
        }
        TickData { commands }
    }

    pub fn pending(&self) -> usize {
        self.channels.read().values().map(|c| c.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Move, Rename};
    use crate::test_support::{address, now, signed, signer};

    fn manager() -> CommandManager {
        let m = CommandManager::new(Arc::new(CommandVerifier::new(address(), None)));
        assert!(m.register::<Move>());
        assert!(m.register::<Rename>());
        m
    }

    #[tokio::test]
    async fn test_register_idempotent() {
        let m = manager();
        assert!(!m.register::<Move>());
        assert_eq!(m.names(), vec!["move", "rename"]);
    }

    #[tokio::test]
    async fn test_tick_data_orders_by_kind() {
        let m = manager();
        let s = signer(1);
        let t = now();
        let r = signed(&s, t, 1, &Rename { name: "z".into() });
        let m1 = signed(&s, t, 2, &Move { dx: 1, dy: 1 });
        let m2 = signed(&s, t, 3, &Move { dx: 2, dy: 2 });

        m.submit("rename", r.to_signed(), t).await.unwrap();
        m.submit("move", m1.to_signed(), t).await.unwrap();
        m.submit("move", m2.to_signed(), t).await.unwrap();
        assert_eq!(m.pending(), 3);

        let data = m.tick_data();
        assert_eq!(data.commands, vec![m1, m2, r]);
        assert!(m.tick_data().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejections() {
        let m = manager();
        let s = signer(1);
        let t = now();
        let cmd = signed(&s, t, 1, &Move { dx: 0, dy: 0 });

        let err = m.submit("teleport", cmd.to_signed(), t).await.unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_COMMAND");

        let err = m.submit("rename", cmd.to_signed(), t).await.unwrap_err();
        assert_eq!(err.code(), "MALFORMED");

        let mut tampered = cmd.to_signed();
        tampered.signature[0] ^= 1;
        let err = m.submit("move", tampered, t).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");

        // None of the rejections consumed the signature.
        m.submit("move", cmd.to_signed(), t).await.unwrap();
    }

    #[tokio::test]
    async fn test_recorded_commands_skip_freshness() {
        let m = manager();
        let s = signer(1);
        let t = now();
        let old = signed(&s, t - 600_000, 4, &Move { dx: 3, dy: 3 });

        assert!(m.submit("move", old.to_signed(), t).await.is_err());
        let verified = m.verify_recorded(&old, t).await.unwrap();
        assert_eq!(verified, old);
        assert_eq!(m.pending(), 0);
    }
}
