// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use tessera_kernel::types::{AuthMode, Command, CommandKind, CommandRaw, ShardAddress};
use tessera_kernel::verify::CommandSigner;

pub fn address() -> ShardAddress {
    ShardAddress::new("us-east", "acme", "arena", "shard-1")
}

pub fn signer(seed: u8) -> CommandSigner {
    CommandSigner::from_bytes(&[seed; 32])
}

pub fn now() -> u64 {
    crate::now_ms()
}

/// Direct-mode command from persona "alice" to `address()`.
pub fn signed<T: CommandKind>(signer: &CommandSigner, timestamp: u64, salt: u8, payload: &T) -> Command {
    let raw = CommandRaw::new(timestamp, [salt; 16], address(), "alice", payload).unwrap();
    Command::from_signed(signer.sign(&raw, AuthMode::Direct).unwrap()).unwrap()
}
