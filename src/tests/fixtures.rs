// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use crate::types::{AuthMode, Command, CommandKind, CommandRaw, ShardAddress};
use crate::verify::CommandSigner;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub dx: i32,
    pub dy: i32,
}

impl CommandKind for Move {
    const NAME: &'static str = "move";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Say {
    pub text: String,
}

impl CommandKind for Say {
    const NAME: &'static str = "say";
}

pub fn address() -> ShardAddress {
    ShardAddress::new("us-east", "acme", "arena", "shard-1")
}

pub fn signer(seed: u8) -> CommandSigner {
    CommandSigner::from_bytes(&[seed; 32])
}

pub fn signed_move(signer: &CommandSigner, timestamp: u64, salt: u8) -> Command {
    let raw = CommandRaw::new(timestamp, [salt; 16], address(), "alice", &Move { dx: 1, dy: -1 }).unwrap();
    Command::from_signed(signer.sign(&raw, AuthMode::Direct).unwrap()).unwrap()
}
