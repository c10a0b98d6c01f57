// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! A small deterministic engine: players moving on a grid.
//!
//! Used by the binary when no application engine is linked in, and by the
//! tests as a reference `ShardEngine`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_kernel::codec;
use tessera_kernel::error::KernelError;
use tessera_kernel::types::{CommandKind, Tick};
use tessera_kernel::verify::hash_bytes;
use tessera_kernel::ShardEngine;
use thiserror::Error;

use crate::commands::CommandManager;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub dx: i32,
    pub dy: i32,
}

impl CommandKind for Move {
    const NAME: &'static str = "move";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub name: String,
}

impl CommandKind for Rename {
    const NAME: &'static str = "rename";
}

/// Register the command kinds this engine understands.
pub fn register_commands(manager: &CommandManager) {
    manager.register::<Move>();
    manager.register::<Rename>();
}

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("engine not initialized")]
    NotInitialized,
    #[error(transparent)]
    Codec(#[from] KernelError),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Player {
    pub x: i64,
    pub y: i64,
    pub display_name: Option<String>,
    pub moves: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
struct World {
    players: BTreeMap<String, Player>,
    ticks: u64,
    last_timestamp: u64,
}

#[derive(Default)]
pub struct SampleEngine {
    world: Option<World>,
}

impl SampleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self, persona: &str) -> Option<&Player> {
        self.world.as_ref().and_then(|w| w.players.get(persona))
    }

    pub fn ticks(&self) -> u64 {
        self.world.as_ref().map_or(0, |w| w.ticks)
    }

    fn world_mut(&mut self) -> Result<&mut World, SampleError> {
        self.world.as_mut().ok_or(SampleError::NotInitialized)
    }

    fn apply(&mut self, tick: &Tick) -> Result<(), SampleError> {
        let world = self.world_mut()?;
        for command in &tick.data.commands {
            let player = world.players.entry(command.persona().to_string()).or_default();
            match command.name() {
                Move::NAME => {
                    let m: Move = command.payload()?;
                    player.x += i64::from(m.dx);
                    player.y += i64::from(m.dy);
                    player.moves += 1;
                }
                Rename::NAME => {
                    let r: Rename = command.payload()?;
                    player.display_name = Some(r.name);
                }
                other => tracing::warn!(kind = other, "ignoring unknown command"),
            }
        }
        world.ticks += 1;
        world.last_timestamp = tick.header.timestamp;
        Ok(())
    }
}

impl ShardEngine for SampleEngine {
    type Error = SampleError;

    fn init(&mut self) -> Result<(), SampleError> {
        self.world = Some(World::default());
        Ok(())
    }

    fn tick(&mut self, tick: &Tick) -> Result<(), SampleError> {
        self.apply(tick)
    }

    fn replay(&mut self, tick: &Tick) -> Result<(), SampleError> {
        self.apply(tick)
    }

    fn state_hash(&self) -> Result<Vec<u8>, SampleError> {
        let world = self.world.as_ref().ok_or(SampleError::NotInitialized)?;
        let mut bytes = b"tessera.sample.v1".to_vec();
        bytes.extend_from_slice(&codec::encode(world)?);
        Ok(hash_bytes(&bytes).to_vec())
    }

    fn snapshot(&self) -> Result<Vec<u8>, SampleError> {
        let world = self.world.as_ref().ok_or(SampleError::NotInitialized)?;
        Ok(codec::encode(world)?)
    }

    fn restore(&mut self, data: &[u8]) -> Result<(), SampleError> {
        self.world = Some(codec::decode(data)?);
        Ok(())
    }

    fn reset(&mut self) {
        self.world = None;
    }
}
