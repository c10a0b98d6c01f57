// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::command::{Command, CommandKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickHeader {
    pub tick_height: u64,
    /// Unix milliseconds, leader clock. Replays reuse the recorded value.
    pub timestamp: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickData {
    pub commands: Vec<Command>,
}

impl TickData {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Typed view over the commands of one kind, in tick order.
    pub fn of_kind<T: CommandKind>(&self) -> impl Iterator<Item = Result<(&Command, T)>> + '_ {
        self.commands
            .iter()
            .filter(|c| c.name() == T::NAME)
            .map(|c| c.payload::<T>().map(|p| (c, p)))
    }
}

/// One execution step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub header: TickHeader,
    pub data: TickData,
}

impl Tick {
    pub fn new(tick_height: u64, timestamp: u64, commands: Vec<Command>) -> Self {
        Self {
            header: TickHeader { tick_height, timestamp },
            data: TickData { commands },
        }
    }

    pub fn height(&self) -> u64 {
        self.header.tick_height
    }

    /// Tick 0 is synthetic: it carries `ShardEngine::init`, never commands.
    pub fn is_init(&self) -> bool {
        self.header.tick_height == 0
    }
}
