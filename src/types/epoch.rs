// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Epochs: the unit of replication.
//!
//! An epoch is published to the log as one message. Its sequence number on
//! the log is always `epoch_height + 1`, and its message id is derived from
//! the subject and height so a republish is deduplicated.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{KernelError, Result};
use crate::types::tick::Tick;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    pub epoch_height: u64,
    /// Engine state hash after the last tick of this epoch.
    #[serde(with = "crate::types::bytes")]
    pub hash: Vec<u8>,
    pub ticks: Vec<Tick>,
}

impl Epoch {
    pub fn message_id(subject: &str, epoch_height: u64) -> String {
        format!("{}-{}", subject, epoch_height)
    }

    /// Log sequence this epoch occupies.
    pub fn log_sequence(epoch_height: u64) -> u64 {
        epoch_height + 1
    }

    pub fn first_tick_height(&self) -> Option<u64> {
        self.ticks.first().map(Tick::height)
    }

    pub fn last_tick_height(&self) -> Option<u64> {
        self.ticks.last().map(Tick::height)
    }

    /// Structural checks that do not depend on shard state.
    pub fn validate(&self) -> Result<()> {
        if self.hash.is_empty() {
            return Err(KernelError::Schema(format!("epoch {}: empty state hash", self.epoch_height)));
        }
        let Some(first) = self.first_tick_height() else {
            return Err(KernelError::Schema(format!("epoch {}: no ticks", self.epoch_height)));
        };
        for (offset, tick) in self.ticks.iter().enumerate() {
            if tick.height() != first + offset as u64 {
                return Err(KernelError::Schema(format!(
                    "epoch {}: tick heights not contiguous at offset {} (got {}, want {})",
                    self.epoch_height,
                    offset,
                    tick.height(),
                    first + offset as u64
                )));
            }
            if tick.is_init() && !tick.data.is_empty() {
                return Err(KernelError::Schema("init tick carries commands".into()));
            }
        }
        if self.epoch_height == 0 && first != 0 {
            return Err(KernelError::Schema("epoch 0 must start at the init tick".into()));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    /// Decode and schema-check an epoch received from the log.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let epoch: Self = codec::decode(bytes)?;
        epoch.validate()?;
        Ok(epoch)
    }
}
