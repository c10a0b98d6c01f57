// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Startup recovery.
//!
//! A leader with a stored snapshot restores it and resumes after the epoch it
//! closed. Any failure on that path (load, restore, hash mismatch) resets the
//! engine and falls back to a fresh init, which is always safe: `sync` then
//! rebuilds state from the log.
//!
//! After a restore the replay cache is refilled from the committed epochs
//! the snapshot covers, since `sync` only replays the ones after it.

use std::time::Instant;

use tessera_kernel::types::TickData;
use tessera_kernel::ShardEngine;

use crate::config::ShardMode;
use crate::errors::{ShardError, SnapshotError};
use crate::now_ms;
use crate::persistence::SnapshotWriter;
use crate::shard::{Shard, ShardPhase};

impl<E: ShardEngine> Shard<E> {
    pub async fn init(&mut self) -> Result<(), ShardError> {
        if self.config.mode == ShardMode::Leader && self.writer.is_none() {
            self.writer = Some(SnapshotWriter::spawn(
                self.snapshots.clone(),
                self.status.snapshots().clone(),
            ));
        }

        let has_snapshot = self.config.mode == ShardMode::Leader
            && match self.snapshots.exists().await {
                Ok(exists) => exists,
                Err(e) => {
                    tracing::warn!(error = %e, "snapshot storage unavailable, starting fresh");
                    false
                }
            };

        if has_snapshot {
            self.status.set_phase(ShardPhase::Restoring);
            let start = Instant::now();
            match self.restore_snapshot().await {
                Ok(()) => {
                    metrics::histogram!("tessera_restore_duration_seconds", start.elapsed().as_secs_f64());
                    let rearmed = self.rearm_replay_cache().await?;
                    tracing::info!(
                        tick = self.tick_height,
                        epoch = self.epoch_height,
                        rearmed,
                        "restored from snapshot"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "snapshot restore failed, initializing from scratch");
                    self.engine.reset();
                }
            }
        }

        self.init_from_scratch().await
    }

    pub(crate) async fn restore_snapshot(&mut self) -> Result<(), ShardError> {
        let snapshot = self.snapshots.load().await?;

        // A snapshot always closes an epoch.
        let ef = self.config.epoch_frequency;
        if snapshot.tick_height + 1 != (snapshot.epoch_height + 1) * ef {
            return Err(SnapshotError::Corrupt(format!(
                "tick {} does not close epoch {} at {} ticks per epoch",
                snapshot.tick_height, snapshot.epoch_height, ef
            ))
            .into());
        }

        self.engine.restore(&snapshot.data).map_err(ShardError::engine)?;
        let hash = self.engine.state_hash().map_err(ShardError::engine)?;
        if hash != snapshot.state_hash {
            return Err(ShardError::StateHashMismatch {
                epoch: snapshot.epoch_height,
                recorded: hex::encode(&snapshot.state_hash),
                computed: hex::encode(&hash),
            });
        }

        self.tick_height = snapshot.tick_height + 1;
        self.epoch_height = snapshot.epoch_height + 1;
        self.ticks.clear();
        self.tick_open = false;
        self.last_epoch_hash = hash;
        Ok(())
    }

    /// Synthetic tick 0 around `ShardEngine::init`.
    pub(crate) async fn init_from_scratch(&mut self) -> Result<(), ShardError> {
        self.status.set_phase(ShardPhase::Initializing);
        self.tick_height = 0;
        self.epoch_height = 0;
        self.ticks.clear();
        self.tick_open = false;
        self.last_epoch_hash.clear();

        self.begin_tick(TickData::default(), now_ms());
        self.engine.init().map_err(ShardError::engine)?;
        self.end_tick().await?;
        tracing::info!("initialized from scratch");
        Ok(())
    }
}
