// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Follower side: catch-up sync and epoch replay.

use tessera_kernel::config::{COMMAND_TTL_MS, MAX_CLOCK_DRIFT_MS};
use tessera_kernel::types::{Command, Epoch, TickData, TickHeader};
use tessera_kernel::ShardEngine;
use tokio_util::sync::CancellationToken;

use crate::config::ShardMode;
use crate::errors::ShardError;
use crate::now_ms;
use crate::shard::{Shard, ShardPhase};
use crate::stream::LogMessage;

impl<E: ShardEngine> Shard<E> {
    /// Replay every epoch on the log that this shard has not applied yet.
    ///
    /// Runs with follower semantics in either mode. Epochs below the current
    /// height are acknowledged and skipped.
    pub async fn sync(&mut self) -> Result<(), ShardError> {
        self.status.set_phase(ShardPhase::Syncing);
        let configured = self.mode;
        self.mode = ShardMode::Follower;
        let start = Epoch::log_sequence(self.epoch_height);
        let result = self.drain_from(start).await;
        self.mode = configured;
        result?;

        let last_seq = self.log.last_sequence(&self.subject).await?;
        self.status.set_last_published_seq(last_seq);
        Ok(())
    }

    pub(crate) async fn drain_from(&mut self, start: u64) -> Result<u64, ShardError> {
        let mut consumer = self.log.subscribe(&self.subject, start).await?;
        let mut replayed = 0u64;

        while consumer.pending().await? > 0 {
            let batch = consumer
                .fetch(self.config.fetch_batch, self.config.fetch_wait)
                .await?;
            for message in batch {
                let epoch = Epoch::from_bytes(&message.payload)?;
                if epoch.epoch_height < self.epoch_height {
                    tracing::debug!(epoch = epoch.epoch_height, "already applied, skipping");
                } else {
                    self.replay_epoch(&epoch).await?;
                    replayed += 1;
                }
                consumer.ack(message.seq).await?;
            }
        }

        tracing::info!(replayed, epoch = self.epoch_height, "sync complete");
        Ok(replayed)
    }

    /// Re-record the signatures of commands committed below the current
    /// height that are still inside their freshness window. Nothing is
    /// applied. Used after a snapshot restore, where `sync` starts past them.
    ///
    /// Leader ticks are at least one interval apart, so only the last
    /// `(TTL + drift) * tick_rate` ticks can hold a fresh command.
    pub(crate) async fn rearm_replay_cache(&self) -> Result<usize, ShardError> {
        let window_ticks =
            (COMMAND_TTL_MS + MAX_CLOCK_DRIFT_MS) * u64::from(self.config.tick_rate) / 1_000 + 1;
        let lookback = window_ticks.div_ceil(self.config.epoch_frequency) + 1;
        let first = self.epoch_height.saturating_sub(lookback);
        let mut consumer = self.log.subscribe(&self.subject, Epoch::log_sequence(first)).await?;

        let now = now_ms();
        let verifier = self.commands.verifier();
        let mut next = first;
        let mut recorded = 0usize;
        while next < self.epoch_height && consumer.pending().await? > 0 {
            let batch = consumer
                .fetch(self.config.fetch_batch, self.config.fetch_wait)
                .await?;
            for message in batch {
                consumer.ack(message.seq).await?;
                let epoch = Epoch::from_bytes(&message.payload)?;
                if epoch.epoch_height >= self.epoch_height {
                    next = self.epoch_height;
                    break;
                }
                next = epoch.epoch_height + 1;
                for command in epoch.ticks.iter().flat_map(|t| &t.data.commands) {
                    if verifier.remember(command, now) {
                        recorded += 1;
                    }
                }
            }
        }

        tracing::debug!(from_epoch = first, recorded, "replay cache rearmed");
        Ok(recorded)
    }

    /// Apply epochs as the leader publishes them. Returns
    /// `ShardError::Cancelled` when `cancel` fires.
    pub async fn run_follower(&mut self, cancel: &CancellationToken) -> Result<(), ShardError> {
        let start = Epoch::log_sequence(self.epoch_height);
        let mut consumer = self.log.subscribe(&self.subject, start).await?;
        tracing::info!(subject = %self.subject, start, "following");

        loop {
            let fetched = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(epoch = self.epoch_height, "follower loop stopped");
                    return Err(ShardError::Cancelled);
                }
                r = consumer.fetch(self.config.fetch_batch, self.config.fetch_wait) => r,
            };

            let messages = match fetched {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!(error = %e, "log fetch failed");
                    self.pause(cancel).await?;
                    continue;
                }
            };

            for message in messages {
                match self.apply_delivered(&message).await {
                    Ok(()) => {
                        if let Err(e) = consumer.ack(message.seq).await {
                            tracing::warn!(seq = message.seq, error = %e, "ack failed");
                        }
                    }
                    Err(e) if e.is_fatal() => {
                        tracing::error!(seq = message.seq, error = %e, "replication diverged");
                        return Err(e);
                    }
                    Err(e) => {
                        tracing::warn!(seq = message.seq, error = %e, "epoch not applied, awaiting redelivery");
                        self.pause(cancel).await?;
                        break;
                    }
                }
            }
        }
    }

    async fn pause(&self, cancel: &CancellationToken) -> Result<(), ShardError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ShardError::Cancelled),
            _ = tokio::time::sleep(self.config.retry_delay) => Ok(()),
        }
    }

    async fn apply_delivered(&mut self, message: &LogMessage) -> Result<(), ShardError> {
        let epoch = Epoch::from_bytes(&message.payload)?;
        self.replay_epoch(&epoch).await
    }

    /// Replay one epoch and check the resulting state hash.
    ///
    /// Every command is verified before the first tick is applied, so a
    /// verification failure leaves the engine untouched.
    pub async fn replay_epoch(&mut self, epoch: &Epoch) -> Result<(), ShardError> {
        if epoch.epoch_height != self.epoch_height {
            return Err(ShardError::EpochHeightMismatch {
                expected: self.epoch_height,
                got: epoch.epoch_height,
            });
        }

        let now = now_ms();
        let mut expected_height = self.tick_height;
        let mut prepared: Vec<(TickHeader, Vec<Command>)> = Vec::with_capacity(epoch.ticks.len());
        for tick in &epoch.ticks {
            // Tick 0 was applied by `init`.
            if tick.is_init() {
                continue;
            }
            if tick.height() != expected_height {
                return Err(ShardError::TickHeightMismatch {
                    expected: expected_height,
                    got: tick.height(),
                });
            }
            expected_height += 1;

            let mut commands = Vec::with_capacity(tick.data.len());
            for command in &tick.data.commands {
                commands.push(self.commands.verify_recorded(command, now).await?);
            }
            prepared.push((tick.header, commands));
        }

        let total = self.ticks.len() + prepared.len();
        if total as u64 != self.config.epoch_frequency {
            return Err(ShardError::EpochSize {
                epoch: epoch.epoch_height,
                expected: self.config.epoch_frequency,
                got: total,
            });
        }

        for (header, commands) in prepared {
            self.replay_tick(header, commands).await?;
        }

        if self.last_epoch_hash != epoch.hash {
            return Err(ShardError::StateHashMismatch {
                epoch: epoch.epoch_height,
                recorded: hex::encode(&epoch.hash),
                computed: hex::encode(&self.last_epoch_hash),
            });
        }

        tracing::debug!(epoch = epoch.epoch_height, tick = self.tick_height, "epoch replayed");
        metrics::counter!("tessera_epochs_replayed_total", 1);
        Ok(())
    }

    /// Same bookkeeping as a leader tick, with `ShardEngine::replay`.
    pub(crate) async fn replay_tick(
        &mut self,
        header: TickHeader,
        commands: Vec<Command>,
    ) -> Result<(), ShardError> {
        debug_assert_eq!(header.tick_height, self.tick_height);
        self.begin_tick(TickData { commands }, header.timestamp);
        if let Some(tick) = self.ticks.last() {
            self.engine.replay(tick).map_err(ShardError::engine)?;
        }
        self.end_tick().await
    }
}
