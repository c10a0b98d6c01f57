// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shard orchestrator.
//!
//! Owns the tick/epoch counters and the in-flight tick buffer. Every tick,
//! live or replayed, goes through `begin_tick` / `end_tick`, so leader and
//! followers agree on heights byte for byte.
//!
//! Startup: `init` (restore or fresh init) -> `sync` (catch up from the log)
//! -> leader or follower loop. See `recovery.rs` and `replication.rs`.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use tessera_kernel::types::{Epoch, Snapshot, Tick, TickData};
use tessera_kernel::ShardEngine;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::commands::CommandManager;
use crate::config::{NodeConfig, ShardMode};
use crate::errors::ShardError;
use crate::now_ms;
use crate::persistence::{SnapshotHealth, SnapshotStorage, SnapshotWriter};
use crate::stream::LogService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShardPhase {
    Uninitialized = 0,
    Restoring = 1,
    Initializing = 2,
    Syncing = 3,
    Running = 4,
    Stopped = 5,
}

impl ShardPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ShardPhase::Restoring,
            2 => ShardPhase::Initializing,
            3 => ShardPhase::Syncing,
            4 => ShardPhase::Running,
            5 => ShardPhase::Stopped,
            _ => ShardPhase::Uninitialized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShardPhase::Uninitialized => "UNINITIALIZED",
            ShardPhase::Restoring => "RESTORING",
            ShardPhase::Initializing => "INITIALIZING",
            ShardPhase::Syncing => "SYNCING",
            ShardPhase::Running => "RUNNING",
            ShardPhase::Stopped => "STOPPED",
        }
    }
}

/// Lock-free view of a shard, shared with the HTTP surface.
pub struct ShardStatus {
    mode: ShardMode,
    phase: AtomicU8,
    tick_height: AtomicU64,
    epoch_height: AtomicU64,
    last_published_seq: AtomicU64,
    snapshots: Arc<SnapshotHealth>,
}

impl ShardStatus {
    pub fn new(mode: ShardMode) -> Self {
        Self {
            mode,
            phase: AtomicU8::new(ShardPhase::Uninitialized as u8),
            tick_height: AtomicU64::new(0),
            epoch_height: AtomicU64::new(0),
            last_published_seq: AtomicU64::new(0),
            snapshots: Arc::new(SnapshotHealth::default()),
        }
    }

    pub fn mode(&self) -> ShardMode {
        self.mode
    }

    pub fn phase(&self) -> ShardPhase {
        ShardPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: ShardPhase) {
        tracing::debug!(phase = phase.as_str(), "shard phase");
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub fn tick_height(&self) -> u64 {
        self.tick_height.load(Ordering::Relaxed)
    }

    pub fn epoch_height(&self) -> u64 {
        self.epoch_height.load(Ordering::Relaxed)
    }

    pub fn last_published_seq(&self) -> u64 {
        self.last_published_seq.load(Ordering::Relaxed)
    }

    pub(crate) fn set_last_published_seq(&self, seq: u64) {
        self.last_published_seq.store(seq, Ordering::Relaxed);
    }

    pub fn snapshots(&self) -> &Arc<SnapshotHealth> {
        &self.snapshots
    }

    fn set_heights(&self, tick_height: u64, epoch_height: u64) {
        self.tick_height.store(tick_height, Ordering::Relaxed);
        self.epoch_height.store(epoch_height, Ordering::Relaxed);
        metrics::gauge!("tessera_tick_height", tick_height as f64);
        metrics::gauge!("tessera_epoch_height", epoch_height as f64);
    }
}

pub struct Shard<E: ShardEngine> {
    pub(crate) config: NodeConfig,
    pub(crate) engine: E,
    pub(crate) commands: Arc<CommandManager>,
    pub(crate) log: Arc<dyn LogService>,
    pub(crate) snapshots: Arc<dyn SnapshotStorage>,
    pub(crate) writer: Option<SnapshotWriter>,
    pub(crate) status: Arc<ShardStatus>,
    pub(crate) subject: String,
    /// Effective mode; `sync` runs with follower semantics regardless of the
    /// configured one.
    pub(crate) mode: ShardMode,
    /// Height the next tick will get.
    pub(crate) tick_height: u64,
    /// Epoch currently being filled.
    pub(crate) epoch_height: u64,
    pub(crate) ticks: Vec<Tick>,
    pub(crate) tick_open: bool,
    /// State hash that closed the last epoch.
    pub(crate) last_epoch_hash: Vec<u8>,
}

impl<E: ShardEngine> Shard<E> {
    pub fn new(
        config: NodeConfig,
        engine: E,
        commands: Arc<CommandManager>,
        log: Arc<dyn LogService>,
        snapshots: Arc<dyn SnapshotStorage>,
    ) -> Self {
        let subject = config.address.subject();
        let capacity = config.epoch_frequency as usize;
        Self {
            mode: config.mode,
            status: Arc::new(ShardStatus::new(config.mode)),
            config,
            engine,
            commands,
            log,
            snapshots,
            writer: None,
            subject,
            tick_height: 0,
            epoch_height: 0,
            ticks: Vec::with_capacity(capacity),
            tick_open: false,
            last_epoch_hash: Vec::new(),
        }
    }

    pub fn status(&self) -> Arc<ShardStatus> {
        self.status.clone()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn tick_height(&self) -> u64 {
        self.tick_height
    }

    pub fn epoch_height(&self) -> u64 {
        self.epoch_height
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Recover or initialize, then catch up from the log. Leaves the shard
    /// ready for its main loop.
    pub async fn start(&mut self) -> Result<(), ShardError> {
        self.init().await?;
        self.sync().await?;
        self.status.set_phase(ShardPhase::Running);
        tracing::info!(
            mode = ?self.config.mode,
            tick = self.tick_height,
            epoch = self.epoch_height,
            "shard running"
        );
        Ok(())
    }

    /// Run until `cancel` fires or a fatal error occurs.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), ShardError> {
        let result = match self.start().await {
            Ok(()) => match self.config.mode {
                ShardMode::Leader => self.run_leader(&cancel).await,
                ShardMode::Follower => self.run_follower(&cancel).await,
            },
            Err(e) => Err(e),
        };
        self.shutdown().await;
        result
    }

    /// Stop accepting work and flush a pending snapshot write.
    pub async fn shutdown(&mut self) {
        self.status.set_phase(ShardPhase::Stopped);
        if let Some(writer) = self.writer.take() {
            writer.close().await;
        }
    }

    pub async fn run_leader(&mut self, cancel: &CancellationToken) -> Result<(), ShardError> {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(tick = self.tick_height, "leader loop stopped");
                    return Ok(());
                }
                _ = interval.tick() => self.leader_tick().await?,
            }
        }
    }

    /// One leader step: drain commands, execute, close the tick.
    pub async fn leader_tick(&mut self) -> Result<(), ShardError> {
        let data = self.commands.tick_data();
        self.begin_tick(data, now_ms());
        if let Some(tick) = self.ticks.last() {
            self.engine.tick(tick).map_err(ShardError::engine)?;
        }
        self.end_tick().await
    }

    pub(crate) fn begin_tick(&mut self, data: TickData, timestamp: u64) {
        assert!(!self.tick_open, "begin_tick: tick {} is still open", self.tick_height);
        assert!(
            (self.ticks.len() as u64) < self.config.epoch_frequency,
            "begin_tick: tick buffer full ({} ticks)",
            self.ticks.len()
        );
        self.ticks.push(Tick::new(self.tick_height, timestamp, data.commands));
        self.tick_open = true;
    }

    pub(crate) async fn end_tick(&mut self) -> Result<(), ShardError> {
        assert!(self.tick_open, "end_tick without a matching begin_tick");
        self.tick_open = false;
        self.tick_height += 1;
        metrics::counter!("tessera_ticks_total", 1);

        if self.ticks.len() as u64 == self.config.epoch_frequency {
            self.close_epoch().await?;
        }
        self.status.set_heights(self.tick_height, self.epoch_height);
        Ok(())
    }

    async fn close_epoch(&mut self) -> Result<(), ShardError> {
        let hash = self.engine.state_hash().map_err(ShardError::engine)?;
        let ticks = std::mem::replace(
            &mut self.ticks,
            Vec::with_capacity(self.config.epoch_frequency as usize),
        );
        let epoch = Epoch { epoch_height: self.epoch_height, hash: hash.clone(), ticks };

        if self.mode == ShardMode::Leader {
            self.publish_epoch(&epoch).await?;
            if (epoch.epoch_height + 1) % self.config.snapshot_frequency == 0 {
                self.offer_snapshot(epoch.epoch_height, hash.clone());
            }
        }

        self.last_epoch_hash = hash;
        self.epoch_height += 1;
        Ok(())
    }

    async fn publish_epoch(&self, epoch: &Epoch) -> Result<(), ShardError> {
        let payload = epoch.to_bytes()?;
        let msg_id = Epoch::message_id(&self.subject, epoch.epoch_height);
        let ack = self
            .log
            .publish(&self.subject, &msg_id, Some(epoch.epoch_height), payload)
            .await?;

        if ack.seq != Epoch::log_sequence(epoch.epoch_height) {
            return Err(ShardError::SequenceMismatch { epoch: epoch.epoch_height, seq: ack.seq });
        }
        if ack.duplicate {
            tracing::warn!(epoch = epoch.epoch_height, seq = ack.seq, "epoch was already on the log");
        }

        tracing::info!(
            epoch = epoch.epoch_height,
            seq = ack.seq,
            commands = epoch.ticks.iter().map(|t| t.data.len()).sum::<usize>(),
            "epoch published"
        );
        metrics::counter!("tessera_epochs_published_total", 1);
        self.status.set_last_published_seq(ack.seq);
        Ok(())
    }

    /// `ShardEngine::snapshot` runs here on the tick loop, trading tick
    /// latency for bytes that match `state_hash`. Container encoding and the
    /// storage write run on the writer task.
    fn offer_snapshot(&self, epoch_height: u64, state_hash: Vec<u8>) {
        let Some(writer) = &self.writer else {
            return;
        };
        match self.engine.snapshot() {
            Ok(data) => {
                writer.offer(Snapshot {
                    epoch_height,
                    tick_height: self.tick_height - 1,
                    timestamp: now_ms(),
                    state_hash,
                    data,
                });
            }
            Err(e) => {
                tracing::error!(epoch = epoch_height, error = %e, "snapshot capture failed");
                self.status.snapshots().record_failure(e.to_string());
            }
        }
    }
}
