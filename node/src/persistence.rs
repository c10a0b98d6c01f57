// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshot storage.
//!
//! Container layout:
//! ```text
//! [MAGIC u32][VERSION u32][META_LEN u32][META (bincode)][DATA][CRC32]
//! ```
//! CRC32 covers everything before it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use crc32fast::Hasher;
use opendal::{ErrorKind, Operator};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tessera_kernel::codec;
use tessera_kernel::config::SNAPSHOT_OBJECT_NAME;
use tessera_kernel::types::Snapshot;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::errors::SnapshotError;

const MAGIC: u32 = 0x5453_4E50; // TSNP
const SCHEMA_VERSION: u32 = 1;
const HEADER_LEN: usize = 12;

#[derive(Serialize, Deserialize, Debug)]
struct SnapshotMeta {
    epoch_height: u64,
    tick_height: u64,
    timestamp: u64,
    #[serde(with = "tessera_kernel::types::bytes")]
    state_hash: Vec<u8>,
    data_len: u64,
}

pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, SnapshotError> {
    let meta = SnapshotMeta {
        epoch_height: snapshot.epoch_height,
        tick_height: snapshot.tick_height,
        timestamp: snapshot.timestamp,
        state_hash: snapshot.state_hash.clone(),
        data_len: snapshot.data.len() as u64,
    };
    let meta_bytes = codec::encode(&meta)?;

    let mut out = Vec::with_capacity(HEADER_LEN + meta_bytes.len() + snapshot.data.len() + 4);
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    out.extend_from_slice(&(meta_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&meta_bytes);
    out.extend_from_slice(&snapshot.data);

    let mut hasher = Hasher::new();
    hasher.update(&out);
    out.extend_from_slice(&hasher.finalize().to_le_bytes());
    Ok(out)
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, SnapshotError> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| SnapshotError::Corrupt(format!("truncated at offset {}", at)))
}

pub fn decode_snapshot(buffer: &[u8]) -> Result<Snapshot, SnapshotError> {
    if buffer.len() < HEADER_LEN + 4 {
        return Err(SnapshotError::Corrupt("snapshot too short".into()));
    }

    // Check trailer
    let (content, _) = buffer.split_at(buffer.len() - 4);
    let stored_crc = read_u32(buffer, buffer.len() - 4)?;
    let mut hasher = Hasher::new();
    hasher.update(content);
    if hasher.finalize() != stored_crc {
        return Err(SnapshotError::Corrupt("checksum mismatch".into()));
    }

    if read_u32(content, 0)? != MAGIC {
        return Err(SnapshotError::Corrupt("invalid magic".into()));
    }
    let version = read_u32(content, 4)?;
    if version != SCHEMA_VERSION {
        return Err(SnapshotError::Corrupt(format!("unsupported version {}", version)));
    }

    let meta_end = HEADER_LEN + read_u32(content, 8)? as usize;
    let meta_bytes = content
        .get(HEADER_LEN..meta_end)
        .ok_or_else(|| SnapshotError::Corrupt("truncated metadata".into()))?;
    let meta: SnapshotMeta = codec::decode(meta_bytes)?;

    let data = &content[meta_end..];
    if data.len() as u64 != meta.data_len {
        return Err(SnapshotError::Corrupt(format!(
            "meta claims {} bytes of data, found {}",
            meta.data_len,
            data.len()
        )));
    }

    Ok(Snapshot {
        epoch_height: meta.epoch_height,
        tick_height: meta.tick_height,
        timestamp: meta.timestamp,
        state_hash: meta.state_hash,
        data: data.to_vec(),
    })
}

#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Replace the current snapshot.
    async fn store(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;

    /// The current snapshot; `SnapshotError::NotFound` on a cold start.
    async fn load(&self) -> Result<Snapshot, SnapshotError>;

    async fn exists(&self) -> Result<bool, SnapshotError>;
}

/// Keeps nothing. For short-lived shards.
pub struct NopSnapshotStorage;

#[async_trait]
impl SnapshotStorage for NopSnapshotStorage {
    async fn store(&self, _snapshot: &Snapshot) -> Result<(), SnapshotError> {
        Ok(())
    }

    async fn load(&self) -> Result<Snapshot, SnapshotError> {
        Err(SnapshotError::NotFound)
    }

    async fn exists(&self) -> Result<bool, SnapshotError> {
        Ok(false)
    }
}

/// One fixed object per shard bucket; the previous version is kept as
/// `<name>.prev`.
pub struct ObjectSnapshotStorage {
    op: Operator,
    path: String,
    backup_path: String,
}

impl ObjectSnapshotStorage {
    pub fn new(op: Operator, bucket: &str) -> Self {
        Self::with_name(op, bucket, SNAPSHOT_OBJECT_NAME)
    }

    pub fn with_name(op: Operator, bucket: &str, name: &str) -> Self {
        Self {
            op,
            path: format!("{}/{}", bucket, name),
            backup_path: format!("{}/{}.prev", bucket, name),
        }
    }

    pub async fn load_backup(&self) -> Result<Snapshot, SnapshotError> {
        self.read(&self.backup_path).await
    }

    async fn read(&self, path: &str) -> Result<Snapshot, SnapshotError> {
        match self.op.read(path).await {
            Ok(buf) => decode_snapshot(&buf.to_vec()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SnapshotError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SnapshotStorage for ObjectSnapshotStorage {
    async fn store(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let bytes = encode_snapshot(snapshot)?;

        // Rotation: keep one previous version
        match self.op.read(&self.path).await {
            Ok(current) => {
                self.op.write(&self.backup_path, current).await?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.op.write(&self.path, bytes).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Snapshot, SnapshotError> {
        self.read(&self.path).await
    }

    async fn exists(&self) -> Result<bool, SnapshotError> {
        match self.op.stat(&self.path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Outcome counters of background snapshot writes.
#[derive(Default)]
pub struct SnapshotHealth {
    written: AtomicU64,
    failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SnapshotHealth {
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub(crate) fn record_success(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("tessera_snapshots_written_total", 1);
    }

    pub(crate) fn record_failure(&self, error: String) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("tessera_snapshot_failures_total", 1);
        *self.last_error.lock() = Some(error);
    }
}

/// Background task writing snapshots handed over by the tick loop.
pub struct SnapshotWriter {
    tx: mpsc::Sender<Snapshot>,
    task: JoinHandle<()>,
}

impl SnapshotWriter {
    pub fn spawn(storage: Arc<dyn SnapshotStorage>, health: Arc<SnapshotHealth>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Snapshot>(1);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                let epoch = snapshot.epoch_height;
                match storage.store(&snapshot).await {
                    Ok(()) => {
                        tracing::info!(epoch, tick = snapshot.tick_height, "snapshot stored");
                        health.record_success();
                    }
                    Err(e) => {
                        tracing::error!(epoch, error = %e, "snapshot write failed");
                        health.record_failure(e.to_string());
                    }
                }
            }
        });
        Self { tx, task }
    }

    /// Queue `snapshot` for writing. Returns `false` if a write is already
    /// queued; the snapshot is then dropped.
    pub fn offer(&self, snapshot: Snapshot) -> bool {
        match self.tx.try_send(snapshot) {
            Ok(()) => true,
            Err(TrySendError::Full(s)) => {
                tracing::warn!(epoch = s.epoch_height, "previous snapshot still pending, skipping");
                false
            }
            Err(TrySendError::Closed(s)) => {
                tracing::error!(epoch = s.epoch_height, "snapshot writer stopped");
                false
            }
        }
    }

    /// Finish queued writes and stop.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "snapshot writer task failed");
        }
    }
}
