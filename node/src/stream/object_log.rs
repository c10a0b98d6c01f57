// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Log service over an object store.
//!
//! Layout per subject:
//! ```text
//! <subject>/msgs/<seq:020>   message (msg_id + payload)
//! <subject>/ids/<msg_id>     sequence the id was published at
//! <subject>/head             last sequence + stored bytes
//! ```
//! The head is written last, so a crash mid-publish leaves at most an
//! orphan message that the next publish overwrites.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opendal::{ErrorKind, Operator};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tessera_kernel::codec;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::LogError;
use crate::stream::{LogConsumer, LogMessage, LogService, PublishAck};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
struct Head {
    last_seq: u64,
    bytes: u64,
}

#[derive(Serialize, Deserialize, Debug)]
struct StoredMessage {
    msg_id: String,
    #[serde(with = "tessera_kernel::types::bytes")]
    payload: Vec<u8>,
}

#[derive(Clone)]
pub struct ObjectLog {
    op: Operator,
    /// 0 = uncapped.
    max_bytes: u64,
    publish_lock: Arc<Mutex<()>>,
}

impl ObjectLog {
    pub fn new(op: Operator, max_bytes: u64) -> Self {
        Self { op, max_bytes, publish_lock: Arc::new(Mutex::new(())) }
    }
}

fn head_path(subject: &str) -> String {
    format!("{}/head", subject)
}

fn msg_path(subject: &str, seq: u64) -> String {
    format!("{}/msgs/{:020}", subject, seq)
}

fn id_path(subject: &str, msg_id: &str) -> String {
    format!("{}/ids/{}", subject, msg_id)
}

async fn read_opt<T: DeserializeOwned>(op: &Operator, path: &str) -> Result<Option<T>, LogError> {
    match op.read(path).await {
        Ok(buf) => codec::decode(&buf.to_vec())
            .map(Some)
            .map_err(|e| LogError::Corrupt { path: path.to_string(), reason: e.to_string() }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write<T: Serialize>(op: &Operator, path: &str, value: &T) -> Result<(), LogError> {
    let bytes = codec::encode(value)
        .map_err(|e| LogError::Corrupt { path: path.to_string(), reason: e.to_string() })?;
    op.write(path, bytes).await?;
    Ok(())
}

async fn read_head(op: &Operator, subject: &str) -> Result<Head, LogError> {
    Ok(read_opt(op, &head_path(subject)).await?.unwrap_or_default())
}

#[async_trait]
impl LogService for ObjectLog {
    async fn publish(
        &self,
        subject: &str,
        msg_id: &str,
        expected_last_seq: Option<u64>,
        payload: Vec<u8>,
    ) -> Result<PublishAck, LogError> {
        let _guard = self.publish_lock.lock().await;
        let head = read_head(&self.op, subject).await?;

        if let Some(seq) = read_opt::<u64>(&self.op, &id_path(subject, msg_id)).await? {
            if seq <= head.last_seq {
                tracing::debug!(subject, msg_id, seq, "duplicate publish");
                return Ok(PublishAck { seq, duplicate: true });
            }
        }

        if let Some(expected) = expected_last_seq {
            if expected != head.last_seq {
                return Err(LogError::WrongLastSequence { expected, actual: head.last_seq });
            }
        }

        let incoming = payload.len() as u64;
        if self.max_bytes > 0 && head.bytes + incoming > self.max_bytes {
            return Err(LogError::StreamFull { used: head.bytes, incoming, cap: self.max_bytes });
        }

        let seq = head.last_seq + 1;
        let message = StoredMessage { msg_id: msg_id.to_string(), payload };
        write(&self.op, &msg_path(subject, seq), &message).await?;
        write(&self.op, &id_path(subject, msg_id), &seq).await?;
        write(&self.op, &head_path(subject), &Head { last_seq: seq, bytes: head.bytes + incoming }).await?;

        Ok(PublishAck { seq, duplicate: false })
    }

    async fn last_sequence(&self, subject: &str) -> Result<u64, LogError> {
        Ok(read_head(&self.op, subject).await?.last_seq)
    }

    async fn subscribe(&self, subject: &str, start_seq: u64) -> Result<Box<dyn LogConsumer>, LogError> {
        Ok(Box::new(ObjectConsumer {
            op: self.op.clone(),
            subject: subject.to_string(),
            acked: start_seq.saturating_sub(1),
        }))
    }
}

pub struct ObjectConsumer {
    op: Operator,
    subject: String,
    acked: u64,
}

impl ObjectConsumer {
    async fn read_range(&self, from: u64, to: u64) -> Result<Vec<LogMessage>, LogError> {
        let mut out = Vec::with_capacity((to + 1 - from) as usize);
        for seq in from..=to {
            let path = msg_path(&self.subject, seq);
            let stored: StoredMessage = read_opt(&self.op, &path).await?.ok_or_else(|| {
                LogError::Corrupt { path: path.clone(), reason: "missing message below head".into() }
            })?;
            out.push(LogMessage { seq, msg_id: stored.msg_id, payload: stored.payload });
        }
        Ok(out)
    }
}

#[async_trait]
impl LogConsumer for ObjectConsumer {
    async fn fetch(&mut self, max: usize, wait: Duration) -> Result<Vec<LogMessage>, LogError> {
        let deadline = Instant::now() + wait;
        loop {
            let head = read_head(&self.op, &self.subject).await?;
            if head.last_seq > self.acked && max > 0 {
                let from = self.acked + 1;
                let to = head.last_seq.min(self.acked + max as u64);
                return self.read_range(from, to).await;
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn ack(&mut self, seq: u64) -> Result<(), LogError> {
        self.acked = self.acked.max(seq);
        Ok(())
    }

    async fn pending(&self) -> Result<u64, LogError> {
        let head = read_head(&self.op, &self.subject).await?;
        Ok(head.last_seq.saturating_sub(self.acked))
    }
}
