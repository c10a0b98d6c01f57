// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ordered, durable per-subject log carrying epochs.

pub mod object_log;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::LogError;

pub use object_log::ObjectLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishAck {
    pub seq: u64,
    /// The message id was already on the stream; nothing was written.
    pub duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub seq: u64,
    pub msg_id: String,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait LogService: Send + Sync {
    /// Append `payload` to `subject`.
    ///
    /// Idempotent on `msg_id`. With `expected_last_seq` set, the append only
    /// happens if the stream's last sequence equals it. Sequences start at 1.
    async fn publish(
        &self,
        subject: &str,
        msg_id: &str,
        expected_last_seq: Option<u64>,
        payload: Vec<u8>,
    ) -> Result<PublishAck, LogError>;

    async fn last_sequence(&self, subject: &str) -> Result<u64, LogError>;

    /// Pull consumer delivering from `start_seq` onwards.
    async fn subscribe(&self, subject: &str, start_seq: u64) -> Result<Box<dyn LogConsumer>, LogError>;
}

#[async_trait]
pub trait LogConsumer: Send {
    /// Up to `max` messages after the last acknowledged one, waiting at most
    /// `wait` for the first. Unacknowledged messages come back on the next
    /// fetch.
    async fn fetch(&mut self, max: usize, wait: Duration) -> Result<Vec<LogMessage>, LogError>;

    async fn ack(&mut self, seq: u64) -> Result<(), LogError>;

    /// Published but not yet acknowledged.
    async fn pending(&self) -> Result<u64, LogError>;
}
