// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tessera_kernel::error::KernelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Rejections handed back to command submitters. None of these are retried
/// by the shard itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Malformed(String),
    #[error("command addressed to shard {0}")]
    WrongShard(String),
    #[error("unknown command kind {0:?}")]
    UnknownCommand(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("command already accepted")]
    Replayed,
    #[error("command expired (timestamp {timestamp}, now {now})")]
    Expired { timestamp: u64, now: u64 },
    #[error("command timestamp {timestamp} is ahead of now {now}")]
    FromFuture { timestamp: u64, now: u64 },
    #[error("command channel {0:?} is full")]
    ChannelFull(String),
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),
    #[error("shard not accepting commands: {0}")]
    Unavailable(String),
    #[error("commands are only accepted by the leader")]
    NotLeader,
}

impl CommandError {
    /// Stable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Malformed(_) | CommandError::WrongShard(_) => "MALFORMED",
            CommandError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            CommandError::Unauthorized(_) => "UNAUTHORIZED",
            CommandError::Replayed => "REPLAYED",
            CommandError::Expired { .. } | CommandError::FromFuture { .. } => "EXPIRED",
            CommandError::ChannelFull(_)
            | CommandError::RegistryUnavailable(_)
            | CommandError::Unavailable(_) => "UNAVAILABLE",
            CommandError::NotLeader => "NOT_LEADER",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            "MALFORMED" | "EXPIRED" => StatusCode::BAD_REQUEST,
            "UNKNOWN_COMMAND" => StatusCode::NOT_FOUND,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "REPLAYED" => StatusCode::CONFLICT,
            "NOT_LEADER" => StatusCode::FORBIDDEN,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("log storage error: {0}")]
    Storage(#[from] opendal::Error),
    #[error("wrong last sequence: expected {expected}, stream is at {actual}")]
    WrongLastSequence { expected: u64, actual: u64 },
    #[error("stream full: {used} + {incoming} bytes exceeds cap {cap}")]
    StreamFull { used: u64, incoming: u64, cap: u64 },
    #[error("corrupt log object {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("no snapshot stored")]
    NotFound,
    #[error("snapshot storage error: {0}")]
    Storage(#[from] opendal::Error),
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
    #[error("snapshot encoding: {0}")]
    Kernel(#[from] KernelError),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Network(String),
    #[error("registry returned status {0}")]
    Status(u16),
    #[error("registry response rejected: {0}")]
    Schema(String),
}

#[derive(Error, Debug)]
pub enum ShardError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error("engine error: {0}")]
    Engine(String),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("epoch height mismatch: shard at {expected}, got {got}")]
    EpochHeightMismatch { expected: u64, got: u64 },
    #[error("tick height mismatch: shard at {expected}, got {got}")]
    TickHeightMismatch { expected: u64, got: u64 },
    #[error("epoch {epoch} holds {got} ticks, want {expected}")]
    EpochSize { epoch: u64, expected: u64, got: usize },
    #[error("state hash mismatch at epoch {epoch}: recorded {recorded}, computed {computed}")]
    StateHashMismatch { epoch: u64, recorded: String, computed: String },
    #[error("published epoch {epoch} landed at sequence {seq}")]
    SequenceMismatch { epoch: u64, seq: u64 },
    #[error("cancelled")]
    Cancelled,
}

impl ShardError {
    pub fn engine(e: impl std::error::Error) -> Self {
        ShardError::Engine(e.to_string())
    }

    /// Consistency failures: the shard must stop rather than keep running
    /// on divergent state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShardError::Engine(_)
                | ShardError::EpochHeightMismatch { .. }
                | ShardError::TickHeightMismatch { .. }
                | ShardError::EpochSize { .. }
                | ShardError::StateHashMismatch { .. }
                | ShardError::SequenceMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_to_status() {
        assert_eq!(CommandError::Replayed.status(), StatusCode::CONFLICT);
        assert_eq!(CommandError::NotLeader.status(), StatusCode::FORBIDDEN);
        assert_eq!(CommandError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(CommandError::FromFuture { timestamp: 2, now: 1 }.code(), "EXPIRED");
        assert_eq!(CommandError::ChannelFull("move".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(CommandError::UnknownCommand("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(CommandError::WrongShard("a/b/c/d".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ShardError::StateHashMismatch { epoch: 1, recorded: "aa".into(), computed: "bb".into() }.is_fatal());
        assert!(ShardError::EpochHeightMismatch { expected: 2, got: 4 }.is_fatal());
        assert!(!ShardError::Command(CommandError::RegistryUnavailable("down".into())).is_fatal());
        assert!(!ShardError::Cancelled.is_fatal());
    }
}
