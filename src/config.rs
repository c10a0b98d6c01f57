// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Protocol constants.

/// A command older than this (relative to the leader's clock) is expired.
pub const COMMAND_TTL_MS: u64 = 120_000;

/// Tolerated clock drift for commands stamped in the future.
pub const MAX_CLOCK_DRIFT_MS: u64 = 2_000;

/// Extra lifetime of a replay-cache entry beyond the TTL window.
pub const REPLAY_CACHE_GRACE_MS: u64 = 10_000;

/// Capacity of each per-kind command channel.
pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Smallest accepted epoch frequency (ticks per epoch).
pub const MIN_EPOCH_FREQUENCY: u64 = 10;

/// Object name of the current snapshot inside the shard's bucket.
pub const SNAPSHOT_OBJECT_NAME: &str = "snapshot";

/// Length of the per-command salt.
pub const SALT_LEN: usize = 16;
