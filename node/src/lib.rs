// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod api;
pub mod telemetry;
pub mod store;
pub mod network;
pub mod verifier;
pub mod commands;
pub mod stream;
pub mod persistence;
pub mod shard;
pub mod recovery;
pub mod replication;
pub mod server;
pub mod sample;

#[cfg(test)]
pub(crate) mod test_support;

/// Wall clock in unix milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
