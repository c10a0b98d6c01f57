// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Object store backing the epoch log and snapshots.

use opendal::{services, Operator};

use crate::config::StoreConfig;

pub fn build_operator(cfg: &StoreConfig) -> opendal::Result<Operator> {
    let op = match cfg {
        StoreConfig::Memory => Operator::new(services::Memory::default())?.finish(),
        StoreConfig::Fs { root } => {
            let builder = services::Fs::default().root(&root.to_string_lossy());
            Operator::new(builder)?.finish()
        }
        StoreConfig::S3 { bucket, region, endpoint } => {
            let mut builder = services::S3::default().bucket(bucket).region(region);
            if let Some(endpoint) = endpoint {
                builder = builder.endpoint(endpoint);
            }
            Operator::new(builder)?.finish()
        }
    };
    tracing::info!(scheme = %op.info().scheme(), "object store ready");
    Ok(op)
}

/// In-memory operator, for tests and throwaway shards.
pub fn memory() -> opendal::Result<Operator> {
    build_operator(&StoreConfig::Memory)
}
