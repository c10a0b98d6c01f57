// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use tessera_node::commands::CommandManager;
use tessera_node::config::{NodeConfig, SnapshotStorageKind};
use tessera_node::errors::ShardError;
use tessera_node::network::{HttpRegistryClient, RegistryClient};
use tessera_node::persistence::{NopSnapshotStorage, ObjectSnapshotStorage, SnapshotStorage};
use tessera_node::sample::{self, SampleEngine};
use tessera_node::server::{build_router, AppState};
use tessera_node::shard::Shard;
use tessera_node::store;
use tessera_node::stream::{LogService, ObjectLog};
use tessera_node::telemetry::Telemetry;
use tessera_node::verifier::CommandVerifier;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let telemetry = Telemetry::init();

    if let Err(e) = run(telemetry).await {
        tracing::error!(error = %e, "node stopped");
        std::process::exit(1);
    }
}

async fn run(telemetry: Telemetry) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = NodeConfig::from_env()?;
    cfg.validate()?;
    tracing::info!("Initializing Tessera node with config: {:?}", cfg);

    let op = store::build_operator(&cfg.store)?;
    let log: Arc<dyn LogService> = Arc::new(ObjectLog::new(op.clone(), cfg.log_max_bytes));
    let snapshots: Arc<dyn SnapshotStorage> = match cfg.snapshot_storage {
        SnapshotStorageKind::Nop => Arc::new(NopSnapshotStorage),
        SnapshotStorageKind::ObjectStore => {
            Arc::new(ObjectSnapshotStorage::new(op, &cfg.address.bucket_name()))
        }
    };

    let registry: Option<Arc<dyn RegistryClient>> = match (&cfg.registry_url, cfg.persona_verification) {
        (Some(url), true) => Some(Arc::new(HttpRegistryClient::new(url.clone()))),
        _ => None,
    };
    let verifier = Arc::new(CommandVerifier::new(cfg.address.clone(), registry));
    let commands = Arc::new(CommandManager::new(verifier));
    sample::register_commands(&commands);

    let bind_addr = cfg.bind_addr;
    let mut shard = Shard::new(cfg, SampleEngine::new(), commands.clone(), log, snapshots);
    let app = build_router(AppState { commands, status: shard.status(), telemetry });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
        ctrl_c.cancel();
    });

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);
    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    let result = shard.run(cancel.clone()).await;
    cancel.cancel();
    if let Err(e) = server.await? {
        tracing::warn!(error = %e, "http server error");
    }

    match result {
        Ok(()) | Err(ShardError::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
