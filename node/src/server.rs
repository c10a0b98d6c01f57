// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tessera_kernel::types::SignedCommand;
use tower_http::trace::TraceLayer;

use crate::api::{CommandAccepted, ShardStateResponse};
use crate::commands::CommandManager;
use crate::config::ShardMode;
use crate::errors::CommandError;
use crate::now_ms;
use crate::shard::{ShardPhase, ShardStatus};
use crate::telemetry::Telemetry;

#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<CommandManager>,
    pub status: Arc<ShardStatus>,
    pub telemetry: Telemetry,
}

pub fn build_router(state: AppState) -> Router {
    if state.status.mode() == ShardMode::Leader {
        tracing::info!(kinds = ?state.commands.names(), "command endpoints enabled");
    } else {
        tracing::info!("follower: command endpoints refuse writes");
    }

    Router::new()
        .route("/v1/command/:name", post(submit_command))
        .route("/v1/shard/state", get(shard_state))
        // Observability
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn submit_command(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<CommandAccepted>, CommandError> {
    match accept_command(&state, &name, &body).await {
        Ok(()) => {
            metrics::counter!("tessera_commands_accepted_total", 1, "kind" => name);
            Ok(Json(CommandAccepted::default()))
        }
        Err(e) => {
            tracing::debug!(kind = %name, code = e.code(), error = %e, "command rejected");
            metrics::counter!("tessera_commands_rejected_total", 1, "code" => e.code());
            Err(e)
        }
    }
}

async fn accept_command(state: &AppState, name: &str, body: &[u8]) -> Result<(), CommandError> {
    if state.status.mode() != ShardMode::Leader {
        return Err(CommandError::NotLeader);
    }
    let phase = state.status.phase();
    if phase != ShardPhase::Running {
        return Err(CommandError::Unavailable(format!("shard is {}", phase.as_str())));
    }
    let signed: SignedCommand =
        serde_json::from_slice(body).map_err(|e| CommandError::Malformed(e.to_string()))?;
    state.commands.submit(name, signed, now_ms()).await
}

async fn shard_state(State(state): State<AppState>) -> Json<ShardStateResponse> {
    let status = &state.status;
    let snapshots = status.snapshots();
    Json(ShardStateResponse {
        phase: status.phase().as_str().to_string(),
        mode: status.mode(),
        tick_height: status.tick_height(),
        epoch_height: status.epoch_height(),
        last_published_seq: status.last_published_seq(),
        snapshots_written: snapshots.written(),
        snapshot_failures: snapshots.failures(),
        last_snapshot_error: snapshots.last_error(),
    })
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.telemetry.render()
}
