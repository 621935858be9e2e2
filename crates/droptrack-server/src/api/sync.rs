//! Manual cycle trigger.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use droptrack_sync::CycleOptions;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Default, Deserialize)]
pub(super) struct SyncRequest {
    #[serde(default)]
    pub dry_run: bool,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncData {
    status: &'static str,
}

/// Kicks off an aggregation cycle in the background.
///
/// Cycles are serialized: if one is already running (scheduled or manual),
/// the request is rejected with `conflict` instead of queuing — the caller
/// can simply retry after the current cycle completes.
pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<ApiResponse<SyncData>>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    if state.cycle_lock.try_lock().is_err() {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "a sync cycle is already running",
        ));
    }

    let options = CycleOptions {
        dry_run: request.dry_run,
        pause_secs: None,
        source: request.source,
    };

    let state_for_task = state.clone();
    tokio::spawn(async move {
        // Re-acquire inside the task; the guard above only probed availability.
        let _guard = state_for_task.cycle_lock.lock().await;
        let result = droptrack_sync::run_cycle(
            &state_for_task.pool,
            &state_for_task.config,
            &state_for_task.retailers,
            state_for_task.fetcher.as_ref(),
            &state_for_task.hub,
            "api",
            &options,
        )
        .await;

        if let Err(e) = result {
            tracing::error!(error = %format!("{e:#}"), "manual sync cycle failed");
        }
    });

    Ok(Json(ApiResponse {
        data: SyncData { status: "started" },
        meta: ResponseMeta::new(req_id.0),
    }))
}
