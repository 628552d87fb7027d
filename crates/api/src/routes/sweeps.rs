//! Manual sweep triggers. Same code paths as the timers, surfaced over
//! HTTP so operators can force a run and see the outcome.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use barbe_common::error::AppError;
use barbe_engine::DispatchSummary;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/processNotifications", post(process_notifications))
        .route("/cleanup", post(run_cleanup))
}

async fn process_notifications(
    State(state): State<AppState>,
) -> Result<Json<DispatchSummary>, AppError> {
    let summary = state
        .dispatcher
        .run_once()
        .await
        .map_err(|e| AppError::Internal(format!("dispatch sweep failed: {e}")))?;
    Ok(Json(summary))
}

/// POST /cleanup. Unlike the timer path, delete failures surface here.
async fn run_cleanup(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let deleted = state.cleanup.run_once().await?;
    Ok(Json(json!({ "deleted": deleted })))
}
