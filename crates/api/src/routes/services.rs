//! Service catalog route.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use barbe_common::error::AppError;
use barbe_common::types::Service;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/services", get(list_services))
}

/// GET /services — the bookable catalog, straight from the store.
async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<Service>>, AppError> {
    let services = state.store.list_services().await?;
    Ok(Json(services))
}
