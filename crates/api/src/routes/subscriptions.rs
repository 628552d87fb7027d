//! Push subscription intake and the VAPID key handshake.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use barbe_common::error::AppError;
use barbe_engine::normalizer::{normalize, Normalized};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/vapidPublicKey", get(vapid_public_key))
}

/// POST /subscribe. Bodies arrive in whatever shape the client's service
/// worker produced; normalization decides what gets persisted. Only the
/// canonical flat columns are written, so new rows never add to the drift.
async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let mut record = match normalize(&body) {
        Normalized::Usable(subscription) => json!({
            "endpoint": subscription.endpoint,
            "p256dh": subscription.keys.p256dh,
            "auth": subscription.keys.auth,
        }),
        Normalized::EndpointOnly(endpoint) => {
            tracing::warn!(%endpoint, "subscription stored without keys");
            json!({ "endpoint": endpoint })
        }
        Normalized::Unusable => {
            return Err(AppError::Validation("missing endpoint".to_string()));
        }
    };

    if let Some(user_id) = body.get("user_id").and_then(Value::as_str) {
        record["user_id"] = json!(user_id);
    }
    if let Some(metadata) = body.get("metadata") {
        if !metadata.is_null() {
            record["metadata"] = metadata.clone();
        }
    }

    let stored = state.store.insert_subscription(&record).await?;
    Ok(Json(stored))
}

/// GET /vapidPublicKey. Browsers need the public key to subscribe;
/// `enabled` tells them whether the backend can actually deliver.
async fn vapid_public_key(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "publicKey": state.config.vapid_public_key.clone().unwrap_or_default(),
        "enabled": state.config.push_enabled(),
    }))
}
