//! Booking routes: list, create, and ownership-gated cancellation.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

use barbe_common::error::AppError;
use barbe_common::types::{flexible_time, Appointment, NewAppointment};
use barbe_engine::ownership::authorize_delete;
use barbe_notifier::NotifyReason;

use crate::state::AppState;

const OWNER_TOKEN_LEN: usize = 32;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route("/appointments/{id}", delete(delete_appointment))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    date: Option<NaiveDate>,
}

async fn list_appointments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = state.store.list_appointments(query.date).await?;
    Ok(Json(appointments))
}

/// Create request body. Every field is optional at the serde layer so
/// that validation can name the missing one instead of returning an
/// opaque 422.
#[derive(Debug, Deserialize)]
struct CreateRequest {
    name: Option<String>,
    service: Option<String>,
    date: Option<String>,
    time: Option<String>,
    user_id: Option<String>,
}

impl CreateRequest {
    /// Validate fields before anything touches the store.
    fn validated(self) -> Result<(String, String, NaiveDate, NaiveTime, Option<String>), AppError> {
        let name = non_empty(self.name, "name")?;
        let service = non_empty(self.service, "service")?;
        let raw_date = non_empty(self.date, "date")?;
        let raw_time = non_empty(self.time, "time")?;
        let date: NaiveDate = raw_date
            .parse()
            .map_err(|_| AppError::Validation(format!("invalid date '{raw_date}'")))?;
        let time = flexible_time::parse(&raw_time)
            .ok_or_else(|| AppError::Validation(format!("invalid time '{raw_time}'")))?;
        Ok((name, service, date, time, self.user_id))
    }
}

fn non_empty(field: Option<String>, label: &str) -> Result<String, AppError> {
    field
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("missing field '{label}'")))
}

fn generate_owner_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(OWNER_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// POST /appointments. Returns the created row, owner token included;
/// the token is the anonymous caller's only proof of ownership.
async fn create_appointment(
    State(state): State<AppState>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<Appointment>, AppError> {
    let (name, service, date, time, user_id) = request.validated()?;

    let new_appointment = NewAppointment {
        name,
        service,
        date,
        time,
        user_id,
        owner_token: generate_owner_token(),
        notification_sent: false,
    };
    let created = state.store.insert_appointment(&new_appointment).await?;
    tracing::info!(appointment_id = created.id, "appointment created");

    state.owner.notify(&created, NotifyReason::Created).await;
    Ok(Json(created))
}

async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .store
        .get_appointment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id} not found")))?;

    let user_header = header_str(&headers, "x-user-id");
    let token_header = header_str(&headers, "x-owner-token");
    authorize_delete(&appointment, user_header, token_header)?;

    state.store.delete_appointment(id).await?;
    state.owner.notify(&appointment, NotifyReason::Cancelled).await;
    Ok(Json(json!({ "deleted": true })))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
