//! Typed resource helpers over the raw store client.
//!
//! Table layout: `appointments`, `push_subscriptions`, `services`, plus two
//! append-only log tables, `notification_log` and `owner_notification_log`.
//! Subscription rows are returned raw (`serde_json::Value`) because stored
//! shapes have drifted over time; normalization happens in the engine.

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;

use barbe_common::error::AppError;
use barbe_common::types::{
    Appointment, NewAppointment, NotificationLogEntry, OwnerLogEntry, Service,
};

use crate::client::{CredentialTier, StoreClient, StoreResponse};

impl StoreClient {
    /// List the service catalog.
    pub async fn list_services(&self) -> Result<Vec<Service>, AppError> {
        let body = self
            .request(
                "/services?select=id,title,description,price",
                Method::GET,
                None,
                CredentialTier::Restricted,
            )
            .await?
            .require_ok()?;
        serde_json::from_value(body)
            .map_err(|e| AppError::Internal(format!("unexpected services shape: {e}")))
    }

    /// List appointments, ordered, optionally filtered to one calendar day.
    pub async fn list_appointments(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Appointment>, AppError> {
        let path = match date {
            Some(d) => format!("/appointments?select=*&date=eq.{d}&order=time.asc"),
            None => "/appointments?select=*&order=date.asc,time.asc".to_string(),
        };
        let body = self
            .request(&path, Method::GET, None, CredentialTier::Restricted)
            .await?
            .require_ok()?;
        serde_json::from_value(body)
            .map_err(|e| AppError::Internal(format!("unexpected appointments shape: {e}")))
    }

    /// Fetch a single appointment row.
    pub async fn get_appointment(&self, id: i64) -> Result<Option<Appointment>, AppError> {
        let body = self
            .request(
                &format!("/appointments?select=*&id=eq.{id}"),
                Method::GET,
                None,
                CredentialTier::Admin,
            )
            .await?
            .require_ok()?;
        let mut rows: Vec<Appointment> = serde_json::from_value(body)
            .map_err(|e| AppError::Internal(format!("unexpected appointment shape: {e}")))?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    /// Insert a booking and return the created row (including the owner token).
    pub async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, AppError> {
        let payload = serde_json::json!([appointment]);
        let body = self
            .request(
                "/appointments",
                Method::POST,
                Some(&payload),
                CredentialTier::Restricted,
            )
            .await?
            .require_ok()?;
        let mut rows: Vec<Appointment> = serde_json::from_value(body)
            .map_err(|e| AppError::Internal(format!("unexpected insert response: {e}")))?;
        rows.pop()
            .ok_or_else(|| AppError::Internal("store returned no created row".to_string()))
    }

    /// All appointments the dispatcher has not yet processed. Due-filtering
    /// on the derived reminder instant happens in the engine.
    pub async fn list_unnotified_appointments(&self) -> Result<Vec<Appointment>, AppError> {
        let body = self
            .request(
                "/appointments?select=*&notification_sent=eq.false",
                Method::GET,
                None,
                CredentialTier::Admin,
            )
            .await?
            .require_ok()?;
        serde_json::from_value(body)
            .map_err(|e| AppError::Internal(format!("unexpected appointments shape: {e}")))
    }

    /// Flip the one-shot dispatch flag. Dispatcher-only mutation.
    pub async fn mark_notification_sent(&self, id: i64) -> Result<(), AppError> {
        let patch = serde_json::json!({ "notification_sent": true });
        self.request(
            &format!("/appointments?id=eq.{id}"),
            Method::PATCH,
            Some(&patch),
            CredentialTier::Admin,
        )
        .await?
        .require_ok()?;
        Ok(())
    }

    pub async fn delete_appointment(&self, id: i64) -> Result<(), AppError> {
        self.request(
            &format!("/appointments?id=eq.{id}"),
            Method::DELETE,
            None,
            CredentialTier::Admin,
        )
        .await?
        .require_ok()?;
        tracing::info!(appointment_id = id, "appointment deleted");
        Ok(())
    }

    /// Store a push subscription row as-is.
    pub async fn insert_subscription(&self, record: &Value) -> Result<Value, AppError> {
        let payload = serde_json::json!([record]);
        let body = self
            .request(
                "/push_subscriptions",
                Method::POST,
                Some(&payload),
                CredentialTier::Restricted,
            )
            .await?
            .require_ok()?;
        Ok(body
            .as_array()
            .and_then(|rows| rows.first().cloned())
            .unwrap_or(body))
    }

    /// Raw subscription rows, scoped to one requester or unscoped.
    /// Rows carrying `invalid=true` are dropped here rather than in the
    /// store query: the marker column may not exist, and PostgREST rejects
    /// a SELECT filtering on an unknown column.
    pub async fn list_subscriptions(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<Value>, AppError> {
        let path = match user_id {
            Some(uid) => format!("/push_subscriptions?select=*&user_id=eq.{uid}"),
            None => "/push_subscriptions?select=*".to_string(),
        };
        let body = self
            .request(&path, Method::GET, None, CredentialTier::Admin)
            .await?
            .require_ok()?;
        let rows = body
            .as_array()
            .ok_or_else(|| AppError::Internal("unexpected subscriptions shape".to_string()))?;
        Ok(rows
            .iter()
            .filter(|row| row.get("invalid").and_then(Value::as_bool) != Some(true))
            .cloned()
            .collect())
    }

    /// Mark a malformed subscription so sweeps never retry it. Returns the
    /// raw response: callers fall back to deletion when the store rejects
    /// the patch (the marker column may not exist).
    pub async fn mark_subscription_invalid(&self, id: i64) -> Result<StoreResponse, AppError> {
        let patch = serde_json::json!({ "invalid": true });
        self.request(
            &format!("/push_subscriptions?id=eq.{id}"),
            Method::PATCH,
            Some(&patch),
            CredentialTier::Admin,
        )
        .await
    }

    pub async fn delete_subscription(&self, id: i64) -> Result<(), AppError> {
        self.request(
            &format!("/push_subscriptions?id=eq.{id}"),
            Method::DELETE,
            None,
            CredentialTier::Admin,
        )
        .await?
        .require_ok()?;
        tracing::info!(subscription_id = id, "subscription deleted");
        Ok(())
    }

    /// Append one push-delivery outcome. Append-only; never mutated.
    pub async fn append_notification_log(
        &self,
        entry: &NotificationLogEntry,
    ) -> Result<(), AppError> {
        let payload = serde_json::json!([entry]);
        self.request(
            "/notification_log",
            Method::POST,
            Some(&payload),
            CredentialTier::Admin,
        )
        .await?
        .require_ok()?;
        Ok(())
    }

    /// Append one owner-channel outcome. Append-only; never mutated.
    pub async fn append_owner_log(&self, entry: &OwnerLogEntry) -> Result<(), AppError> {
        let payload = serde_json::json!([entry]);
        self.request(
            "/owner_notification_log",
            Method::POST,
            Some(&payload),
            CredentialTier::Admin,
        )
        .await?
        .require_ok()?;
        Ok(())
    }
}
