//! Resilient client for the hosted data store's REST interface.
//!
//! Wraps every outbound call with retry/backoff for transient transport
//! failures. Non-2xx responses are never retried; they pass through as a
//! `StoreResponse` with `ok: false` for the caller to interpret.

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use barbe_common::config::AppConfig;
use barbe_common::error::AppError;

/// Which credential accompanies a store call.
///
/// The restricted key is the one that is safe to hand to clients; the
/// administrative key is server-only and used for log appends, subscription
/// fan-out, cleanup, and patch/delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTier {
    Restricted,
    Admin,
}

/// Outcome of one store call that reached the remote side.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub ok: bool,
    pub status: u16,
    pub body: Value,
}

impl StoreResponse {
    /// Unwrap a successful response body, surfacing non-2xx as a structured
    /// store error.
    pub fn require_ok(self) -> Result<Value, AppError> {
        if self.ok {
            Ok(self.body)
        } else {
            Err(AppError::Store {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// HTTP client for the remote data store.
#[derive(Debug, Clone)]
pub struct StoreClient {
    base_url: String,
    anon_key: String,
    service_key: String,
    max_attempts: u32,
    http: reqwest::Client,
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.store_url.trim_end_matches('/').to_string(),
            anon_key: config.store_anon_key.clone(),
            service_key: config.store_service_key.clone(),
            max_attempts: config.store_max_attempts.max(1),
            http: reqwest::Client::new(),
        }
    }

    /// Perform one logical store call.
    ///
    /// `path` is either an absolute URL or a resource path appended to
    /// `{base}/rest/v1`. Transport failures classified as transient are
    /// retried with exponential backoff; exhausting attempts surfaces the
    /// last transport error. Response bodies are parsed as JSON when
    /// possible and passed through as raw text otherwise.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
        tier: CredentialTier,
    ) -> Result<StoreResponse, AppError> {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/rest/v1{}", self.base_url, path)
        };
        let key = match tier {
            CredentialTier::Restricted => &self.anon_key,
            CredentialTier::Admin => &self.service_key,
        };

        let response = retry_with_backoff(
            self.max_attempts,
            || {
                let mut req = self
                    .http
                    .request(method.clone(), &url)
                    .header("apikey", key.as_str())
                    .bearer_auth(key)
                    .header("Content-Type", "application/json")
                    .header("Prefer", "return=representation");
                if let Some(b) = body {
                    req = req.json(b);
                }
                req.send()
            },
            is_transient,
        )
        .await?;

        let status = response.status().as_u16();
        let ok = response.status().is_success();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if !ok {
            tracing::debug!(%url, status, "store call returned non-2xx");
        }

        Ok(StoreResponse { ok, status, body })
    }
}

/// Whether a transport error is worth retrying: connection failures
/// (reset/refused/DNS) and timeouts. Anything that produced an HTTP
/// response is not a transport error and never lands here.
pub fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Backoff before retry `attempt` (1-based): `200ms * 2^(attempt-1)`,
/// capped so an absurd attempt count cannot overflow the shift.
pub fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(10);
    Duration::from_millis(200u64 << shift)
}

/// Run `op` up to `max_attempts` times, sleeping between attempts, retrying
/// only errors that `transient` classifies as such.
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    max_attempts: u32,
    mut op: F,
    transient: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && transient(&err) => {
                tracing::warn!(attempt, max_attempts, "transient store failure, retrying");
                tokio::time::sleep(backoff_delay(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
