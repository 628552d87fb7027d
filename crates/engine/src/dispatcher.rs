//! Notification dispatcher — the reminder sweep.
//!
//! Each run: find due appointments, fan out one push per stored
//! subscription, log every delivery outcome, ping the owner channel, and
//! mark the row processed. At-most-one-sweep semantics: a row is marked
//! `notification_sent` even when every delivery attempt failed, so a
//! permanently undeliverable appointment is never retried.
//!
//! Appointments and subscriptions are processed sequentially to keep
//! log-write ordering deterministic and avoid hammering the push and log
//! endpoints.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::time::MissedTickBehavior;

use barbe_common::config::AppConfig;
use barbe_common::types::{Appointment, NotificationLogEntry, NotificationPayload};
use barbe_notifier::{NotifyReason, OwnerNotifier, PushDelivery};
use barbe_store::StoreClient;

use crate::normalizer::{Normalized, normalize};

/// Counters for one sweep run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DispatchSummary {
    /// Appointments whose reminder instant had passed.
    pub due: usize,
    /// Push sends that the delivery capability accepted.
    pub delivered: usize,
    /// Push sends that failed (logged, not retried).
    pub failed: usize,
    /// Subscription records flagged invalid or deleted this run.
    pub invalidated: usize,
}

pub struct NotificationDispatcher {
    store: StoreClient,
    push: Arc<dyn PushDelivery>,
    owner: OwnerNotifier,
    lead_minutes: i64,
    broadcast_fallback: bool,
}

impl NotificationDispatcher {
    pub fn new(
        store: StoreClient,
        push: Arc<dyn PushDelivery>,
        owner: OwnerNotifier,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            push,
            owner,
            lead_minutes: config.notification_lead_minutes,
            broadcast_fallback: config.broadcast_fallback,
        }
    }

    /// One sweep. Failures in one appointment never abort the others.
    pub async fn run_once(&self) -> anyhow::Result<DispatchSummary> {
        let now = Utc::now();
        let due: Vec<Appointment> = self
            .store
            .list_unnotified_appointments()
            .await?
            .into_iter()
            .filter(|a| a.notification_at(self.lead_minutes) <= now)
            .collect();

        let mut summary = DispatchSummary {
            due: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            return Ok(summary);
        }

        tracing::info!(due = due.len(), "dispatching reminders");
        for appointment in &due {
            if let Err(e) = self.process_appointment(appointment, &mut summary).await {
                tracing::error!(
                    appointment_id = appointment.id,
                    error = %e,
                    "appointment dispatch failed"
                );
            }
        }
        Ok(summary)
    }

    /// Timer loop. Errors are logged and swallowed; the next tick retries
    /// whatever is still unmarked.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(summary) if summary.due > 0 => tracing::info!(
                    due = summary.due,
                    delivered = summary.delivered,
                    failed = summary.failed,
                    invalidated = summary.invalidated,
                    "dispatch sweep finished"
                ),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "dispatch sweep failed"),
            }
        }
    }

    async fn process_appointment(
        &self,
        appointment: &Appointment,
        summary: &mut DispatchSummary,
    ) -> anyhow::Result<()> {
        let subscribers = self.resolve_subscribers(appointment).await?;
        let payload = build_payload(appointment);

        for record in &subscribers {
            let subscription_id = record.get("id").and_then(Value::as_i64);
            match normalize(record) {
                Normalized::Usable(subscription) => {
                    let (delivered, detail) = match self.push.send(&subscription, &payload).await {
                        Ok(()) => {
                            summary.delivered += 1;
                            (true, serde_json::json!({ "ok": true }))
                        }
                        Err(e) => {
                            summary.failed += 1;
                            tracing::warn!(
                                appointment_id = appointment.id,
                                subscription_id,
                                error = %e,
                                "push delivery failed"
                            );
                            (false, serde_json::json!({ "error": e.to_string() }))
                        }
                    };
                    self.log_outcome(appointment.id, subscription_id, delivered, detail)
                        .await;
                }
                Normalized::EndpointOnly(_) | Normalized::Unusable => {
                    summary.invalidated += 1;
                    if let Some(id) = subscription_id {
                        self.retire_subscription(id).await;
                    } else {
                        tracing::warn!(
                            appointment_id = appointment.id,
                            "unusable subscription record without id, skipping"
                        );
                    }
                }
            }
        }

        self.owner.notify(appointment, NotifyReason::Due).await;

        // Marked unconditionally, after the owner ping, regardless of how
        // many pushes landed.
        self.store.mark_notification_sent(appointment.id).await?;
        Ok(())
    }

    /// Subscriptions scoped to the appointment's requester; for anonymous
    /// appointments the fan-out target is an explicit policy choice
    /// (broadcast to everyone, or skip).
    async fn resolve_subscribers(
        &self,
        appointment: &Appointment,
    ) -> anyhow::Result<Vec<Value>> {
        match appointment.user_id.as_deref() {
            Some(user_id) => Ok(self.store.list_subscriptions(Some(user_id)).await?),
            None if self.broadcast_fallback => Ok(self.store.list_subscriptions(None).await?),
            None => {
                tracing::debug!(
                    appointment_id = appointment.id,
                    "no user_id and broadcast fallback off, skipping push fan-out"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Flag a malformed record invalid; fall back to deleting it when the
    /// store rejects the patch. Either way, sweeps never see it again.
    async fn retire_subscription(&self, id: i64) {
        match self.store.mark_subscription_invalid(id).await {
            Ok(response) if response.ok => {
                tracing::info!(subscription_id = id, "subscription marked invalid");
            }
            Ok(response) => {
                tracing::warn!(
                    subscription_id = id,
                    status = response.status,
                    "invalid-marker patch rejected, deleting record"
                );
                if let Err(e) = self.store.delete_subscription(id).await {
                    tracing::warn!(subscription_id = id, error = %e, "subscription delete failed");
                }
            }
            Err(e) => {
                tracing::warn!(subscription_id = id, error = %e, "subscription patch failed");
            }
        }
    }

    /// Append one delivery log row. Best-effort: failures are traced only.
    async fn log_outcome(
        &self,
        appointment_id: i64,
        subscription_id: Option<i64>,
        delivered: bool,
        detail: Value,
    ) {
        let entry = NotificationLogEntry {
            appointment_id,
            subscription_id,
            delivered,
            detail,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.append_notification_log(&entry).await {
            tracing::warn!(appointment_id, subscription_id, error = %e, "log append failed");
        }
    }
}

/// One payload per appointment, shared across its subscriptions.
pub fn build_payload(appointment: &Appointment) -> NotificationPayload {
    NotificationPayload {
        title: "Upcoming appointment".to_string(),
        body: format!(
            "Your {} appointment is at {}",
            appointment.service,
            appointment.time.format("%H:%M")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barbe_common::types::flexible_time;

    #[test]
    fn test_payload_templates_service_and_time() {
        let appointment = Appointment {
            id: 1,
            name: "Ana".to_string(),
            service: "Corte".to_string(),
            date: "2024-06-01".parse().unwrap(),
            time: flexible_time::parse("09:00").unwrap(),
            user_id: None,
            owner_token: None,
            notification_sent: false,
            created_at: None,
        };
        let payload = build_payload(&appointment);
        assert_eq!(payload.title, "Upcoming appointment");
        assert_eq!(payload.body, "Your Corte appointment is at 09:00");
    }
}
