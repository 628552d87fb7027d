//! Owner notifier — best-effort side channel to a single Telegram chat.
//!
//! Contract: notify-or-log, never propagate. Every outcome (including the
//! failure to record the outcome) ends here; callers cannot observe errors.

use chrono::Utc;
use serde::Deserialize;

use barbe_common::config::AppConfig;
use barbe_common::types::{Appointment, OwnerLogEntry};
use barbe_store::StoreClient;

/// Why the owner is being pinged. Rendered into the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyReason {
    Created,
    Due,
    Cancelled,
}

impl std::fmt::Display for NotifyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyReason::Created => write!(f, "created"),
            NotifyReason::Due => write!(f, "due"),
            NotifyReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
struct TelegramTarget {
    bot_token: String,
    chat_id: i64,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Best-effort alert channel to the shop owner. Disabled (a no-op) when the
/// bot token or target chat id is not configured.
#[derive(Clone)]
pub struct OwnerNotifier {
    target: Option<TelegramTarget>,
    api_base: String,
    client: reqwest::Client,
    store: StoreClient,
}

impl OwnerNotifier {
    pub fn new(config: &AppConfig, store: StoreClient) -> Self {
        let target = match (&config.telegram_bot_token, config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(TelegramTarget {
                bot_token: token.clone(),
                chat_id,
            }),
            _ => None,
        };
        if target.is_none() {
            tracing::info!("owner notifier disabled (no bot token / chat id)");
        }
        Self {
            target,
            api_base: "https://api.telegram.org".to_string(),
            client: reqwest::Client::new(),
            store,
        }
    }

    /// Override the Bot API base URL. Test hook.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Tell the owner about an appointment event. Catches everything
    /// internally; the caller cannot fail because of this.
    pub async fn notify(&self, appointment: &Appointment, reason: NotifyReason) {
        let Some(target) = &self.target else {
            return;
        };

        let text = render_message(appointment, reason);
        let (delivered, detail) = match self.send_message(target, &text).await {
            Ok(()) => (true, serde_json::json!({ "ok": true })),
            Err(detail) => {
                tracing::warn!(
                    appointment_id = appointment.id,
                    %reason,
                    error = %detail,
                    "owner notification failed"
                );
                (false, serde_json::json!({ "error": detail }))
            }
        };

        let entry = OwnerLogEntry {
            appointment_id: appointment.id,
            chat_id: target.chat_id,
            delivered,
            detail,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.append_owner_log(&entry).await {
            tracing::warn!(appointment_id = appointment.id, error = %e, "owner log append failed");
        }
    }

    async fn send_message(&self, target: &TelegramTarget, text: &str) -> Result<(), String> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base, target.bot_token
        );
        let body = serde_json::json!({
            "chat_id": target.chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("sendMessage failed: {e}"))?;

        let result: TelegramApiResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid Telegram response: {e}"))?;

        if result.ok {
            Ok(())
        } else {
            Err(format!(
                "Telegram API error: {}",
                result.description.unwrap_or_default()
            ))
        }
    }
}

fn render_message(appointment: &Appointment, reason: NotifyReason) -> String {
    let header = match reason {
        NotifyReason::Created => "New booking",
        NotifyReason::Due => "Upcoming appointment",
        NotifyReason::Cancelled => "Booking cancelled",
    };
    format!(
        "{header}: {} — {} on {} at {}",
        appointment.name,
        appointment.service,
        appointment.date,
        appointment.time.format("%H:%M"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use barbe_common::types::flexible_time;

    fn make_appointment() -> Appointment {
        Appointment {
            id: 5,
            name: "Marta".to_string(),
            service: "Corte + Barba".to_string(),
            date: "2024-06-02".parse().unwrap(),
            time: flexible_time::parse("15:30").unwrap(),
            user_id: None,
            owner_token: None,
            notification_sent: false,
            created_at: None,
        }
    }

    #[test]
    fn test_render_message_per_reason() {
        let appt = make_appointment();
        assert_eq!(
            render_message(&appt, NotifyReason::Created),
            "New booking: Marta — Corte + Barba on 2024-06-02 at 15:30"
        );
        assert!(render_message(&appt, NotifyReason::Due).starts_with("Upcoming appointment"));
        assert!(render_message(&appt, NotifyReason::Cancelled).starts_with("Booking cancelled"));
    }
}
