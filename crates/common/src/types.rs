use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A booked appointment row from the remote store.
///
/// `date` and `time` are wall-clock values interpreted as UTC; deployments
/// pin both the store and this process to UTC. Unknown columns coming back
/// from the store are ignored on deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub name: String,
    pub service: String,
    pub date: NaiveDate,
    #[serde(with = "flexible_time")]
    pub time: NaiveTime,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub owner_token: Option<String>,
    #[serde(default)]
    pub notification_sent: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Absolute instant of the appointment itself.
    pub fn appointment_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }

    /// Instant at which the reminder becomes due: the appointment instant
    /// minus the configured lead.
    pub fn notification_at(&self, lead_minutes: i64) -> DateTime<Utc> {
        self.appointment_at() - Duration::minutes(lead_minutes)
    }
}

/// Insert payload for a new appointment. The owner token is generated before
/// the insert and always persisted alongside the row.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub name: String,
    pub service: String,
    pub date: NaiveDate,
    #[serde(with = "flexible_time")]
    pub time: NaiveTime,
    pub user_id: Option<String>,
    pub owner_token: String,
    pub notification_sent: bool,
}

/// Canonical web-push subscription: endpoint plus the ECDH key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Human-readable reminder payload, serialized as the push message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

/// Append-only record of one push-delivery attempt. `subscription_id` is
/// null for rows the store returned without an id.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationLogEntry {
    pub appointment_id: i64,
    pub subscription_id: Option<i64>,
    pub delivered: bool,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one owner-channel (bot) message attempt.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerLogEntry {
    pub appointment_id: i64,
    pub chat_id: i64,
    pub delivered: bool,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A catalog entry from the services table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
}

/// Serde helpers for clock times that may arrive with or without seconds
/// ("09:00" from booking forms, "09:00:00" from the store).
pub mod flexible_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(de)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .ok()
    }
}
