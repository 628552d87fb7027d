use serde::Deserialize;

/// Global application configuration loaded from environment variables.
///
/// Constructed once in `main` and passed to each component; nothing else
/// reads the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the hosted data store (trailing slash stripped).
    /// REST calls go to `{store_url}/rest/v1{path}`.
    pub store_url: String,

    /// Restricted (client-safe) API key for the data store.
    pub store_anon_key: String,

    /// Administrative API key, used only server-side for log appends,
    /// subscription fan-out, cleanup and patch/delete. Falls back to the
    /// restricted key when not set.
    pub store_service_key: String,

    /// HTTP listen port (default: 3333)
    pub port: u16,

    /// Minutes before the appointment instant at which the reminder fires
    /// (default: 60)
    pub notification_lead_minutes: i64,

    /// Dispatcher sweep interval in seconds (default: 60)
    pub dispatch_interval_secs: u64,

    /// Cleanup sweep interval in seconds (default: 86400)
    pub cleanup_interval_secs: u64,

    /// Maximum attempts per remote store call (default: 3)
    pub store_max_attempts: u32,

    /// VAPID public key, served to browsers; push delivery is disabled
    /// unless both VAPID keys are present
    pub vapid_public_key: Option<String>,

    /// VAPID private key (base64, URL-safe)
    pub vapid_private_key: Option<String>,

    /// VAPID subject claim (default: "mailto:admin@example.com")
    pub vapid_subject: String,

    /// Telegram bot token for owner notifications
    pub telegram_bot_token: Option<String>,

    /// Telegram chat id the owner notifications go to
    pub telegram_chat_id: Option<i64>,

    /// Fan out to every stored subscription when an appointment has no
    /// `user_id` (legacy behavior). Off by default: such appointments get
    /// no push fan-out, only the owner notification.
    pub broadcast_fallback: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store_url = std::env::var("STORE_URL")
            .map_err(|_| anyhow::anyhow!("STORE_URL environment variable is required"))?
            .trim_end_matches('/')
            .to_string();
        let store_anon_key = std::env::var("STORE_ANON_KEY")
            .map_err(|_| anyhow::anyhow!("STORE_ANON_KEY environment variable is required"))?;
        let store_service_key =
            std::env::var("STORE_SERVICE_KEY").unwrap_or_else(|_| store_anon_key.clone());

        Ok(Self {
            store_url,
            store_anon_key,
            store_service_key,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3333".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
            notification_lead_minutes: std::env::var("NOTIFICATION_LEAD_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("NOTIFICATION_LEAD_MINUTES must be a valid i64"))?,
            dispatch_interval_secs: std::env::var("DISPATCH_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPATCH_INTERVAL_SECS must be a valid u64"))?,
            cleanup_interval_secs: std::env::var("CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CLEANUP_INTERVAL_SECS must be a valid u64"))?,
            store_max_attempts: std::env::var("STORE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("STORE_MAX_ATTEMPTS must be a valid u32"))?,
            vapid_public_key: std::env::var("VAPID_PUBLIC_KEY").ok(),
            vapid_private_key: std::env::var("VAPID_PRIVATE_KEY").ok(),
            vapid_subject: std::env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| "mailto:admin@example.com".to_string()),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID")
                .ok()
                .and_then(|v| v.parse().ok()),
            broadcast_fallback: std::env::var("BROADCAST_FALLBACK")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    /// Whether web-push delivery is configured.
    pub fn push_enabled(&self) -> bool {
        self.vapid_public_key.is_some() && self.vapid_private_key.is_some()
    }
}
