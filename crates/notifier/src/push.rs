//! Push-delivery capability.
//!
//! The dispatcher only sees the `PushDelivery` trait: hand it a canonical
//! endpoint+keys subscription and a payload, get back success or a delivery
//! error. Encryption and VAPID signing live entirely behind this seam.

use async_trait::async_trait;
use thiserror::Error;
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder,
};

use barbe_common::types::{NotificationPayload, PushSubscription};

#[derive(Debug, Error)]
pub enum PushError {
    /// VAPID keys are not configured; every send fails until they are.
    #[error("web push is not configured")]
    Disabled,

    /// The push service refused the message (expired/invalid endpoint,
    /// oversized payload, signing failure, ...).
    #[error("push delivery failed: {0}")]
    Delivery(String),
}

/// Capability to send one encrypted payload to an endpoint+keys triple.
#[async_trait]
pub trait PushDelivery: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), PushError>;
}

/// VAPID-signed Web Push delivery.
#[derive(Clone)]
pub struct WebPushSender {
    private_key: String,
    subject: String,
    client: HyperWebPushClient,
}

impl WebPushSender {
    pub fn new(private_key: String, subject: String) -> Self {
        Self {
            private_key,
            subject,
            client: HyperWebPushClient::new(),
        }
    }
}

#[async_trait]
impl PushDelivery for WebPushSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(&self.private_key, web_push::URL_SAFE_NO_PAD, &info)
                .map_err(|e| PushError::Delivery(format!("vapid key rejected: {e}")))?;
        signature.add_claim("sub", self.subject.as_str());
        let signature = signature
            .build()
            .map_err(|e| PushError::Delivery(format!("vapid signing failed: {e}")))?;

        let body = serde_json::to_vec(payload)
            .map_err(|e| PushError::Delivery(format!("payload serialization failed: {e}")))?;

        let mut message = WebPushMessageBuilder::new(&info);
        message.set_payload(ContentEncoding::Aes128Gcm, &body);
        message.set_vapid_signature(signature);
        let message = message
            .build()
            .map_err(|e| PushError::Delivery(e.to_string()))?;

        self.client
            .send(message)
            .await
            .map_err(|e| PushError::Delivery(e.to_string()))
    }
}

/// Stand-in used when VAPID keys are absent. The dispatcher still runs and
/// marks appointments, recording `delivered=false` outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPush;

#[async_trait]
impl PushDelivery for DisabledPush {
    async fn send(
        &self,
        _subscription: &PushSubscription,
        _payload: &NotificationPayload,
    ) -> Result<(), PushError> {
        Err(PushError::Disabled)
    }
}
