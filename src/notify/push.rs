use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::database::models::PushSubscription;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub data: Value,
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushDelivery {
    Delivered,
    /// Endpoint answered 404 or 410; the subscription is dead.
    Gone(u16),
    Failed(String),
}

impl PushDelivery {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => PushDelivery::Delivered,
            404 | 410 => PushDelivery::Gone(status),
            other => PushDelivery::Failed(format!("status {}", other)),
        }
    }
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, subscription: &PushSubscription, payload: &PushPayload) -> PushDelivery;
}

/// Hands encrypted delivery to an external web-push relay. The relay answers
/// with the push service's status code.
pub struct RelayPushTransport {
    client: reqwest::Client,
    relay_url: Option<String>,
}

impl RelayPushTransport {
    pub fn new(relay_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url,
        }
    }
}

#[async_trait]
impl PushTransport for RelayPushTransport {
    async fn deliver(&self, subscription: &PushSubscription, payload: &PushPayload) -> PushDelivery {
        let Some(url) = self.relay_url.as_deref() else {
            return PushDelivery::Failed("PUSH_RELAY_URL not configured".to_string());
        };

        let body = json!({
            "subscription": {
                "endpoint": subscription.endpoint,
                "keys": { "p256dh": subscription.p256dh, "auth": subscription.auth },
            },
            "payload": payload,
        });

        match self.client.post(url).json(&body).send().await {
            Ok(response) => {
                let delivery = PushDelivery::from_status(response.status().as_u16());
                debug!("Push to {} -> {:?}", subscription.endpoint, delivery);
                delivery
            }
            Err(e) => {
                warn!("Push relay request failed: {}", e);
                PushDelivery::Failed(e.to_string())
            }
        }
    }
}
