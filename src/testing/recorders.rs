use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::database::models::PushSubscription;
use crate::notify::{Mailer, NotifyError, OutgoingEmail, PushDelivery, PushPayload, PushTransport};

/// Mailer that keeps every attempted message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    attempts: Mutex<Vec<OutgoingEmail>>,
    disabled: bool,
    failing: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behaves like a mailer without an API key.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Records the attempt, then fails it.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn attempts(&self) -> Vec<OutgoingEmail> {
        self.attempts.lock().await.clone()
    }

    /// Polls until at least `count` attempts were recorded or one second passed.
    /// Reply emails are sent from a spawned task.
    pub async fn wait_for(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..100 {
            let attempts = self.attempts().await;
            if attempts.len() >= count {
                return attempts;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.attempts().await
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn is_enabled(&self) -> bool {
        !self.disabled
    }

    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        self.attempts.lock().await.push(email);
        if self.failing {
            return Err(NotifyError::Rejected {
                status: 500,
                body: "recording mailer set to fail".to_string(),
            });
        }
        Ok(())
    }
}

/// Push transport answering from a per-endpoint script. Unscripted endpoints are delivered.
#[derive(Debug, Default)]
pub struct RecordingPushTransport {
    script: Mutex<HashMap<String, PushDelivery>>,
    deliveries: Mutex<Vec<(String, PushPayload)>>,
}

impl RecordingPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn respond_with(&self, endpoint: &str, delivery: PushDelivery) {
        self.script.lock().await.insert(endpoint.to_string(), delivery);
    }

    pub async fn deliveries(&self) -> Vec<(String, PushPayload)> {
        self.deliveries.lock().await.clone()
    }
}

#[async_trait]
impl PushTransport for RecordingPushTransport {
    async fn deliver(&self, subscription: &PushSubscription, payload: &PushPayload) -> PushDelivery {
        self.deliveries
            .lock()
            .await
            .push((subscription.endpoint.clone(), payload.clone()));
        self.script
            .lock()
            .await
            .get(&subscription.endpoint)
            .cloned()
            .unwrap_or(PushDelivery::Delivered)
    }
}
