use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::guard::ensure_view;
use crate::access::{AccessError, AccessResult, Identity};
use crate::config::NotifyConfig;
use crate::database::models::NewSubscription;
use crate::database::Store;
use crate::notify::{PushDelivery, PushPayload, PushTransport};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: Option<String>,
    pub auth: Option<String>,
}

/// Browser `PushSubscription.toJSON()` shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionBody {
    pub endpoint: Option<String>,
    #[serde(default)]
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub user_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub subscription: Option<SubscriptionBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub customer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReport {
    pub sent: usize,
    pub total: usize,
    pub pruned: usize,
}

fn required(value: Option<String>, field: &'static str) -> AccessResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AccessError::validation(field, format!("{} is required", field)))
}

pub struct PushService {
    store: Arc<dyn Store>,
    transport: Arc<dyn PushTransport>,
    notify: NotifyConfig,
}

impl PushService {
    pub fn new(store: Arc<dyn Store>, transport: Arc<dyn PushTransport>, notify: NotifyConfig) -> Self {
        Self { store, transport, notify }
    }

    /// Registers the caller's browser endpoint. Subscriptions are always owned by the caller.
    pub async fn subscribe(&self, identity: &Identity, request: SubscribeRequest) -> AccessResult<()> {
        if request.user_id.is_some_and(|id| id != identity.user_id()) {
            return Err(AccessError::forbidden("Cannot subscribe on behalf of another user"));
        }
        if let Some(customer_id) = request.customer_id {
            ensure_view(identity, customer_id)?;
        }

        let body = request.subscription.unwrap_or_default();
        let endpoint = required(body.endpoint, "endpoint")?;
        let p256dh = required(body.keys.p256dh, "p256dh")?;
        let auth = required(body.keys.auth, "auth")?;

        self.store
            .upsert_subscription(NewSubscription {
                user_id: identity.user_id(),
                customer_id: request.customer_id,
                endpoint,
                p256dh,
                auth,
            })
            .await?;
        info!("Push subscription saved for {}", identity.user_id());
        Ok(())
    }

    pub async fn unsubscribe(&self, identity: &Identity, endpoint: Option<String>) -> AccessResult<bool> {
        let endpoint = required(endpoint, "endpoint")?;
        Ok(self.store.delete_subscription(identity.user_id(), &endpoint).await?)
    }

    /// Fans a notification out to every matching subscription. A user target
    /// wins over a customer target. Dead endpoints are pruned.
    pub async fn send(&self, request: SendRequest) -> AccessResult<SendReport> {
        let title = required(request.title, "title")?;
        let body = required(request.body, "body")?;

        let subscriptions = match (request.user_id, request.customer_id) {
            (Some(user_id), _) => self.store.subscriptions_for_user(user_id).await?,
            (None, Some(customer_id)) => self.store.subscriptions_for_customer(customer_id).await?,
            (None, None) => {
                return Err(AccessError::validation("target", "customerId or userId is required"));
            }
        };

        let total = subscriptions.len();
        if total == 0 {
            info!("No push subscriptions found");
            return Ok(SendReport { sent: 0, total: 0, pruned: 0 });
        }

        let payload = PushPayload {
            title,
            body,
            icon: self.notify.push_icon.clone(),
            badge: self.notify.push_badge.clone(),
            data: request.data.unwrap_or_else(|| Value::Object(Default::default())),
        };

        let deliveries = join_all(
            subscriptions
                .iter()
                .map(|sub| self.transport.deliver(sub, &payload)),
        )
        .await;

        let mut sent = 0;
        let mut pruned = 0;
        for (sub, delivery) in subscriptions.iter().zip(deliveries) {
            match delivery {
                PushDelivery::Delivered => sent += 1,
                PushDelivery::Gone(status) => {
                    warn!("Push endpoint answered {}; removing subscription", status);
                    match self.store.delete_subscriptions_by_endpoint(&sub.endpoint).await {
                        Ok(n) => pruned += n as usize,
                        Err(e) => warn!("Failed to prune push subscription: {}", e),
                    }
                }
                PushDelivery::Failed(reason) => warn!("Push delivery failed: {}", reason),
            }
        }

        info!("Push sent {}/{}", sent, total);
        Ok(SendReport { sent, total, pruned })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{resolve, Role};
    use crate::auth::Principal;
    use crate::testing::{MemoryStore, RecordingPushTransport};

    fn subscription(endpoint: &str) -> SubscriptionBody {
        SubscriptionBody {
            endpoint: Some(endpoint.into()),
            keys: SubscriptionKeys {
                p256dh: Some("k".into()),
                auth: Some("a".into()),
            },
        }
    }

    #[tokio::test]
    async fn subscribe_is_scoped_to_caller() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingPushTransport::new());
        let service = PushService::new(store.clone(), transport, NotifyConfig::default());
        let customer = store.add_customer("Bella", None, None).await;
        let other = store.add_customer("Other", None, None).await;
        let principal = Principal {
            id: Uuid::new_v4(),
            email: "a@bella.test".into(),
        };
        store.add_customer_membership(principal.id, customer, Role::Member, None).await;
        let me = resolve(store.as_ref(), &principal, false).await.unwrap();

        let impersonate = SubscribeRequest {
            user_id: Some(Uuid::new_v4()),
            subscription: Some(subscription("https://push/1")),
            ..SubscribeRequest::default()
        };
        assert!(matches!(service.subscribe(&me, impersonate).await, Err(AccessError::Forbidden(_))));

        let foreign = SubscribeRequest {
            customer_id: Some(other),
            subscription: Some(subscription("https://push/1")),
            ..SubscribeRequest::default()
        };
        assert!(matches!(service.subscribe(&me, foreign).await, Err(AccessError::Forbidden(_))));

        let missing = SubscribeRequest::default();
        assert!(matches!(
            service.subscribe(&me, missing).await,
            Err(AccessError::Validation { field: "endpoint", .. })
        ));

        for _ in 0..2 {
            let ok = SubscribeRequest {
                customer_id: Some(customer),
                subscription: Some(subscription("https://push/1")),
                ..SubscribeRequest::default()
            };
            service.subscribe(&me, ok).await.unwrap();
        }
        assert_eq!(store.subscriptions().await.len(), 1);

        assert!(service.unsubscribe(&me, Some("https://push/1".into())).await.unwrap());
        assert!(store.subscriptions().await.is_empty());
    }

    #[tokio::test]
    async fn send_prunes_gone_endpoints() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingPushTransport::new());
        let service = PushService::new(store.clone(), transport.clone(), NotifyConfig::default());
        let customer = store.add_customer("Bella", None, None).await;
        store.add_subscription(Uuid::new_v4(), Some(customer), "https://push/ok").await;
        store.add_subscription(Uuid::new_v4(), Some(customer), "https://push/gone").await;
        store.add_subscription(Uuid::new_v4(), Some(customer), "https://push/down").await;
        transport.respond_with("https://push/gone", PushDelivery::Gone(410)).await;
        transport
            .respond_with("https://push/down", PushDelivery::Failed("timeout".into()))
            .await;

        let report = service
            .send(SendRequest {
                customer_id: Some(customer),
                title: Some("New guest".into()),
                body: Some("A guest needs help".into()),
                ..SendRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(report, SendReport { sent: 1, total: 3, pruned: 1 });
        let remaining: Vec<String> = store.subscriptions().await.into_iter().map(|s| s.endpoint).collect();
        assert_eq!(remaining, vec!["https://push/ok".to_string(), "https://push/down".to_string()]);

        let (_, payload) = &transport.deliveries().await[0];
        assert_eq!(payload.icon, "/icons/icon-192x192.png");
    }

    #[tokio::test]
    async fn send_requires_target_and_text() {
        let store = Arc::new(MemoryStore::new());
        let service = PushService::new(store, Arc::new(RecordingPushTransport::new()), NotifyConfig::default());

        let no_target = SendRequest {
            title: Some("t".into()),
            body: Some("b".into()),
            ..SendRequest::default()
        };
        assert!(matches!(
            service.send(no_target).await,
            Err(AccessError::Validation { field: "target", .. })
        ));
        assert!(matches!(
            service.send(SendRequest::default()).await,
            Err(AccessError::Validation { field: "title", .. })
        ));
    }
}
