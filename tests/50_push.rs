mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{TestApp, INTERNAL_KEY};
use support_desk_api::access::Role;
use support_desk_api::notify::PushDelivery;

fn subscription(endpoint: &str) -> Value {
    json!({ "endpoint": endpoint, "keys": { "p256dh": "BNc...", "auth": "tBH..." } })
}

async fn send_push(app: &TestApp, key: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/push/send")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("X-Internal-API-Key", key);
    }
    app.dispatch(builder.body(Body::from(serde_json::to_vec(&body)?))?).await
}

#[tokio::test]
async fn subscriptions_belong_to_the_caller() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, None).await;
    let other = app.store.add_customer("Casa", None, None).await;
    let (user, token) = app.member("agent@bella.test", customer, Role::Member).await;

    for _ in 0..2 {
        let (status, _) = app
            .post(
                "/api/push/subscribe",
                &token,
                json!({ "customerId": customer, "subscription": subscription("https://push.test/1") }),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
    }
    let subs = app.store.subscriptions().await;
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].user_id, user);

    let (status, _) = app
        .post(
            "/api/push/subscribe",
            &token,
            json!({ "userId": Uuid::new_v4(), "subscription": subscription("https://push.test/2") }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/push/subscribe",
            &token,
            json!({ "customerId": other, "subscription": subscription("https://push.test/2") }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/api/push/subscribe",
            &token,
            json!({ "subscription": { "endpoint": "https://push.test/3", "keys": {} } }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["p256dh"].is_string());

    let (status, body) = app
        .delete("/api/push/subscribe", &token, json!({ "endpoint": "https://push.test/1" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], true);
    assert!(app.store.subscriptions().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn send_requires_internal_key() -> Result<()> {
    let app = TestApp::new();
    let body = json!({ "customerId": Uuid::new_v4(), "title": "t", "body": "b" });

    let (status, _) = send_push(&app, None, body.clone()).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_push(&app, Some("wrong-key"), body.clone()).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer = app.store.add_customer("Bella", None, None).await;
    let (_, token) = app.member("agent@bella.test", customer, Role::Owner).await;
    let (status, _) = app.post("/api/push/send", &token, body).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn send_fans_out_and_prunes_gone_endpoints() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, None).await;
    let agent = app.store.add_user("agent@bella.test").await;
    app.store.add_subscription(agent, Some(customer), "https://push.test/live").await;
    app.store.add_subscription(Uuid::new_v4(), Some(customer), "https://push.test/gone").await;
    app.push.respond_with("https://push.test/gone", PushDelivery::Gone(410)).await;

    let (status, body) = send_push(
        &app,
        Some(INTERNAL_KEY),
        json!({ "customerId": customer, "title": "New guest", "body": "Someone needs help", "data": { "sessionId": "abc" } }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sent"], 1);
    assert_eq!(body["data"]["total"], 2);

    let remaining: Vec<String> = app.store.subscriptions().await.into_iter().map(|s| s.endpoint).collect();
    assert_eq!(remaining, vec!["https://push.test/live".to_string()]);

    let deliveries = app.push.deliveries().await;
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.iter().all(|(_, p)| p.title == "New guest" && p.data["sessionId"] == "abc"));

    let (status, body) = send_push(&app, Some(INTERNAL_KEY), json!({ "userId": agent, "title": "t", "body": "b" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn send_validates_payload() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = send_push(&app, Some(INTERNAL_KEY), json!({ "title": "t", "body": "b" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["target"].is_string());

    let (status, body) = send_push(&app, Some(INTERNAL_KEY), json!({ "customerId": Uuid::new_v4(), "title": "t" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["body"].is_string());
    Ok(())
}
