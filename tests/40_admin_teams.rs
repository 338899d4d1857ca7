mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;
use support_desk_api::access::Role;

#[tokio::test]
async fn team_lifecycle() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, None).await;
    let (_, token) = app.member("admin@bella.test", customer, Role::Admin).await;

    let (status, body) = app
        .post(
            "/api/admin/teams",
            &token,
            json!({ "customer_id": customer, "name": "  Kitchen ", "description": "Back of house" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["team"]["name"], "Kitchen");
    let kitchen: Uuid = serde_json::from_value(body["data"]["team"]["id"].clone())?;

    let (status, body) = app
        .post("/api/admin/teams", &token, json!({ "customer_id": customer, "name": "Kitchen" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_TEAM_NAME");

    let (status, body) = app
        .post("/api/admin/teams", &token, json!({ "customer_id": customer }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["name"].is_string());

    let (status, body) = app
        .patch(
            "/api/admin/teams",
            &token,
            json!({ "customer_id": customer, "team_id": kitchen, "description": null, "is_default": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["team"]["is_default"], true);
    assert!(body["data"]["team"]["description"].is_null());

    app.store
        .add_customer_membership(Uuid::new_v4(), customer, Role::Member, Some(kitchen))
        .await;

    let (status, body) = app
        .get(&format!("/api/admin/teams?customer_id={}", customer), &token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["teams"][0]["member_count"], 1);

    let (status, body) = app
        .delete("/api/admin/teams", &token, json!({ "customer_id": customer, "team_id": kitchen }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TEAM_HAS_MEMBERS");
    assert_eq!(body["details"]["member_count"], 1);
    assert!(body["message"].as_str().unwrap_or_default().contains('1'));
    assert_eq!(app.store.teams(customer).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn only_one_default_team() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, None).await;
    let floor = app.store.add_team(customer, "Floor", true).await;
    let bar = app.store.add_team(customer, "Bar", false).await;
    let (_, token) = app.member("owner@bella.test", customer, Role::Owner).await;

    let (status, _) = app
        .patch(
            "/api/admin/teams",
            &token,
            json!({ "customer_id": customer, "team_id": bar, "is_default": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let defaults: Vec<Uuid> = app
        .store
        .teams(customer)
        .await
        .into_iter()
        .filter(|t| t.is_default)
        .map(|t| t.id)
        .collect();
    assert_eq!(defaults, vec![bar]);
    assert_ne!(defaults[0], floor);
    Ok(())
}

#[tokio::test]
async fn non_admins_cannot_manage_teams() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, None).await;
    let other = app.store.add_customer("Casa", None, None).await;
    let team = app.store.add_team(customer, "Floor", false).await;
    let (_, manager) = app.member("manager@bella.test", customer, Role::Manager).await;

    let (status, _) = app
        .get(&format!("/api/admin/teams?customer_id={}", customer), &manager)
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/api/admin/teams", &manager, json!({ "customer_id": customer, "name": "Bar" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app
        .delete("/api/admin/teams", &manager, json!({ "customer_id": customer, "team_id": team }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/api/admin/teams?customer_id={}", other), &manager)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/admin/teams", &manager).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
