mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use common::TestApp;
use support_desk_api::access::Role;
use support_desk_api::database::models::InviteStatus;
use support_desk_api::database::MemberStore;
use support_desk_api::services::member_service::hash_token;

fn users(body: &Value) -> Vec<Value> {
    body["data"]["users"].as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn plan_limit_blocks_new_seats() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, Some("starter")).await;
    let (_, token) = app.member("owner@bella.test", customer, Role::Owner).await;
    app.member("a@bella.test", customer, Role::Member).await;
    app.member("b@bella.test", customer, Role::Member).await;

    let (status, body) = app
        .post("/api/admin/users", &token, json!({ "customer_id": customer, "email": "c@bella.test" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PLAN_LIMIT_EXCEEDED");
    assert_eq!(body["details"]["limit"], 3);
    assert_eq!(body["details"]["current"], 3);
    assert!(app.store.invites(customer).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn invite_flow() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, Some("pro")).await;
    let floor = app.store.add_team(customer, "Floor", false).await;
    let (_, token) = app.member("owner@bella.test", customer, Role::Owner).await;

    let (status, body) = app
        .post(
            "/api/admin/users",
            &token,
            json!({ "customer_id": customer, "email": " New.Hire@Mail.test ", "role": "manager", "team_id": floor }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "invite_created");
    assert_eq!(body["data"]["invite"]["email"], "new.hire@mail.test");
    assert!(body["data"]["invite"].get("token_hash").is_none());
    let token_value = body["data"]["token"].as_str().unwrap_or_default().to_string();
    assert_eq!(token_value.len(), 64);

    let stored = app.store.invites(customer).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].token_hash, hash_token(&token_value));
    assert_ne!(stored[0].token_hash, token_value);

    let (status, body) = app
        .post("/api/admin/users", &token, json!({ "customer_id": customer, "email": "new.hire@mail.test" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE_INVITE");

    let (status, body) = app
        .get(&format!("/api/admin/users?customer_id={}", customer), &token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let rows = users(&body);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["is_invite"], true);
    assert_eq!(rows[1]["team_name"], "Floor");

    let invite_id = stored[0].id;
    let (status, _) = app
        .delete(
            "/api/admin/users",
            &token,
            json!({ "customer_id": customer, "user_id": invite_id, "is_invite": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.invites(customer).await.is_empty());

    let (status, _) = app
        .delete(
            "/api/admin/users",
            &token,
            json!({ "customer_id": customer, "user_id": invite_id, "is_invite": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn expired_invite_can_be_reissued() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, Some("pro")).await;
    let (_, token) = app.member("owner@bella.test", customer, Role::Owner).await;
    let body = json!({ "customer_id": customer, "email": "late@mail.test" });

    let (status, _) = app.post("/api/admin/users", &token, body.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);
    let first = app.store.invites(customer).await[0].id;
    app.store.set_invite_expiry(first, Utc::now() - Duration::days(1)).await;

    let (status, _) = app.post("/api/admin/users", &token, body).await?;
    assert_eq!(status, StatusCode::CREATED);

    let invites = app.store.invites(customer).await;
    let statuses: Vec<(Uuid, String)> = invites.iter().map(|i| (i.id, i.status.clone())).collect();
    assert!(statuses.contains(&(first, "expired".to_string())));
    assert_eq!(invites.iter().filter(|i| i.status == "pending").count(), 1);
    Ok(())
}

#[tokio::test]
async fn accepted_invite_does_not_block_a_new_one() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, Some("pro")).await;
    let (_, token) = app.member("owner@bella.test", customer, Role::Owner).await;
    let body = json!({ "customer_id": customer, "email": "again@mail.test" });

    let (status, _) = app.post("/api/admin/users", &token, body.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);
    let first = app.store.invites(customer).await[0].id;

    let (status, dup) = app.post("/api/admin/users", &token, body.clone()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(dup["code"], "DUPLICATE_INVITE");

    app.store.set_invite_status(first, InviteStatus::Accepted).await?;

    let (status, created) = app.post("/api/admin/users", &token, body).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["type"], "invite_created");

    let invites = app.store.invites(customer).await;
    assert_eq!(invites.len(), 2);
    assert_eq!(invites.iter().filter(|i| i.status == "pending").count(), 1);
    assert!(invites.iter().any(|i| i.id == first && i.status == "accepted"));
    Ok(())
}

#[tokio::test]
async fn existing_accounts_are_added_directly() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, Some("pro")).await;
    let (_, token) = app.member("owner@bella.test", customer, Role::Owner).await;
    let known = app.store.add_user("known@mail.test").await;
    let (_, _) = app.member("already@bella.test", customer, Role::Member).await;

    let (status, body) = app
        .post("/api/admin/users", &token, json!({ "customer_id": customer, "email": "KNOWN@mail.test" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "member_added");
    assert_eq!(body["data"]["role"], "member");
    assert!(app.store.membership(customer, known).await.is_some());

    let (status, body) = app
        .post("/api/admin/users", &token, json!({ "customer_id": customer, "email": "already@bella.test" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ALREADY_HAS_ACCESS");

    let (status, body) = app
        .post(
            "/api/admin/users",
            &token,
            json!({ "customer_id": customer, "email": "boss@mail.test", "role": "owner" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CANNOT_GRANT_OWNER");

    let (status, body) = app
        .post("/api/admin/users", &token, json!({ "customer_id": customer, "email": "no-at-sign" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["email"].is_string());
    Ok(())
}

#[tokio::test]
async fn owner_is_protected() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, Some("pro")).await;
    let (owner, owner_token) = app.member("owner@bella.test", customer, Role::Owner).await;
    let (admin, admin_token) = app.member("admin@bella.test", customer, Role::Admin).await;
    let (member, _) = app.member("member@bella.test", customer, Role::Member).await;

    let (status, body) = app
        .patch(
            "/api/admin/users",
            &admin_token,
            json!({ "customer_id": customer, "user_id": owner, "role": "member" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CANNOT_CHANGE_OWNER");

    let (status, body) = app
        .delete("/api/admin/users", &admin_token, json!({ "customer_id": customer, "user_id": owner }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CANNOT_REMOVE_OWNER");

    // Self removal wins over owner protection
    let (status, body) = app
        .delete("/api/admin/users", &owner_token, json!({ "customer_id": customer, "user_id": owner }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CANNOT_REMOVE_SELF");

    let (status, _) = app
        .delete("/api/admin/users", &admin_token, json!({ "customer_id": customer, "user_id": admin }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(
            "/api/admin/users",
            &admin_token,
            json!({ "customer_id": customer, "user_id": member, "role": "manager" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.store.membership(customer, member).await.map(|m| m.role),
        Some("manager".to_string())
    );

    let (status, _) = app
        .delete("/api/admin/users", &owner_token, json!({ "customer_id": customer, "user_id": member }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.membership(customer, member).await.is_none());

    assert!(app.store.membership(customer, owner).await.is_some());
    Ok(())
}

#[tokio::test]
async fn member_listing_requires_admin() -> Result<()> {
    let app = TestApp::new();
    let customer = app.store.add_customer("Bella", None, None).await;
    let (_, manager) = app.member("manager@bella.test", customer, Role::Manager).await;

    let (status, _) = app
        .get(&format!("/api/admin/users?customer_id={}", customer), &manager)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/admin/users", &manager, json!({ "customer_id": customer, "email": "x@mail.test" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
