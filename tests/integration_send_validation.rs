#![allow(clippy::unwrap_used, clippy::missing_panics_doc, clippy::print_stderr, clippy::similar_names, unreachable_pub)]
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_blank_content_is_rejected_and_not_stored() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    for content in ["", "   ", "\n\t"] {
        let resp = app
            .post(&traveler.token, "/messages/send", &json!({ "recipientId": host.user_id, "content": content }))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
    }

    // No conversation was opened as a side effect
    assert!(app.conversations(&traveler).await.is_empty());
    assert!(app.conversations(&host).await.is_empty());
}

#[tokio::test]
async fn test_validation_precedes_target_lookup() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;

    let resp = app
        .post(&traveler.token, "/messages/send", &json!({ "conversationId": Uuid::new_v4(), "content": " " }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_too_long_is_rejected() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let limit = app.config.messaging.max_message_length;
    let resp = app
        .post(&traveler.token, "/messages/send", &json!({ "recipientId": host.user_id, "content": "a".repeat(limit + 1) }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .post(&traveler.token, "/messages/send", &json!({ "recipientId": host.user_id, "content": "a".repeat(limit) }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_payment_amount_rules() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let cases = [
        json!({ "recipientId": host.user_id, "content": "Paid", "type": "payment" }),
        json!({ "recipientId": host.user_id, "content": "Paid", "type": "payment", "amount": 0 }),
        json!({ "recipientId": host.user_id, "content": "Paid", "type": "payment", "amount": -100 }),
        json!({ "recipientId": host.user_id, "content": "hello", "type": "text", "amount": 100 }),
    ];
    for payload in cases {
        let resp = app.post(&traveler.token, "/messages/send", &payload).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload: {payload}");
    }
}

#[tokio::test]
async fn test_target_must_be_unambiguous() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let resp = app.post(&traveler.token, "/messages/send", &json!({ "content": "hello" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .post(
            &traveler.token,
            "/messages/send",
            &json!({ "conversationId": Uuid::new_v4(), "recipientId": host.user_id, "content": "hello" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_recipient() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;

    let resp =
        app.post(&traveler.token, "/messages/send", &json!({ "recipientId": Uuid::new_v4(), "content": "hello" })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_conversation_id_is_json_bad_request() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;

    let resp = app.get(&traveler.token, "/messages/conversations/not-a-uuid").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_send_body_is_json_bad_request() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let cases = [
        json!({ "recipientId": host.user_id }),
        json!({ "recipientId": host.user_id, "content": "hi", "type": "sticker" }),
        json!({ "recipientId": "nobody", "content": "hi" }),
    ];
    for payload in cases {
        let resp = app.post(&traveler.token, "/messages/send", &payload).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{payload}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
    }

    assert!(app.conversations(&traveler).await.is_empty());
}

#[tokio::test]
async fn test_login_without_json_body_is_json_bad_request() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.post(format!("{}/auth/login", app.server_url)).body("username=karim").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_auth_throttling_is_json_too_many_requests() {
    let mut config = common::get_test_config();
    config.rate_limit.auth_per_second = 1;
    config.rate_limit.auth_burst = 1;
    let app = common::TestApp::spawn_with_config(config).await;

    // Unknown users fail before password hashing
    let login = json!({ "username": "nobody_here", "password": "password123" });
    let first = app.client.post(format!("{}/auth/login", app.server_url)).json(&login).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let resp = app.client.post(format!("{}/auth/login", app.server_url)).json(&login).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Too many requests"));

    // The messaging tier has its own bucket
    let resp = app.get("not-a-token", "/messages/conversations").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
