#![allow(clippy::unwrap_used, clippy::missing_panics_doc, clippy::print_stderr, clippy::similar_names, unreachable_pub)]
use reqwest::StatusCode;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

mod common;

fn created_at(message: &Value) -> OffsetDateTime {
    OffsetDateTime::parse(message["createdAt"].as_str().unwrap(), &Rfc3339).unwrap()
}

#[tokio::test]
async fn test_first_send_creates_conversation() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let body = app.send_to(&traveler, &host, "Is the room free next weekend?").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"]["senderId"], traveler.user_id.to_string());
    assert_eq!(body["message"]["type"], "text");
    assert_eq!(body["message"]["read"], false);
    assert_eq!(body["conversation"]["travelerId"], traveler.user_id.to_string());
    assert_eq!(body["conversation"]["hostId"], host.user_id.to_string());
    assert_eq!(body["conversation"]["counterpartName"], "Riya Rahman");

    // Both sides see the same conversation
    let host_view = app.conversations(&host).await;
    assert_eq!(host_view.len(), 1);
    assert_eq!(host_view[0]["id"], body["conversation"]["id"]);
    assert_eq!(host_view[0]["counterpartName"], "Karim Ahmed");
    assert_eq!(host_view[0]["unreadCount"], 1);
}

#[tokio::test]
async fn test_preview_follows_latest_send() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let first = app.send_to(&traveler, &host, "hello").await;
    let conversation_id = first["conversation"]["id"].as_str().unwrap().to_string();
    app.send_in(&host, &conversation_id, "hi").await;

    for viewer in [&traveler, &host] {
        let conversations = app.conversations(viewer).await;
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0]["lastMessage"], "hi");
        assert!(conversations[0]["lastMessageAt"].is_string());
    }
}

#[tokio::test]
async fn test_start_conversation_is_idempotent() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let resp = app.post(&traveler.token, "/messages/conversations", &json!({ "participantId": host.user_id })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first: Value = resp.json().await.unwrap();
    assert!(first["conversation"]["lastMessage"].is_null());

    // Started from the other side, the pair resolves to the same conversation
    let resp = app.post(&host.token, "/messages/conversations", &json!({ "participantId": traveler.user_id })).await;
    let second: Value = resp.json().await.unwrap();
    assert_eq!(first["conversation"]["id"], second["conversation"]["id"]);

    let sent = app.send_to(&traveler, &host, "hello").await;
    assert_eq!(sent["conversation"]["id"], first["conversation"]["id"]);
}

#[tokio::test]
async fn test_start_conversation_rejects_invalid_pairs() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let other_traveler = app.register_user("traveler", "Nusrat Jahan").await;

    let resp =
        app.post(&traveler.token, "/messages/conversations", &json!({ "participantId": other_traveler.user_id })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.post(&traveler.token, "/messages/conversations", &json!({ "participantId": traveler.user_id })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.post(&traveler.token, "/messages/conversations", &json!({ "participantId": Uuid::new_v4() })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_participants_can_read() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;
    let outsider = app.register_user("host", "Tanvir Hossain").await;

    let sent = app.send_to(&traveler, &host, "private").await;
    let conversation_id = sent["conversation"]["id"].as_str().unwrap().to_string();

    let resp = app.get(&outsider.token, &format!("/messages/conversations/{conversation_id}")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    // Same answer as for a conversation that does not exist
    let resp = app.get(&outsider.token, &format!("/messages/conversations/{}", Uuid::new_v4())).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Outsiders cannot post into it either
    let resp = app
        .post(&outsider.token, "/messages/send", &json!({ "conversationId": conversation_id, "content": "let me in" }))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert!(app.conversations(&outsider).await.is_empty());
}

#[tokio::test]
async fn test_messages_in_creation_order() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let first = app.send_to(&traveler, &host, "one").await;
    let conversation_id = first["conversation"]["id"].as_str().unwrap().to_string();
    app.send_in(&host, &conversation_id, "two").await;
    app.send_in(&traveler, &conversation_id, "three").await;
    app.send_in(&host, &conversation_id, "four").await;

    let messages = app.messages(&traveler, &conversation_id).await;
    let contents: Vec<&str> = messages.iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, ["one", "two", "three", "four"]);

    for pair in messages.windows(2) {
        assert!(created_at(&pair[0]) <= created_at(&pair[1]));
    }
}

#[tokio::test]
async fn test_two_conversations_are_isolated() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let riya = app.register_user("host", "Riya Rahman").await;
    let tanvir = app.register_user("host", "Tanvir Hossain").await;

    app.send_to(&traveler, &riya, "to riya").await;
    app.send_to(&traveler, &tanvir, "to tanvir").await;
    app.send_to(&riya, &traveler, "from riya").await;

    let conversations = app.conversations(&traveler).await;
    assert_eq!(conversations.len(), 2);
    // Most recent activity first
    assert_eq!(conversations[0]["counterpartName"], "Riya Rahman");
    assert_eq!(conversations[1]["counterpartName"], "Tanvir Hossain");

    let second_id = conversations[1]["id"].as_str().unwrap().to_string();
    let messages = app.messages(&traveler, &second_id).await;
    assert_eq!(messages.len(), 1);
    assert!(messages.iter().all(|m| m["conversationId"] == second_id.as_str()));
    assert_eq!(messages[0]["content"], "to tanvir");
}

#[tokio::test]
async fn test_reading_clears_unread() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let first = app.send_to(&traveler, &host, "one").await;
    let conversation_id = first["conversation"]["id"].as_str().unwrap().to_string();
    app.send_in(&traveler, &conversation_id, "two").await;

    // The sender's own messages never count as unread for them
    assert_eq!(app.conversations(&traveler).await[0]["unreadCount"], 0);
    assert_eq!(app.conversations(&host).await[0]["unreadCount"], 2);

    // Opening the thread marks the counterpart's messages read
    let messages = app.messages(&host, &conversation_id).await;
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m["read"] == true));
    assert_eq!(app.conversations(&host).await[0]["unreadCount"], 0);

    // The traveler's own fetch does not touch the counter for the host
    app.messages(&traveler, &conversation_id).await;
    app.send_in(&traveler, &conversation_id, "three").await;
    assert_eq!(app.conversations(&host).await[0]["unreadCount"], 1);
}

#[tokio::test]
async fn test_payment_message() {
    let app = common::TestApp::spawn().await;
    let traveler = app.register_user("traveler", "Karim Ahmed").await;
    let host = app.register_user("host", "Riya Rahman").await;

    let resp = app
        .post(
            &traveler.token,
            "/messages/send",
            &json!({ "recipientId": host.user_id, "content": "Advance for 2 nights", "type": "payment", "amount": 5000 }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"]["type"], "payment");
    assert_eq!(body["message"]["amount"], 5000);

    let conversation_id = body["conversation"]["id"].as_str().unwrap().to_string();
    let messages = app.messages(&host, &conversation_id).await;
    assert_eq!(messages[0]["type"], "payment");
    assert_eq!(messages[0]["amount"], 5000);
}
