//! Integration tests for the message endpoints and the live pushes they trigger.

mod common;

use common::{expect_silence, next_event, start_test_server, TestServer};
use presence_protocol::{DeliveryEvent, ServerEvent};
use serde_json::json;
use std::time::Duration;

async fn send_message(server: &TestServer, from: &str, to: &str, content: &str) -> serde_json::Value {
    let resp = server
        .http()
        .post(format!("{}/api/messages", server.base_url))
        .bearer_auth(server.token(from))
        .json(&json!({ "toUserId": to, "content": content }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "Sending message failed");
    resp.json().await.unwrap()
}

async fn history(server: &TestServer, user: &str, peer: &str) -> Vec<serde_json::Value> {
    let resp = server
        .http()
        .get(format!("{}/api/messages/{}", server.base_url, peer))
        .bearer_auth(server.token(user))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_online_recipient_receives_new_message() {
    let server = start_test_server().await;
    let mut bob = server.connect("bob").await;
    server.wait_online("bob", true).await;

    let body = send_message(&server, "alice", "bob", "hello bob").await;
    assert_eq!(body["delivered"], true);
    let message_id = body["message"]["id"].as_str().unwrap().to_string();

    match next_event(&mut bob).await {
        ServerEvent::Message(DeliveryEvent::NewMessage { payload }) => {
            assert_eq!(payload.id, message_id);
            assert_eq!(payload.content, "hello bob");
            assert_eq!(payload.from_user_id, "alice");
            assert_eq!(payload.to_user_id, "bob");
            assert!(!payload.is_read);
        }
        other => panic!("Expected new_message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_offline_recipient_reads_history_later() {
    let server = start_test_server().await;

    let body = send_message(&server, "alice", "bob", "are you there?").await;
    assert_eq!(body["delivered"], false);
    let message_id = body["message"]["id"].as_str().unwrap().to_string();

    // Nothing is queued for later delivery
    let mut bob = server.connect("bob").await;
    expect_silence(&mut bob, Duration::from_millis(300)).await;

    let messages = history(&server, "bob", "alice").await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], message_id.as_str());
    assert_eq!(messages[0]["isRead"], false);
}

#[tokio::test]
async fn test_mark_read_notifies_original_sender() {
    let server = start_test_server().await;
    send_message(&server, "alice", "bob", "one").await;
    send_message(&server, "alice", "bob", "two").await;

    let mut alice = server.connect("alice").await;
    server.wait_online("alice", true).await;

    let resp = server
        .http()
        .post(format!("{}/api/messages/read", server.base_url))
        .bearer_auth(server.token("bob"))
        .json(&json!({ "fromUserId": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["updated"], 2);
    assert_eq!(body["notified"], true);

    match next_event(&mut alice).await {
        ServerEvent::Message(DeliveryEvent::MessagesRead { from_user_id }) => {
            assert_eq!(from_user_id, "bob");
        }
        other => panic!("Expected messages_read, got {:?}", other),
    }

    let messages = history(&server, "bob", "alice").await;
    assert!(messages.iter().all(|m| m["isRead"] == true));

    // Second call changes nothing and sends nothing
    let resp = server
        .http()
        .post(format!("{}/api/messages/read", server.base_url))
        .bearer_auth(server.token("bob"))
        .json(&json!({ "fromUserId": "alice" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["updated"], 0);
    assert_eq!(body["notified"], false);
    expect_silence(&mut alice, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_mark_read_with_offline_sender() {
    let server = start_test_server().await;
    send_message(&server, "alice", "bob", "hi").await;

    let resp = server
        .http()
        .post(format!("{}/api/messages/read", server.base_url))
        .bearer_auth(server.token("bob"))
        .json(&json!({ "fromUserId": "alice" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["updated"], 1);
    assert_eq!(body["notified"], false);
}

#[tokio::test]
async fn test_delete_pushes_message_deleted() {
    let server = start_test_server().await;
    let body = send_message(&server, "alice", "bob", "oops").await;
    let message_id = body["message"]["id"].as_str().unwrap().to_string();

    let mut bob = server.connect("bob").await;
    server.wait_online("bob", true).await;

    // Only the sender may delete
    let resp = server
        .http()
        .delete(format!("{}/api/messages/{}", server.base_url, message_id))
        .bearer_auth(server.token("bob"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = server
        .http()
        .delete(format!("{}/api/messages/{}", server.base_url, message_id))
        .bearer_auth(server.token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], true);
    assert_eq!(body["delivered"], true);

    match next_event(&mut bob).await {
        ServerEvent::Message(DeliveryEvent::MessageDeleted { message_id: deleted }) => {
            assert_eq!(deleted, message_id);
        }
        other => panic!("Expected message_deleted, got {:?}", other),
    }

    assert!(history(&server, "bob", "alice").await.is_empty());

    let resp = server
        .http()
        .delete(format!("{}/api/messages/{}", server.base_url, message_id))
        .bearer_auth(server.token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_history_is_oldest_first_and_limited() {
    let server = start_test_server().await;
    send_message(&server, "alice", "bob", "first").await;
    send_message(&server, "bob", "alice", "second").await;
    send_message(&server, "alice", "bob", "third").await;
    send_message(&server, "alice", "carol", "elsewhere").await;

    let messages = history(&server, "alice", "bob").await;
    let contents: Vec<&str> = messages
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["first", "second", "third"]);

    let resp = server
        .http()
        .get(format!("{}/api/messages/bob?limit=2", server.base_url))
        .bearer_auth(server.token("alice"))
        .send()
        .await
        .unwrap();
    let messages: Vec<serde_json::Value> = resp.json().await.unwrap();
    let contents: Vec<&str> = messages
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["second", "third"]);
}

#[tokio::test]
async fn test_create_message_validation() {
    let server = start_test_server().await;
    let client = server.http();
    let url = format!("{}/api/messages", server.base_url);

    let cases = [
        json!({ "toUserId": "", "content": "hi" }),
        json!({ "toUserId": "alice", "content": "to myself" }),
        json!({ "toUserId": "bob", "content": "   " }),
    ];
    for body in cases {
        let resp = client
            .post(&url)
            .bearer_auth(server.token("alice"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "Expected 400 for {}", body);
    }

    // Attachment-only messages are allowed
    let resp = client
        .post(&url)
        .bearer_auth(server.token("alice"))
        .json(&json!({
            "toUserId": "bob",
            "hasAttachment": true,
            "attachmentMeta": { "name": "notes.pdf", "size": 1024 }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"]["hasAttachment"], true);
    assert_eq!(body["message"]["attachmentMeta"]["name"], "notes.pdf");
}

#[tokio::test]
async fn test_endpoints_require_token() {
    let server = start_test_server().await;
    let client = server.http();

    let resp = client
        .post(format!("{}/api/messages", server.base_url))
        .json(&json!({ "toUserId": "bob", "content": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{}/api/messages/bob", server.base_url))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_store_failure_returns_500_without_push() {
    let server = start_test_server().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    server.wait_online("alice", true).await;
    server.wait_online("bob", true).await;

    server
        .state
        .db
        .lock()
        .unwrap()
        .execute_batch("DROP TABLE messages")
        .unwrap();

    let resp = server
        .http()
        .post(format!("{}/api/messages", server.base_url))
        .bearer_auth(server.token("alice"))
        .json(&json!({ "toUserId": "bob", "content": "lost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let resp = server
        .http()
        .post(format!("{}/api/messages/read", server.base_url))
        .bearer_auth(server.token("bob"))
        .json(&json!({ "fromUserId": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let resp = server
        .http()
        .delete(format!("{}/api/messages/some-id", server.base_url))
        .bearer_auth(server.token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    expect_silence(&mut bob, Duration::from_millis(300)).await;
    expect_silence(&mut alice, Duration::from_millis(300)).await;
}
