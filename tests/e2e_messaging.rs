//! E2E tests for the inbox and chat threads

mod common;

use common::{MockApi, Reply};
use rustroom::AppError;
use rustroom::api::EntityId;
use rustroom::resource::{FetchStatus, MutationOutcome};
use serde_json::json;

#[tokio::test]
async fn test_sent_message_is_replaced_by_the_server_copy() {
    let mock = MockApi::start().await;
    mock.on(
        "GET",
        "/conversations/c1/messages",
        Reply::json(json!({ "messages": [
            { "id": 1, "sender_id": 10, "body": "Hi!", "created_at": "2024-05-01T08:00:00Z" }
        ] })),
    );
    mock.on(
        "POST",
        "/messages",
        Reply::json(json!({ "message": {
            "id": 2, "sender_id": "me", "body": "Hello", "created_at": "2024-05-01T08:01:00Z"
        } })),
    );
    let app = mock.signed_in_app();
    let thread = app.conversation(EntityId::from("c1"));
    assert_eq!(thread.load().await, FetchStatus::Ready);

    let outcome = thread.send("Hello").await.unwrap();

    assert_eq!(outcome, MutationOutcome::Confirmed);
    let messages = thread.visible();
    let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert!(!messages[1].pending);
    assert!(thread.is_mine(&messages[1]));

    let sent = mock
        .requests()
        .into_iter()
        .find(|r| r.method == "POST")
        .unwrap();
    assert_eq!(
        sent.body,
        Some(json!({ "conversation_id": "c1", "body": "Hello" }))
    );
}

#[tokio::test]
async fn test_failed_send_is_removed_with_a_notice() {
    let mock = MockApi::start().await;
    mock.on(
        "GET",
        "/conversations/c1/messages",
        Reply::json(json!({ "messages": [] })),
    );
    mock.on("POST", "/messages", Reply::error(403, "You cannot message this user"));
    let app = mock.signed_in_app();
    let thread = app.conversation(EntityId::from("c1"));
    thread.load().await;

    let outcome = thread.send("Hello").await.unwrap();

    assert_eq!(
        outcome,
        MutationOutcome::RolledBack {
            notice: "You cannot message this user".to_string()
        }
    );
    assert!(thread.visible().is_empty());
}

#[tokio::test]
async fn test_blank_message_is_rejected_locally() {
    let mock = MockApi::start().await;
    let app = mock.signed_in_app();
    let thread = app.conversation(EntityId::from("c1"));

    assert!(matches!(thread.send("  ").await, Err(AppError::Validation(_))));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_inbox_filter_and_order() {
    let mock = MockApi::start().await;
    mock.on(
        "GET",
        "/conversations",
        Reply::json(json!({ "conversations": [
            {
                "id": "a",
                "participant": { "id": 1, "name": "John", "username": "john" },
                "last_message": "ok",
                "last_message_at": "2024-05-01T08:00:00Z"
            },
            {
                "id": "b",
                "participant": { "id": 2, "name": "Mary", "username": "mary" },
                "last_message": "ask John",
                "last_message_at": "2024-05-02T08:00:00Z"
            },
            {
                "id": "c",
                "participant": { "id": 3, "name": "Zed", "username": "zed" },
                "last_message_at": "2024-05-03T08:00:00Z"
            }
        ] })),
    );
    let app = mock.signed_in_app();
    let inbox = app.inbox();
    inbox.load().await;

    inbox.set_filter("john");
    let ids: Vec<_> = inbox.visible().into_iter().map(|c| c.id.0).collect();

    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(mock.hits("GET", "/conversations"), 1);
}
