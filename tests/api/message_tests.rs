//! Message API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{json_body, TestApp};

async fn send(app: &TestApp, sender: &str, text: &str) -> Value {
    let body = serde_json::json!({ "sender": sender, "text": text }).to_string();
    let response = app.post_json("/api/messages", &body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn test_empty_history() {
    let app = TestApp::new().await;

    let response = app.get("/api/messages").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_send_then_list_in_order() {
    let app = TestApp::new().await;

    let first = send(&app, "You", "hi").await;
    let second = send(&app, "Friend", "hello").await;
    let third = send(&app, "You", "how are you?").await;

    let history = json_body(app.get("/api/messages").await).await;
    assert_eq!(history, serde_json::json!([first, second, third]));

    let texts: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["hi", "hello", "how are you?"]);
}

#[tokio::test]
async fn test_ids_are_strings_and_strictly_increasing() {
    let app = TestApp::new().await;

    let mut last = 0_i64;
    for i in 0..20 {
        let message = send(&app, "You", &format!("message {}", i)).await;
        let id: i64 = message["id"].as_str().unwrap().parse().unwrap();
        assert!(id > last);
        last = id;
    }
}

#[tokio::test]
async fn test_list_after_cursor() {
    let app = TestApp::new().await;

    send(&app, "You", "one").await;
    let cursor = send(&app, "Friend", "two").await;
    let newer = send(&app, "You", "three").await;

    let uri = format!("/api/messages?after={}", cursor["id"].as_str().unwrap());
    let after = json_body(app.get(&uri).await).await;
    assert_eq!(after, serde_json::json!([newer]));

    let uri = format!("/api/messages?after={}", newer["id"].as_str().unwrap());
    assert_eq!(json_body(app.get(&uri).await).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_text_is_stored_verbatim() {
    let app = TestApp::new().await;
    let text = "  émoji 👋 and\nnewlines  ";

    let stored = send(&app, "You", text).await;

    assert_eq!(stored["text"], text);
    let history = json_body(app.get("/api/messages").await).await;
    assert_eq!(history[0]["text"], text);
}

#[tokio::test]
async fn test_blank_text_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/messages", r#"{"sender":"You","text":"   "}"#)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], 10007);
    assert_eq!(body["errors"][0]["field"], "text");
    assert_eq!(json_body(app.get("/api/messages").await).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_unknown_sender_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/messages", r#"{"sender":"Mallory","text":"hi"}"#)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_cursor_is_rejected() {
    let app = TestApp::new().await;

    let response = app.get("/api/messages?after=not-a-number").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], 10002);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_a_json_error() {
    let app = TestApp::new().await;

    let response = app.post_json("/api/messages", r#"{"sender":"You""#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], 10002);
}

#[tokio::test]
async fn test_repeated_reads_return_the_same_page() {
    let app = TestApp::new().await;

    send(&app, "You", "one").await;
    let cursor = send(&app, "Friend", "two").await;
    send(&app, "You", "three").await;

    let full_first = json_body(app.get("/api/messages").await).await;
    let full_second = json_body(app.get("/api/messages").await).await;
    assert_eq!(full_first, full_second);
    assert_eq!(full_first.as_array().unwrap().len(), 3);

    let uri = format!("/api/messages?after={}", cursor["id"].as_str().unwrap());
    let after_first = json_body(app.get(&uri).await).await;
    let after_second = json_body(app.get(&uri).await).await;
    assert_eq!(after_first, after_second);
    assert_eq!(after_first[0]["text"], "three");
}
