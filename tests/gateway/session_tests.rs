//! Gateway Session Tests
//!
//! Sessions are driven through channels, without a socket.

use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;

use chat_presence::domain::{PresenceStatus, Snowflake};
use chat_presence::presentation::websocket::{CloseReason, ServerFrame};

use crate::common::{
    json_body, relaxed_settings, test_settings, TestApp, TestClient, HEARTBEAT_MS,
};

async fn collect_messages(client: &mut TestClient, count: usize) -> Vec<(Snowflake, String, String)> {
    let mut messages = Vec::with_capacity(count);
    while messages.len() < count {
        if let ServerFrame::Message { id, sender, text, .. } = client.next().await {
            messages.push((id, sender, text));
        }
    }
    messages
}

fn presence_of(frame: &ServerFrame, who: &str) -> Option<(PresenceStatus, Option<DateTime<Utc>>)> {
    match frame {
        ServerFrame::Presence {
            identity,
            status,
            last_seen,
        } if identity == who => Some((*status, *last_seen)),
        _ => None,
    }
}

#[tokio::test]
async fn test_handshake_sends_ready_history_and_counterpart_presence() {
    let app = TestApp::new().await;
    app.post_json("/api/messages", r#"{"sender":"Friend","text":"hi"}"#)
        .await;
    app.post_json("/api/messages", r#"{"sender":"You","text":"hello"}"#)
        .await;

    let mut you = app.connect("You");
    let frames = you.handshake().await;

    assert_eq!(
        frames[0],
        ServerFrame::Ready {
            identity: "You".into(),
            counterpart: "Friend".into(),
            heartbeat_interval_ms: 100,
            expiry_window_ms: 400,
        }
    );

    let texts: Vec<&str> = frames
        .iter()
        .filter_map(|f| match f {
            ServerFrame::Message { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["hi", "hello"]);

    let last = frames.last().unwrap();
    assert_eq!(presence_of(last, "Friend"), Some((PresenceStatus::Offline, None)));
}

#[tokio::test]
async fn test_connect_counts_as_heartbeat() {
    let app = TestApp::with_settings(relaxed_settings()).await;

    let mut you = app.connect("You");
    you.handshake().await;

    let frame = you.next_matching(|f| presence_of(f, "You").is_some()).await;
    assert_eq!(presence_of(&frame, "You").unwrap().0, PresenceStatus::Online);

    let current = json_body(app.get("/api/presence/You").await).await;
    assert_eq!(current["status"], "online");
}

#[tokio::test]
async fn test_messages_fan_out_to_both_sessions() {
    let app = TestApp::with_settings(relaxed_settings()).await;
    let mut you = app.connect("You");
    let mut friend = app.connect("Friend");
    you.handshake().await;
    friend.handshake().await;

    you.send_text("hi");
    assert_eq!(you.next_message().await, ("You".into(), "hi".into()));
    assert_eq!(friend.next_message().await, ("You".into(), "hi".into()));

    friend.send_text("hello");
    assert_eq!(you.next_message().await, ("Friend".into(), "hello".into()));
    assert_eq!(friend.next_message().await, ("Friend".into(), "hello".into()));
}

#[tokio::test]
async fn test_concurrent_senders_observe_one_order() {
    let app = TestApp::with_settings(relaxed_settings()).await;
    let mut you = app.connect("You");
    let mut friend = app.connect("Friend");
    you.handshake().await;
    friend.handshake().await;

    for i in 0..10 {
        you.send_text(&format!("you {}", i));
        friend.send_text(&format!("friend {}", i));
    }

    let seen_by_you = collect_messages(&mut you, 20).await;
    let seen_by_friend = collect_messages(&mut friend, 20).await;
    assert_eq!(seen_by_you, seen_by_friend);

    let ids: Vec<Snowflake> = seen_by_you.iter().map(|(id, _, _)| *id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let history = json_body(app.get("/api/messages").await).await;
    let stored: Vec<String> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    let delivered: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    assert_eq!(stored, delivered);

    let yours: Vec<&str> = seen_by_you
        .iter()
        .filter(|(_, sender, _)| sender == "You")
        .map(|(_, _, text)| text.as_str())
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("you {}", i)).collect();
    assert_eq!(yours, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_late_joiner_sees_history_and_expiry_keeps_last_heartbeat() {
    let app = TestApp::with_settings(test_settings()).await;

    let mut you = app.connect("You");
    you.handshake().await;
    you.send_text("hi");
    assert_eq!(you.next_message().await, ("You".into(), "hi".into()));

    let mut friend = app.connect("Friend");
    let frames = friend.handshake().await;
    assert!(frames.iter().any(|f| matches!(
        f,
        ServerFrame::Message { sender, text, .. } if sender == "You" && text == "hi"
    )));
    let (status, last_heartbeat) = presence_of(frames.last().unwrap(), "You").unwrap();
    assert_eq!(status, PresenceStatus::Online);
    assert!(last_heartbeat.is_some());

    // You never heartbeats again; Friend keeps its own session alive.
    let offline_seen = loop {
        friend.heartbeat();
        match tokio::time::timeout(Duration::from_millis(HEARTBEAT_MS), friend.outbound.recv()).await {
            Ok(Some(frame)) => match presence_of(&frame, "You") {
                Some((PresenceStatus::Offline, last_seen)) => break last_seen,
                _ => continue,
            },
            Ok(None) => panic!("friend session closed"),
            Err(_) => continue,
        }
    };
    assert_eq!(offline_seen, last_heartbeat);

    assert_eq!(you.finished().await, CloseReason::IdleTimeout);

    let current = json_body(app.get("/api/presence/You").await).await;
    assert_eq!(current["status"], "offline");
}

#[tokio::test]
async fn test_session_without_heartbeat_is_closed() {
    let app = TestApp::new().await;

    let mut you = app.connect("You");
    you.handshake().await;

    assert_eq!(you.finished().await, CloseReason::IdleTimeout);
    assert_eq!(app.state.hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_client_that_stops_reading_is_closed() {
    let app = TestApp::new().await;

    let mut you = app.connect_with_buffer("You", 1);
    you.handshake().await;

    for i in 0..5 {
        let body = serde_json::json!({ "sender": "Friend", "text": format!("m{}", i) }).to_string();
        let response = app.post_json("/api/messages", &body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    assert_eq!(you.finished().await, CloseReason::IdleTimeout);
    assert_eq!(app.state.hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_heartbeats_keep_session_open() {
    let app = TestApp::new().await;

    let mut you = app.connect("You");
    you.handshake().await;

    for _ in 0..8 {
        you.heartbeat();
        you.next_matching(|f| matches!(f, ServerFrame::HeartbeatAck {}))
            .await;
        tokio::time::sleep(Duration::from_millis(HEARTBEAT_MS)).await;
    }

    assert_eq!(you.close().await, CloseReason::ClientClosed);
}

#[tokio::test]
async fn test_close_marks_offline() {
    let app = TestApp::with_settings(relaxed_settings()).await;

    let mut you = app.connect("You");
    you.handshake().await;
    assert_eq!(you.close().await, CloseReason::ClientClosed);

    let current = json_body(app.get("/api/presence/You").await).await;
    assert_eq!(current["status"], "offline");
    assert!(current["lastSeen"].is_string());
}

#[tokio::test]
async fn test_second_session_keeps_identity_online() {
    let app = TestApp::with_settings(relaxed_settings()).await;

    let mut first = app.connect("You");
    let mut second = app.connect("You");
    first.handshake().await;
    second.handshake().await;

    first.close().await;
    let current = json_body(app.get("/api/presence/You").await).await;
    assert_eq!(current["status"], "online");

    second.close().await;
    let current = json_body(app.get("/api/presence/You").await).await;
    assert_eq!(current["status"], "offline");
}

#[tokio::test]
async fn test_invalid_send_returns_error_frame() {
    let app = TestApp::with_settings(relaxed_settings()).await;
    let mut you = app.connect("You");
    you.handshake().await;

    you.send_text("   ");
    let frame = you
        .next_matching(|f| matches!(f, ServerFrame::Error { .. }))
        .await;
    assert!(matches!(frame, ServerFrame::Error { code, .. } if code == "VALIDATION_ERROR"));

    let history = json_body(app.get("/api/messages").await).await;
    assert_eq!(history, serde_json::json!([]));
}

#[tokio::test]
async fn test_malformed_frame_does_not_end_session() {
    let app = TestApp::with_settings(relaxed_settings()).await;
    let mut you = app.connect("You");
    you.handshake().await;

    you.push(Err("unknown variant `DELETE`".into()));
    let frame = you
        .next_matching(|f| matches!(f, ServerFrame::Error { .. }))
        .await;
    assert!(matches!(frame, ServerFrame::Error { code, .. } if code == "BAD_FRAME"));

    you.heartbeat();
    you.next_matching(|f| matches!(f, ServerFrame::HeartbeatAck {}))
        .await;
}

#[tokio::test]
async fn test_storage_outage_reports_error_after_retries() {
    let app = TestApp::with_settings(relaxed_settings()).await;
    let mut you = app.connect("You");
    you.handshake().await;

    app.state.db.close().await;
    you.send_text("lost");

    let frame = you
        .next_matching(|f| matches!(f, ServerFrame::Error { .. }))
        .await;
    assert!(matches!(frame, ServerFrame::Error { code, .. } if code == "STORAGE_UNAVAILABLE"));
}

#[tokio::test]
async fn test_lagging_session_resyncs_without_gaps() {
    let mut settings = relaxed_settings();
    settings.hub.buffer_capacity = 2;
    let app = TestApp::with_settings(settings).await;

    let mut slow = app.connect_with_buffer("Friend", 1);
    slow.handshake().await;

    for i in 0..10 {
        let body = serde_json::json!({ "sender": "You", "text": format!("m{}", i) }).to_string();
        let response = app.post_json("/api/messages", &body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let mut resynced = false;
    let mut texts = Vec::new();
    while texts.len() < 10 {
        match slow.next().await {
            ServerFrame::ResyncRequired {} => resynced = true,
            ServerFrame::Message { text, .. } => texts.push(text),
            _ => {}
        }
    }

    assert!(resynced);
    let expected: Vec<String> = (0..10).map(|i| format!("m{}", i)).collect();
    assert_eq!(texts, expected);
}

#[tokio::test]
async fn test_history_and_presence_survive_restart() {
    let path = std::env::temp_dir().join(format!("chat-presence-{}.db", uuid::Uuid::new_v4()));
    let mut settings = relaxed_settings();
    settings.database.url = format!("sqlite://{}", path.display());

    let first = TestApp::with_settings(settings.clone()).await;
    first
        .post_json("/api/messages", r#"{"sender":"You","text":"still here"}"#)
        .await;
    let beat = json_body(first.post_json("/api/presence/You/heartbeat", "").await).await;
    first.state.db.close().await;
    drop(first);

    let second = TestApp::with_settings(settings).await;
    let history = json_body(second.get("/api/messages").await).await;
    assert_eq!(history[0]["text"], "still here");

    let presence = json_body(second.get("/api/presence/You").await).await;
    assert_eq!(presence["status"], "offline");
    assert_eq!(presence["lastSeen"], beat["lastSeen"]);

    second.state.db.close().await;
    let _ = std::fs::remove_file(&path);
}
