//! Integration tests for the notification WebSocket against a live server.

mod helpers;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ORIGIN: (f64, f64) = (-0.4167, 36.9500);

async fn connect(addr: SocketAddr, token: Option<&str>) -> Client {
    let url = match token {
        Some(token) => format!("ws://{addr}/ws/notifications/?token={token}"),
        None => format!("ws://{addr}/ws/notifications/"),
    };
    let (ws, _) = connect_async(url).await.expect("WebSocket handshake failed");
    ws
}

/// Next data or close frame; protocol pings and pongs are skipped.
async fn next_frame(ws: &mut Client) -> Message {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(message)) => return message,
                other => panic!("connection ended unexpectedly: {other:?}"),
            }
        }
    })
    .await
    .expect("Timed out waiting for a frame")
}

async fn next_json(ws: &mut Client) -> Value {
    match next_frame(ws).await {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("Frame is not JSON"),
        other => panic!("expected text frame, got {other:?}"),
    }
}

async fn expect_close(ws: &mut Client) -> CloseFrame {
    match next_frame(ws).await {
        Message::Close(Some(frame)) => frame,
        other => panic!("expected close frame, got {other:?}"),
    }
}

async fn send_text(ws: &mut Client, text: &str) {
    ws.send(Message::text(text)).await.expect("Failed to send frame");
}

#[tokio::test]
async fn test_ws_without_token_closed_4001() {
    let app = helpers::TestApp::new().await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, None).await;
    let frame = expect_close(&mut ws).await;

    assert_eq!(u16::from(frame.code), 4001);
    assert_eq!(app.state.realtime.gateway.connection_count(), 0);
}

#[tokio::test]
async fn test_ws_unknown_token_closed_4001() {
    let app = helpers::TestApp::new().await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some("not-a-real-token")).await;
    let frame = expect_close(&mut ws).await;

    assert_eq!(u16::from(frame.code), 4001);
}

#[tokio::test]
async fn test_ws_greeting() {
    let app = helpers::TestApp::new().await;
    let alice = app.create_user("alice", Some(ORIGIN), &["Maize"]).await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some("alice-token")).await;
    let greeting = next_json(&mut ws).await;

    assert_eq!(greeting["type"], "connection_established");
    assert_eq!(greeting["user_id"], json!(alice));
    assert_eq!(greeting["username"], "alice");
    assert_eq!(greeting["message"], "Connected as alice");
    assert_eq!(app.state.realtime.broker.subscriber_count(alice), 1);
}

#[tokio::test]
async fn test_ws_session_token_accepted() {
    let app = helpers::TestApp::new().await;
    let alice = app.create_user("alice", Some(ORIGIN), &[]).await;
    let token = app.session_token(alice);
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some(&token)).await;
    let greeting = next_json(&mut ws).await;

    assert_eq!(greeting["type"], "connection_established");
    assert_eq!(greeting["username"], "alice");
}

#[tokio::test]
async fn test_ws_ping_pong() {
    let app = helpers::TestApp::new().await;
    app.create_user("alice", Some(ORIGIN), &[]).await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some("alice-token")).await;
    next_json(&mut ws).await;

    send_text(&mut ws, r#"{"type":"ping","timestamp":1700000000}"#).await;
    let pong = next_json(&mut ws).await;
    assert_eq!(pong, json!({"type": "pong", "timestamp": 1700000000}));

    send_text(&mut ws, r#"{"type":"ping"}"#).await;
    let pong = next_json(&mut ws).await;
    assert_eq!(pong, json!({"type": "pong", "timestamp": null}));
}

#[tokio::test]
async fn test_ws_invalid_and_unknown_frames() {
    let app = helpers::TestApp::new().await;
    app.create_user("alice", Some(ORIGIN), &[]).await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some("alice-token")).await;
    next_json(&mut ws).await;

    send_text(&mut ws, "definitely not json").await;
    let error = next_json(&mut ws).await;
    assert_eq!(error, json!({"type": "error", "message": "Invalid JSON format"}));

    // unknown types get no reply; the next frame is the pong
    send_text(&mut ws, r#"{"type":"subscribe","topic":"weather"}"#).await;
    send_text(&mut ws, r#"{"type":"ping","timestamp":"after"}"#).await;
    let pong = next_json(&mut ws).await;
    assert_eq!(pong["type"], "pong");
    assert_eq!(pong["timestamp"], "after");
}

#[tokio::test]
async fn test_ws_binary_frames() {
    let app = helpers::TestApp::new().await;
    app.create_user("alice", Some(ORIGIN), &[]).await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some("alice-token")).await;
    next_json(&mut ws).await;

    ws.send(Message::binary(b"\xff\xfe not json".to_vec()))
        .await
        .expect("Failed to send frame");
    let error = next_json(&mut ws).await;
    assert_eq!(error, json!({"type": "error", "message": "Invalid JSON format"}));

    ws.send(Message::binary(br#"{"type":"ping","timestamp":7}"#.to_vec()))
        .await
        .expect("Failed to send frame");
    let pong = next_json(&mut ws).await;
    assert_eq!(pong, json!({"type": "pong", "timestamp": 7}));
}

#[tokio::test]
async fn test_ws_fanout_reaches_every_device() {
    let app = helpers::TestApp::new().await;
    app.create_user("author", Some(ORIGIN), &[]).await;
    let bob = app
        .create_user("bob", Some((ORIGIN.0 + 0.05, ORIGIN.1)), &["Maize"])
        .await;
    let addr = app.spawn().await;

    let mut phone = connect(addr, Some("bob-token")).await;
    let mut laptop = connect(addr, Some("bob-token")).await;
    next_json(&mut phone).await;
    next_json(&mut laptop).await;
    app.wait_for_subscribers(bob, 2).await;

    let response = app
        .request(
            "POST",
            "/api/alerts/fanout",
            Some(json!({
                "title": "Maize lethal necrosis",
                "description": "Yellowing from leaf margins",
                "crop": "Maize",
                "category": "Disease",
                "severity": "Critical",
                "latitude": ORIGIN.0,
                "longitude": ORIGIN.1,
                "radius_km": 30.0
            })),
            Some("author-token"),
        )
        .await;
    assert_eq!(response.body["delivered"], 1, "{:?}", response.body);
    assert_eq!(response.body["connections_reached"], 2);

    for ws in [&mut phone, &mut laptop] {
        let frame = next_json(ws).await;
        assert_eq!(frame["type"], "notification");
        let notification = &frame["notification"];
        assert_eq!(notification["title"], "🌱 Alert Nearby: Maize lethal necrosis");
        assert_eq!(notification["type"], "alert_nearby");
        assert_eq!(notification["alert_severity"], "Critical");
        assert_eq!(notification["is_read"], false);
        assert!(notification["distance_km"].as_f64().is_some());
    }
}

#[tokio::test]
async fn test_ws_author_receives_receipt() {
    let app = helpers::TestApp::new().await;
    let author = app.create_user("author", Some(ORIGIN), &[]).await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some("author-token")).await;
    next_json(&mut ws).await;
    app.wait_for_subscribers(author, 1).await;

    app.request(
        "POST",
        "/api/alerts/fanout",
        Some(json!({
            "title": "Frost",
            "crop": "Tea",
            "category": "Weather",
            "severity": "Medium",
            "latitude": ORIGIN.0,
            "longitude": ORIGIN.1,
            "radius_km": 10.0
        })),
        Some("author-token"),
    )
    .await;

    let frame = next_json(&mut ws).await;
    assert_eq!(frame["notification"]["title"], "✅ Alert Created: Frost");
    assert_eq!(frame["notification"]["type"], "alert_created");
}

#[tokio::test]
async fn test_ws_closed_connection_not_delivered() {
    let app = helpers::TestApp::new().await;
    app.create_user("author", Some(ORIGIN), &[]).await;
    let bob = app
        .create_user("bob", Some((ORIGIN.0 + 0.01, ORIGIN.1)), &[])
        .await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some("bob-token")).await;
    next_json(&mut ws).await;
    ws.close(None).await.expect("Failed to close");
    app.wait_for_subscribers(bob, 0).await;

    let response = app
        .request(
            "POST",
            "/api/alerts/fanout",
            Some(json!({
                "title": "Hail",
                "crop": "",
                "category": "Weather",
                "severity": "Low",
                "latitude": ORIGIN.0,
                "longitude": ORIGIN.1,
                "radius_km": 5.0
            })),
            Some("author-token"),
        )
        .await;

    assert_eq!(response.body["delivered"], 1);
    assert_eq!(response.body["connections_reached"], 0);
    assert_eq!(app.notifications.for_user(bob).await.len(), 1);
}

#[tokio::test]
async fn test_ws_connection_limit_evicts_oldest() {
    let mut config = helpers::test_config();
    config.realtime.max_connections_per_user = 1;
    let app = helpers::TestApp::with_config(config).await;
    let alice = app.create_user("alice", Some(ORIGIN), &[]).await;
    let addr = app.spawn().await;

    let mut first = connect(addr, Some("alice-token")).await;
    next_json(&mut first).await;

    let mut second = connect(addr, Some("alice-token")).await;
    assert_eq!(next_json(&mut second).await["type"], "connection_established");

    let frame = expect_close(&mut first).await;
    assert_eq!(u16::from(frame.code), 1000);
    assert_eq!(frame.reason.as_str(), "connection limit reached");

    app.wait_for_subscribers(alice, 1).await;
    assert_eq!(app.state.realtime.gateway.user_connection_ids(&alice).len(), 1);
}

#[tokio::test]
async fn test_ws_server_shutdown_going_away() {
    let app = helpers::TestApp::new().await;
    app.create_user("alice", Some(ORIGIN), &[]).await;
    let addr = app.spawn().await;

    let mut ws = connect(addr, Some("alice-token")).await;
    next_json(&mut ws).await;

    assert_eq!(app.state.realtime.shutdown(), 1);

    let frame = expect_close(&mut ws).await;
    assert_eq!(u16::from(frame.code), 1001);
}
