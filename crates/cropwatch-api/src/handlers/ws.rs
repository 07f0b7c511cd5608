//! WebSocket upgrade handler for the notification stream.

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error};

use cropwatch_realtime::connection::{OpenConnection, Outbound};
use cropwatch_realtime::message::types::OutboundMessage;

use crate::state::AppState;

/// Query parameters of the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// API token or signed session token.
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /ws/notifications/?token={token}
///
/// The upgrade is always accepted; authentication happens on the open
/// socket so that a failure can be reported with close code 4001.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, query.token, socket))
}

type WsSink = SplitSink<WebSocket, Message>;

fn close_message(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    }))
}

async fn send_frame(sink: &mut WsSink, frame: &OutboundMessage) -> Result<(), axum::Error> {
    let text = match frame.to_json() {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Failed to serialize outbound frame");
            return Ok(());
        }
    };
    sink.send(Message::Text(text.into())).await
}

async fn handle_socket(state: AppState, token: Option<String>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();

    let OpenConnection {
        session,
        mut outbound,
        greeting,
    } = match state.realtime.gateway.connect(token.as_deref()).await {
        Ok(open) => open,
        Err(rejection) => {
            let _ = sink.send(close_message(rejection.code, rejection.reason)).await;
            return;
        }
    };

    if send_frame(&mut sink, &greeting).await.is_ok() {
        loop {
            tokio::select! {
                _ = session.closed() => {
                    if let Some(reason) = session.close_reason() {
                        let _ = sink.send(close_message(reason.code(), reason.description())).await;
                    }
                    break;
                }
                item = outbound.recv() => {
                    let sent = match item {
                        Some(Outbound::Event(event)) => {
                            send_frame(&mut sink, &session.on_event(&event)).await
                        }
                        Some(Outbound::Ping) => sink.send(Message::Ping(Default::default())).await,
                        None => break,
                    };
                    if sent.is_err() {
                        break;
                    }
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = session.on_text(text.as_str()) {
                            if send_frame(&mut sink, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        if let Some(reply) = session.on_binary(&bytes) {
                            if send_frame(&mut sink, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => session.on_activity(),
                    Some(Err(e)) => {
                        debug!(conn_id = %session.id(), error = %e, "WebSocket receive error");
                        break;
                    }
                },
            }
        }
    }

    session.disconnect().await;
}
