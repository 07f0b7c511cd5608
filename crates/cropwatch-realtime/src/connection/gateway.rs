//! Connection gateway: authenticates upgrades and drives each session.
//!
//! The gateway is transport-agnostic: the HTTP layer owns the socket and
//! calls [`ConnectionGateway::connect`] once, then feeds inbound frames to
//! the returned [`Session`] and writes whatever it hands back.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cropwatch_auth::identity::{Identity, IdentityResolver};
use cropwatch_core::config::RealtimeConfig;
use cropwatch_core::types::UserId;

use super::handle::{
    CLOSE_UNAUTHENTICATED, CloseReason, ConnectionHandle, ConnectionId, ConnectionState, Outbound,
};
use super::heartbeat::{HeartbeatConfig, run_heartbeat};
use super::pool::ConnectionPool;
use crate::broker::FanoutBroker;
use crate::message::types::{GroupEvent, InboundMessage, OutboundMessage};
use crate::message::validator::{INVALID_JSON, parse_inbound};
use crate::metrics::RealtimeMetrics;

/// Close code used when the group subscription itself failed.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// A refused handshake. The caller closes the socket with `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    /// WebSocket close code.
    pub code: u16,
    /// Close frame reason text.
    pub reason: &'static str,
}

impl Rejection {
    fn unauthenticated() -> Self {
        Self {
            code: CLOSE_UNAUTHENTICATED,
            reason: "authentication required",
        }
    }
}

/// Result of a successful handshake.
#[derive(Debug)]
pub struct OpenConnection {
    /// Per-connection state machine.
    pub session: Session,
    /// Items to write to the socket, in order.
    pub outbound: mpsc::Receiver<Outbound>,
    /// First frame to send.
    pub greeting: OutboundMessage,
}

/// Authenticates connections and tracks the open ones.
#[derive(Debug, Clone)]
pub struct ConnectionGateway {
    resolver: IdentityResolver,
    broker: FanoutBroker,
    pool: Arc<ConnectionPool>,
    metrics: Arc<RealtimeMetrics>,
    config: RealtimeConfig,
}

impl ConnectionGateway {
    /// Creates a gateway.
    pub fn new(
        resolver: IdentityResolver,
        broker: FanoutBroker,
        metrics: Arc<RealtimeMetrics>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            resolver,
            broker,
            pool: Arc::new(ConnectionPool::new()),
            metrics,
            config,
        }
    }

    /// Runs the handshake for a connection presenting `token`.
    ///
    /// Anonymous connections are rejected with close code 4001 and leave no
    /// trace in the registry. Authenticated ones are subscribed to their
    /// user group before the greeting is produced.
    pub async fn connect(&self, token: Option<&str>) -> Result<OpenConnection, Rejection> {
        debug!(state = ?ConnectionState::Connecting, "Connection accepted");
        debug!(state = ?ConnectionState::Authenticating, has_token = token.is_some(), "Authenticating connection");

        let user = match self.resolver.resolve_optional(token).await {
            Identity::User(user) => user,
            Identity::Anonymous => {
                self.metrics.connection_rejected();
                info!(state = ?ConnectionState::Rejected, "Unauthenticated connection rejected");
                return Err(Rejection::unauthenticated());
            }
        };

        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(user.id, user.username.clone(), tx));

        for old in self.pool.add(handle.clone(), self.config.max_connections_per_user) {
            warn!(
                conn_id = %old.id,
                user_id = %old.user_id,
                max = self.config.max_connections_per_user,
                "User at max connections, closing oldest"
            );
            old.close(CloseReason::Replaced);
            if let Err(e) = self.broker.unsubscribe(old.user_id, old.id).await {
                warn!(conn_id = %old.id, error = %e, "Failed to unsubscribe evicted connection");
            }
            self.metrics.connection_evicted();
        }

        if let Err(e) = self.broker.subscribe(user.id, handle.clone()).await {
            warn!(user_id = %user.id, error = %e, "Group subscription failed");
            self.pool.remove(&handle.id);
            handle.mark_closed();
            return Err(Rejection {
                code: CLOSE_INTERNAL_ERROR,
                reason: "subscription failed",
            });
        }

        self.metrics.connection_opened();
        tokio::spawn(run_heartbeat(
            handle.clone(),
            HeartbeatConfig::from(&self.config),
            self.metrics.clone(),
        ));

        info!(
            conn_id = %handle.id,
            user_id = %user.id,
            username = %user.username,
            "WebSocket connection established"
        );

        Ok(OpenConnection {
            greeting: OutboundMessage::connection_established(user.id, user.username),
            session: Session {
                handle,
                gateway: self.clone(),
            },
            outbound: rx,
        })
    }

    /// Asks every open connection to close. Returns how many were asked.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        let all = self.pool.all_connections();
        for conn in &all {
            conn.close(reason);
        }
        info!(count = all.len(), reason = ?reason, "Closing all connections");
        all.len()
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Open connections of `user_id`, oldest first.
    pub fn user_connection_ids(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.pool
            .user_connections(user_id)
            .iter()
            .map(|c| c.id)
            .collect()
    }

    /// The broker connections are subscribed through.
    pub fn broker(&self) -> &FanoutBroker {
        &self.broker
    }
}

/// One authenticated connection.
#[derive(Debug)]
pub struct Session {
    handle: Arc<ConnectionHandle>,
    gateway: ConnectionGateway,
}

impl Session {
    /// Connection id.
    pub fn id(&self) -> ConnectionId {
        self.handle.id
    }

    /// Authenticated user.
    pub fn user_id(&self) -> UserId {
        self.handle.user_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    /// Handles an inbound text frame and returns the reply, if any.
    pub fn on_text(&self, raw: &str) -> Option<OutboundMessage> {
        self.handle.touch();
        self.gateway.metrics.frame_received();

        match parse_inbound(raw) {
            Ok(Some(InboundMessage::Ping { timestamp })) => Some(OutboundMessage::Pong {
                timestamp: timestamp.unwrap_or_default(),
            }),
            Ok(None) => {
                debug!(conn_id = %self.handle.id, "Ignoring frame with unknown type");
                None
            }
            Err(e) => {
                debug!(conn_id = %self.handle.id, error = %e, "Invalid inbound frame");
                Some(OutboundMessage::Error { message: e.message })
            }
        }
    }

    /// Handles an inbound binary frame. UTF-8 payloads are treated as text;
    /// anything else is answered with the invalid-JSON error.
    pub fn on_binary(&self, raw: &[u8]) -> Option<OutboundMessage> {
        match std::str::from_utf8(raw) {
            Ok(text) => self.on_text(text),
            Err(_) => {
                self.handle.touch();
                self.gateway.metrics.frame_received();
                debug!(conn_id = %self.handle.id, len = raw.len(), "Non-UTF-8 binary frame");
                Some(OutboundMessage::Error {
                    message: INVALID_JSON.to_string(),
                })
            }
        }
    }

    /// Records protocol-level activity (pings and pongs).
    pub fn on_activity(&self) {
        self.handle.touch();
    }

    /// Translates a group event into the frame sent to this client.
    pub fn on_event(&self, event: &GroupEvent) -> OutboundMessage {
        match event {
            GroupEvent::SendNotification { notification } => OutboundMessage::Notification {
                notification: notification.clone(),
            },
        }
    }

    /// Completes when the server wants this connection closed.
    pub async fn closed(&self) {
        self.handle.closed().await
    }

    /// Why the server asked to close, if it did.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.handle.close_reason()
    }

    /// Unsubscribes and forgets the connection. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        if !self.handle.mark_closed() {
            return;
        }

        if let Err(e) = self
            .gateway
            .broker
            .unsubscribe(self.handle.user_id, self.handle.id)
            .await
        {
            warn!(conn_id = %self.handle.id, error = %e, "Unsubscribe on close failed");
        }
        self.gateway.pool.remove(&self.handle.id);
        self.gateway.metrics.connection_closed();

        info!(
            conn_id = %self.handle.id,
            user_id = %self.handle.user_id,
            reason = ?self.handle.close_reason(),
            "WebSocket connection closed"
        );
    }
}
