//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::warn;
use uuid::Uuid;

use cropwatch_core::types::UserId;

use crate::message::types::GroupEvent;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// Close code sent when the upgrade request carried no usable token.
pub const CLOSE_UNAUTHENTICATED: u16 = 4001;

/// Lifecycle of a connection.
///
/// `Connecting` and `Authenticating` only exist while the gateway is
/// handling the upgrade; a handle is created once the connection is `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Upgrade accepted, nothing checked yet.
    Connecting = 0,
    /// Resolving the presented token.
    Authenticating = 1,
    /// Authenticated and subscribed.
    Open = 2,
    /// Authentication failed; never subscribed.
    Rejected = 3,
    /// A close was requested; the socket has not finished tearing down.
    Closing = 4,
    /// Unsubscribed and removed.
    Closed = 5,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Authenticating,
            2 => Self::Open,
            3 => Self::Rejected,
            4 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Why the server closed a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Normal server-side close.
    Normal,
    /// The user opened more connections than allowed; this was the oldest.
    Replaced,
    /// Nothing was received within the heartbeat timeout.
    HeartbeatTimeout,
    /// The server is shutting down.
    Shutdown,
}

impl CloseReason {
    /// WebSocket close code for this reason.
    pub fn code(&self) -> u16 {
        match self {
            Self::Normal | Self::Replaced | Self::HeartbeatTimeout => 1000,
            Self::Shutdown => 1001,
        }
    }

    /// Close frame reason text.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Normal => "normal closure",
            Self::Replaced => "connection limit reached",
            Self::HeartbeatTimeout => "heartbeat timeout",
            Self::Shutdown => "server shutting down",
        }
    }
}

/// Items queued for a connection's writer.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A group event to translate into a frame.
    Event(Arc<GroupEvent>),
    /// Send a protocol-level ping.
    Ping,
}

/// A handle to a single open WebSocket connection.
///
/// Holds the bounded queue feeding the socket writer plus liveness and
/// close state. Shared between the group registry, the heartbeat task, and
/// the socket loop.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Username (cached for display)
    pub username: String,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Outbound>,
    opened: Instant,
    /// Milliseconds after `opened` of the last inbound frame
    last_seen_ms: AtomicU64,
    state: AtomicU8,
    close_reason: OnceLock<CloseReason>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new open connection handle
    pub fn new(user_id: UserId, username: impl Into<String>, sender: mpsc::Sender<Outbound>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            username: username.into(),
            connected_at: Utc::now(),
            sender,
            opened: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
            state: AtomicU8::new(ConnectionState::Open as u8),
            close_reason: OnceLock::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Enqueue a group event. Returns `false` if it was not queued.
    ///
    /// A full queue drops the event; a closed queue marks the connection
    /// for closing.
    pub fn deliver(&self, event: Arc<GroupEvent>) -> bool {
        self.enqueue(Outbound::Event(event))
    }

    /// Enqueue a protocol ping.
    pub fn ping(&self) -> bool {
        self.enqueue(Outbound::Ping)
    }

    fn enqueue(&self, item: Outbound) -> bool {
        if !self.is_open() {
            return false;
        }
        match self.sender.try_send(item) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, user_id = %self.user_id, "Send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close(CloseReason::Normal);
                false
            }
        }
    }

    /// Record inbound activity
    pub fn touch(&self) {
        let elapsed = Instant::now().saturating_duration_since(self.opened);
        self.last_seen_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Time since the last inbound frame (or since open, if none yet)
    pub fn idle_for(&self) -> Duration {
        let last_seen = self.opened + Duration::from_millis(self.last_seen_ms.load(Ordering::Relaxed));
        Instant::now().saturating_duration_since(last_seen)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether events may still be queued
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Requests a server-side close. The first reason wins.
    pub fn close(&self, reason: CloseReason) {
        let _ = self.close_reason.set(reason);
        let _ = self.state.compare_exchange(
            ConnectionState::Open as u8,
            ConnectionState::Closing as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        self.shutdown.cancel();
    }

    /// Why the server asked to close, if it did
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason.get().copied()
    }

    /// Completes once a server-side close was requested
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Moves to `Closed`. Returns `true` only for the first caller.
    pub fn mark_closed(&self) -> bool {
        let previous = self
            .state
            .swap(ConnectionState::Closed as u8, Ordering::SeqCst);
        self.shutdown.cancel();
        previous != ConnectionState::Closed as u8
    }
}
