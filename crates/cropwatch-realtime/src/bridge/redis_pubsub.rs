//! Redis pub/sub bridge for multi-node deployments.
//!
//! Membership stays local to each process. A group send is delivered to the
//! local members immediately and relayed through `PUBLISH` on
//! `{prefix}{group}`; every other node receives it through a
//! `PSUBSCRIBE {prefix}*` listener and delivers it to its own members.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cropwatch_core::error::{AppError, ErrorKind};
use cropwatch_core::result::AppResult;

use crate::channel::group::GroupKey;
use crate::channel::registry::{GroupRegistry, MemoryGroupRegistry};
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::message::types::GroupEvent;

/// What travels over the Redis channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RelayEnvelope {
    /// Publishing node; its own listener skips the message.
    origin: Uuid,
    event: GroupEvent,
}

/// Group registry relayed across processes through Redis.
pub struct RedisGroupRegistry {
    local: Arc<MemoryGroupRegistry>,
    client: redis::Client,
    publisher: ConnectionManager,
    prefix: String,
    node_id: Uuid,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RedisGroupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisGroupRegistry")
            .field("prefix", &self.prefix)
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}

fn transport_error(context: &str, e: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::Transport, format!("{context}: {e}"), e)
}

impl RedisGroupRegistry {
    /// Connects the publishing side. Call [`start`](Self::start) to begin
    /// receiving relays from other nodes.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> AppResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| transport_error("Redis connection failed", e))?;
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| transport_error("Redis connection failed", e))?;

        Ok(Self {
            local: Arc::new(MemoryGroupRegistry::new()),
            client,
            publisher,
            prefix: prefix.into(),
            node_id: Uuid::new_v4(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Subscribes to every group channel and spawns the relay listener.
    pub async fn start(&self) -> AppResult<JoinHandle<()>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| transport_error("Redis subscribe failed", e))?;
        let pattern = format!("{}*", self.prefix);
        pubsub
            .psubscribe(&pattern)
            .await
            .map_err(|e| transport_error("Redis PSUBSCRIBE failed", e))?;

        info!(pattern = %pattern, node_id = %self.node_id, "Redis group relay listening");

        let local = self.local.clone();
        let prefix = self.prefix.clone();
        let node_id = self.node_id;
        let shutdown = self.shutdown.clone();

        Ok(tokio::spawn(async move {
            let mut messages = pubsub.on_message();
            loop {
                let msg = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    msg = messages.next() => match msg {
                        Some(msg) => msg,
                        None => {
                            warn!("Redis relay stream ended");
                            break;
                        }
                    },
                };

                let Some(group) = msg.get_channel_name().strip_prefix(prefix.as_str()) else {
                    continue;
                };
                let raw: String = match msg.get_payload() {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(error = %e, "Unreadable relay payload");
                        continue;
                    }
                };
                let envelope: RelayEnvelope = match serde_json::from_str(&raw) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!(error = %e, "Malformed relay envelope");
                        continue;
                    }
                };
                if envelope.origin == node_id {
                    continue;
                }

                let delivered =
                    local.deliver_local(&GroupKey::from_raw(group), Arc::new(envelope.event));
                debug!(group, delivered, "Relayed group send");
            }
            debug!("Redis relay listener stopped");
        }))
    }

    /// Stops the relay listener.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

/// Delivers to local members, then hands the encoded envelope to `relay`.
///
/// The return value is the local delivery count whether or not the relay
/// succeeds; a failed relay only means other nodes missed this send.
async fn deliver_then_relay<F, Fut>(
    local: &MemoryGroupRegistry,
    group: &GroupKey,
    envelope: RelayEnvelope,
    relay: F,
) -> AppResult<usize>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = redis::RedisResult<i64>>,
{
    let body = serde_json::to_string(&envelope)?;
    let delivered = local.deliver_local(group, Arc::new(envelope.event));

    if let Err(e) = relay(body).await {
        warn!(group = %group, delivered, error = %e, "Redis PUBLISH failed, send stayed local");
    }

    Ok(delivered)
}

#[async_trait]
impl GroupRegistry for RedisGroupRegistry {
    async fn add(&self, group: &GroupKey, connection: Arc<ConnectionHandle>) -> AppResult<()> {
        self.local.add(group, connection).await
    }

    async fn remove(&self, group: &GroupKey, connection_id: ConnectionId) -> AppResult<bool> {
        self.local.remove(group, connection_id).await
    }

    async fn send(&self, group: &GroupKey, event: GroupEvent) -> AppResult<usize> {
        let envelope = RelayEnvelope {
            origin: self.node_id,
            event,
        };
        let channel = format!("{}{}", self.prefix, group);
        let mut conn = self.publisher.clone();

        deliver_then_relay(&self.local, group, envelope, move |body| async move {
            redis::cmd("PUBLISH")
                .arg(channel)
                .arg(body)
                .query_async::<i64>(&mut conn)
                .await
        })
        .await
    }

    fn local_members(&self, group: &GroupKey) -> usize {
        self.local.local_members(group)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use tokio::sync::mpsc;

    use cropwatch_core::types::{AlertId, NotificationId, UserId};
    use cropwatch_entity::alert::Severity;
    use cropwatch_entity::notification::{DeliveryPayload, NotificationType};

    use super::*;
    use crate::connection::handle::Outbound;

    fn envelope(origin: Uuid) -> RelayEnvelope {
        RelayEnvelope {
            origin,
            event: GroupEvent::SendNotification {
                notification: DeliveryPayload {
                    id: NotificationId::new(),
                    title: "🌱 Alert Nearby: Blight".to_string(),
                    message: "New High alert for Potato".to_string(),
                    notification_type: NotificationType::AlertNearby,
                    alert_id: AlertId::new(),
                    alert_title: "Blight".to_string(),
                    alert_severity: Severity::High,
                    alert_crop: "Potato".to_string(),
                    alert_category: "Disease".to_string(),
                    created_at: Utc::now(),
                    is_read: false,
                    distance_km: Some(3.5),
                    farmer_username: Some("wanjiku".to_string()),
                },
            },
        }
    }

    async fn subscribed(
        local: &MemoryGroupRegistry,
        user_id: UserId,
    ) -> (GroupKey, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(4);
        let group = GroupKey::for_user(user_id);
        local
            .add(&group, Arc::new(ConnectionHandle::new(user_id, "wanjiku", tx)))
            .await
            .unwrap();
        (group, rx)
    }

    #[tokio::test]
    async fn test_unreachable_relay_keeps_local_delivery() {
        let local = MemoryGroupRegistry::new();
        let (group, mut rx) = subscribed(&local, UserId::new()).await;

        let delivered = deliver_then_relay(&local, &group, envelope(Uuid::new_v4()), |_| async {
            Err(redis::RedisError::from(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        })
        .await
        .unwrap();

        assert_eq!(delivered, 1);
        assert!(matches!(rx.try_recv(), Ok(Outbound::Event(_))));
    }

    #[tokio::test]
    async fn test_relay_receives_tagged_envelope() {
        let local = MemoryGroupRegistry::new();
        let (group, _rx) = subscribed(&local, UserId::new()).await;
        let origin = Uuid::new_v4();
        let published = Mutex::new(None);

        deliver_then_relay(&local, &group, envelope(origin), |body| {
            *published.lock().unwrap() = Some(body);
            async { Ok(1) }
        })
        .await
        .unwrap();

        let body = published.lock().unwrap().take().unwrap();
        let relayed: RelayEnvelope = serde_json::from_str(&body).unwrap();
        assert_eq!(relayed.origin, origin);
    }
}
