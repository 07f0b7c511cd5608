//! Publish/subscribe over per-user notification groups.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use cropwatch_core::result::AppResult;
use cropwatch_core::types::UserId;
use cropwatch_entity::notification::DeliveryPayload;
use cropwatch_entity::traits::NotificationPublisher;

use crate::channel::group::GroupKey;
use crate::channel::registry::GroupRegistry;
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::message::types::GroupEvent;
use crate::metrics::RealtimeMetrics;

/// Routes notifications to every connection of a user.
///
/// Delivery is best-effort and at most once per subscribed connection;
/// nothing is buffered for users who are offline.
#[derive(Debug, Clone)]
pub struct FanoutBroker {
    registry: Arc<dyn GroupRegistry>,
    metrics: Arc<RealtimeMetrics>,
}

impl FanoutBroker {
    /// Creates a broker over `registry`.
    pub fn new(registry: Arc<dyn GroupRegistry>, metrics: Arc<RealtimeMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Joins `connection` to the user's group.
    pub async fn subscribe(&self, user_id: UserId, connection: Arc<ConnectionHandle>) -> AppResult<()> {
        let group = GroupKey::for_user(user_id);
        debug!(group = %group, conn_id = %connection.id, "Subscribe");
        self.registry.add(&group, connection).await
    }

    /// Leaves the user's group. Unknown connections are ignored.
    pub async fn unsubscribe(&self, user_id: UserId, connection_id: ConnectionId) -> AppResult<bool> {
        let group = GroupKey::for_user(user_id);
        let removed = self.registry.remove(&group, connection_id).await?;
        debug!(group = %group, conn_id = %connection_id, removed, "Unsubscribe");
        Ok(removed)
    }

    /// Sends a `send_notification` event to the user's group and returns
    /// the number of local connections it was queued to.
    pub async fn publish(&self, user_id: UserId, payload: &DeliveryPayload) -> AppResult<usize> {
        let group = GroupKey::for_user(user_id);
        let event = GroupEvent::SendNotification {
            notification: payload.clone(),
        };
        let delivered = self.registry.send(&group, event).await?;
        self.metrics.event_published(delivered);
        Ok(delivered)
    }

    /// Local connections currently subscribed for `user_id`.
    pub fn subscriber_count(&self, user_id: UserId) -> usize {
        self.registry.local_members(&GroupKey::for_user(user_id))
    }
}

#[async_trait]
impl NotificationPublisher for FanoutBroker {
    async fn publish(&self, user_id: UserId, payload: &DeliveryPayload) -> AppResult<usize> {
        FanoutBroker::publish(self, user_id, payload).await
    }
}
