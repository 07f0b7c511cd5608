//! Group registry: which connections belong to which group.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use cropwatch_core::result::AppResult;

use super::group::GroupKey;
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::message::types::GroupEvent;

/// Group membership and group sends.
///
/// Implementations must deliver a send only to connections that are members
/// at the time of the send.
#[async_trait]
pub trait GroupRegistry: Send + Sync + std::fmt::Debug + 'static {
    /// Adds `connection` to `group`. Adding twice is a no-op.
    async fn add(&self, group: &GroupKey, connection: Arc<ConnectionHandle>) -> AppResult<()>;

    /// Removes a connection from `group`. Returns whether it was a member.
    async fn remove(&self, group: &GroupKey, connection_id: ConnectionId) -> AppResult<bool>;

    /// Sends `event` to every member and returns how many local connections
    /// it was queued to.
    async fn send(&self, group: &GroupKey, event: GroupEvent) -> AppResult<usize>;

    /// Number of local members of `group`.
    fn local_members(&self, group: &GroupKey) -> usize;
}

/// In-process registry.
#[derive(Debug, Default)]
pub struct MemoryGroupRegistry {
    groups: DashMap<GroupKey, Vec<Arc<ConnectionHandle>>>,
}

impl MemoryGroupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `event` to the current members without holding the group
    /// lock while enqueueing.
    pub fn deliver_local(&self, group: &GroupKey, event: Arc<GroupEvent>) -> usize {
        let members = match self.groups.get(group) {
            Some(entry) => entry.value().clone(),
            None => return 0,
        };

        let delivered = members
            .iter()
            .filter(|member| member.deliver(event.clone()))
            .count();

        debug!(
            group = %group,
            members = members.len(),
            delivered,
            "Group send"
        );
        delivered
    }

    fn insert(&self, group: &GroupKey, connection: Arc<ConnectionHandle>) {
        let mut members = self.groups.entry(group.clone()).or_default();
        if !members.iter().any(|m| m.id == connection.id) {
            members.push(connection);
        }
    }

    fn delete(&self, group: &GroupKey, connection_id: ConnectionId) -> bool {
        let removed = match self.groups.get_mut(group) {
            Some(mut members) => {
                let before = members.len();
                members.retain(|m| m.id != connection_id);
                members.len() < before
            }
            None => false,
        };
        self.groups.remove_if(group, |_, members| members.is_empty());
        removed
    }
}

#[async_trait]
impl GroupRegistry for MemoryGroupRegistry {
    async fn add(&self, group: &GroupKey, connection: Arc<ConnectionHandle>) -> AppResult<()> {
        self.insert(group, connection);
        Ok(())
    }

    async fn remove(&self, group: &GroupKey, connection_id: ConnectionId) -> AppResult<bool> {
        Ok(self.delete(group, connection_id))
    }

    async fn send(&self, group: &GroupKey, event: GroupEvent) -> AppResult<usize> {
        Ok(self.deliver_local(group, Arc::new(event)))
    }

    fn local_members(&self, group: &GroupKey) -> usize {
        self.groups.get(group).map(|m| m.len()).unwrap_or(0)
    }
}
