//! Connection pool: tracks all open connections indexed by user ID.

use std::sync::Arc;

use dashmap::DashMap;

use cropwatch_core::types::UserId;

use super::handle::{ConnectionHandle, ConnectionId};

/// Thread-safe pool of all open WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// User ID → connections, oldest first.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection, evicting the user's oldest connections so that at
    /// most `max_per_user` remain. Returns the evicted handles.
    pub fn add(&self, handle: Arc<ConnectionHandle>, max_per_user: usize) -> Vec<Arc<ConnectionHandle>> {
        let evicted = {
            let mut connections = self.by_user.entry(handle.user_id).or_default();
            let keep = max_per_user.max(1) - 1;
            let excess = connections.len().saturating_sub(keep);
            let evicted: Vec<_> = connections.drain(..excess).collect();
            connections.push(handle.clone());
            evicted
        };

        for old in &evicted {
            self.by_id.remove(&old.id);
        }
        self.by_id.insert(handle.id, handle);

        evicted
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        if let Some(mut connections) = self.by_user.get_mut(&handle.user_id) {
            connections.retain(|c| c.id != *conn_id);
            if connections.is_empty() {
                drop(connections);
                self.by_user.remove_if(&handle.user_id, |_, v| v.is_empty());
            }
        }
        Some(handle)
    }

    /// Gets all connections for a user, oldest first.
    pub fn user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Returns total number of open connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
