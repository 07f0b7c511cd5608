//! In-process backends for single-node runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use cropwatch_core::result::AppResult;
use cropwatch_core::types::{NotificationId, UserId};
use cropwatch_entity::notification::Notification;
use cropwatch_entity::traits::{ApiTokenStore, NotificationStore, UserDirectory};
use cropwatch_entity::user::UserLocation;

/// User directory held in insertion order.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<Vec<UserLocation>>,
}

impl MemoryUserDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with `users`.
    pub fn with_users(users: Vec<UserLocation>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    /// Adds or replaces a user.
    pub async fn upsert(&self, user: UserLocation) {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_user(&self, id: UserId) -> AppResult<Option<UserLocation>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users_with_location(&self) -> AppResult<Vec<UserLocation>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .filter(|u| u.latitude.is_some() && u.longitude.is_some())
            .filter(|u| !(u.latitude == Some(0.0) && u.longitude == Some(0.0)))
            .cloned()
            .collect())
    }
}

/// Append-only notification log.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    records: RwLock<Vec<Notification>>,
}

impl MemoryNotificationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored notification, oldest first.
    pub async fn all(&self) -> Vec<Notification> {
        self.records.read().await.clone()
    }

    /// Notifications addressed to `user_id`, oldest first.
    pub async fn for_user(&self, user_id: UserId) -> Vec<Notification> {
        self.records
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of stored notifications.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether nothing has been stored yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, notification: &Notification) -> AppResult<NotificationId> {
        self.records.write().await.push(notification.clone());
        Ok(notification.id)
    }
}

/// API token → user map.
#[derive(Debug, Default)]
pub struct MemoryApiTokenStore {
    tokens: RwLock<HashMap<String, UserId>>,
}

impl MemoryApiTokenStore {
    /// Creates an empty token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` for `user_id`.
    pub async fn insert(&self, token: impl Into<String>, user_id: UserId) {
        self.tokens.write().await.insert(token.into(), user_id);
    }
}

#[async_trait]
impl ApiTokenStore for MemoryApiTokenStore {
    async fn find_user(&self, token: &str) -> AppResult<Option<UserId>> {
        Ok(self.tokens.read().await.get(token).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropwatch_entity::notification::NotificationType;

    fn located(name: &str, lat: Option<f64>, lon: Option<f64>) -> UserLocation {
        UserLocation {
            id: UserId::new(),
            username: name.to_string(),
            latitude: lat,
            longitude: lon,
            crops: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_directory_lists_only_located_users_in_order() {
        let dir = MemoryUserDirectory::with_users(vec![
            located("a", Some(1.0), Some(1.0)),
            located("b", None, Some(1.0)),
            located("c", Some(0.0), Some(0.0)),
            located("d", Some(2.0), Some(2.0)),
        ]);

        let names: Vec<String> = dir
            .list_users_with_location()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["a", "d"]);
    }

    #[tokio::test]
    async fn test_directory_upsert_replaces() {
        let dir = MemoryUserDirectory::new();
        let mut user = located("a", Some(1.0), Some(1.0));
        dir.upsert(user.clone()).await;
        user.username = "renamed".to_string();
        dir.upsert(user.clone()).await;

        let found = dir.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(found.username, "renamed");
        assert_eq!(dir.list_users_with_location().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_notification_store_records() {
        let store = MemoryNotificationStore::new();
        let user = UserId::new();
        let n = Notification::new(user, "t", "m", NotificationType::AlertNearby, None);

        let id = store.create(&n).await.unwrap();
        assert_eq!(id, n.id);
        assert_eq!(store.for_user(user).await.len(), 1);
        assert!(store.for_user(UserId::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_token_store_lookup() {
        let store = MemoryApiTokenStore::new();
        let user = UserId::new();
        store.insert("abc123", user).await;

        assert_eq!(store.find_user("abc123").await.unwrap(), Some(user));
        assert_eq!(store.find_user("nope").await.unwrap(), None);
    }
}
