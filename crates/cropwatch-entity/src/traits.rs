//! Interfaces to the collaborators the fanout engine does not own.
//!
//! Implementations live in `cropwatch-database` (directory and stores) and
//! `cropwatch-realtime` (publisher).

use async_trait::async_trait;

use cropwatch_core::result::AppResult;
use cropwatch_core::types::{NotificationId, UserId};

use crate::notification::{DeliveryPayload, Notification};
use crate::user::UserLocation;

/// Read access to the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Looks up a single user.
    async fn get_user(&self, id: UserId) -> AppResult<Option<UserLocation>>;

    /// Every user with both coordinates set, in the directory's natural order.
    async fn list_users_with_location(&self) -> AppResult<Vec<UserLocation>>;
}

/// Durable notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Persists a notification and returns its identifier.
    async fn create(&self, notification: &Notification) -> AppResult<NotificationId>;
}

/// Static API tokens issued outside the session flow.
#[async_trait]
pub trait ApiTokenStore: Send + Sync + 'static {
    /// Returns the owner of `token`, if it is a known API token.
    async fn find_user(&self, token: &str) -> AppResult<Option<UserId>>;
}

/// Pushes a delivery payload to whoever is connected as `user_id`.
#[async_trait]
pub trait NotificationPublisher: Send + Sync + 'static {
    /// Publishes to the user's group and returns how many local connections
    /// the payload was handed to. Zero connections is not an error.
    async fn publish(&self, user_id: UserId, payload: &DeliveryPayload) -> AppResult<usize>;
}
