//! Notification store backed by the `notifications` table.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cropwatch_core::error::{AppError, ErrorKind};
use cropwatch_core::result::AppResult;
use cropwatch_core::types::NotificationId;
use cropwatch_entity::notification::Notification;
use cropwatch_entity::traits::NotificationStore;

/// Repository for notification inserts.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, notification: &Notification) -> AppResult<NotificationId> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO notifications \
             (id, user_id, title, message, notification_type, related_alert_id, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(notification.id.into_uuid())
        .bind(notification.user_id.into_uuid())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.notification_type.as_str())
        .bind(notification.related_alert.map(|id| id.into_uuid()))
        .bind(notification.is_read)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create notification", e))?;

        Ok(NotificationId::from_uuid(id))
    }
}
