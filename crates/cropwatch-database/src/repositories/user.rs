//! User directory backed by the `users` table.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cropwatch_core::error::{AppError, ErrorKind};
use cropwatch_core::result::AppResult;
use cropwatch_core::types::UserId;
use cropwatch_entity::traits::UserDirectory;
use cropwatch_entity::user::UserLocation;

/// Raw `users` row; coordinates are left unvalidated.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    crops: Option<Vec<String>>,
}

impl From<UserRow> for UserLocation {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            username: row.username,
            latitude: row.latitude,
            longitude: row.longitude,
            crops: row.crops.unwrap_or_default(),
        }
    }
}

/// Read-only repository over the account owner's `users` table.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn get_user(&self, id: UserId) -> AppResult<Option<UserLocation>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, latitude, longitude, crops FROM users WHERE id = $1",
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(UserLocation::from))
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn list_users_with_location(&self) -> AppResult<Vec<UserLocation>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, latitude, longitude, crops FROM users \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
             AND NOT (latitude = 0 AND longitude = 0)",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list located users", e)
        })?;

        Ok(rows.into_iter().map(UserLocation::from).collect())
    }
}
