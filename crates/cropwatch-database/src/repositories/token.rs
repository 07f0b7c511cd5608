//! Static API tokens backed by the `api_tokens` table.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cropwatch_core::error::{AppError, ErrorKind};
use cropwatch_core::result::AppResult;
use cropwatch_core::types::UserId;
use cropwatch_entity::traits::ApiTokenStore;

/// Repository for static API token lookups.
#[derive(Debug, Clone)]
pub struct ApiTokenRepository {
    pool: PgPool,
}

impl ApiTokenRepository {
    /// Create a new token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiTokenStore for ApiTokenRepository {
    async fn find_user(&self, token: &str) -> AppResult<Option<UserId>> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM api_tokens WHERE key = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map(|id| id.map(UserId::from_uuid))
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to look up API token", e))
    }
}
