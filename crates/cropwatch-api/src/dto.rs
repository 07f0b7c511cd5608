//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cropwatch_core::error::AppError;
use cropwatch_core::types::{AlertId, UserId};
use cropwatch_entity::alert::{Alert, Severity};
use cropwatch_entity::geo::GeoPoint;

/// A freshly created alert handed to the fanout hook.
///
/// The author is always the authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutRequest {
    /// Alert id assigned by the alert store; generated when absent.
    #[serde(default)]
    pub id: Option<AlertId>,
    /// Short headline.
    pub title: String,
    /// Free-text body.
    #[serde(default)]
    pub description: String,
    /// Affected crop; empty targets every crop.
    #[serde(default)]
    pub crop: String,
    /// Hazard category.
    #[serde(default)]
    pub category: String,
    /// Severity level.
    pub severity: Severity,
    /// Place name.
    #[serde(default)]
    pub address: Option<String>,
    /// Origin latitude.
    pub latitude: f64,
    /// Origin longitude.
    pub longitude: f64,
    /// Notification radius in kilometres.
    pub radius_km: f64,
    /// Creation time; defaults to now.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl FanoutRequest {
    /// Builds the alert authored by `author_id`.
    pub fn into_alert(self, author_id: UserId) -> Result<Alert, AppError> {
        let origin = GeoPoint::new(self.latitude, self.longitude)
            .map_err(|e| AppError::validation(format!("Alert origin: {e}")))?;

        let alert = Alert {
            id: self.id.unwrap_or_default(),
            title: self.title,
            description: self.description,
            crop: self.crop,
            category: self.category,
            severity: self.severity,
            address: self.address,
            origin,
            radius_km: self.radius_km,
            author_id,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        };
        alert.validate()?;
        Ok(alert)
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// `connected`, `unreachable`, or `memory`.
    pub database: String,
    /// Open WebSocket connections on this node.
    pub ws_connections: usize,
}
