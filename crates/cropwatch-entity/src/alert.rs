//! Alert entity model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cropwatch_core::error::AppError;
use cropwatch_core::types::{AlertId, UserId};

use crate::geo::GeoPoint;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational.
    Low,
    /// Worth watching.
    Medium,
    /// Act soon.
    High,
    /// Act now.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// A published hazard report, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert identifier.
    pub id: AlertId,
    /// Short headline.
    pub title: String,
    /// Free-text body.
    #[serde(default)]
    pub description: String,
    /// Affected crop; empty applies to every crop.
    #[serde(default)]
    pub crop: String,
    /// Hazard category (pest, disease, weather...).
    #[serde(default)]
    pub category: String,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable place name, if the author gave one.
    #[serde(default)]
    pub address: Option<String>,
    /// Where the hazard was observed.
    pub origin: GeoPoint,
    /// Notification radius in kilometres.
    pub radius_km: f64,
    /// Who published the alert.
    pub author_id: UserId,
    /// When the alert was created.
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Checks the invariants the fanout engine relies on.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("Alert title must not be empty"));
        }
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(AppError::validation(format!(
                "Alert radius must be a positive number of kilometres, got {}",
                self.radius_km
            )));
        }
        GeoPoint::new(self.origin.latitude, self.origin.longitude)
            .map_err(|e| AppError::validation(format!("Alert origin: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(radius_km: f64) -> Alert {
        Alert {
            id: AlertId::new(),
            title: "Locust swarm".to_string(),
            description: String::new(),
            crop: "Corn".to_string(),
            category: "Pest".to_string(),
            severity: Severity::High,
            address: None,
            origin: GeoPoint::new(10.0, 20.0).unwrap(),
            radius_km,
            author_id: UserId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Critical.to_string(), "Critical");
        assert_eq!(
            serde_json::to_string(&Severity::Medium).unwrap(),
            "\"Medium\""
        );
    }

    #[test]
    fn test_validate_radius() {
        assert!(alert(50.0).validate().is_ok());
        assert!(alert(0.0).validate().is_err());
        assert!(alert(-1.0).validate().is_err());
        assert!(alert(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_origin() {
        let mut a = alert(10.0);
        a.origin = GeoPoint {
            latitude: 95.0,
            longitude: 0.0,
        };
        assert!(a.validate().is_err());
    }
}
