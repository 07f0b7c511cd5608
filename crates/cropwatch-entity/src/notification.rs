//! Notification entity model and its delivery projection.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cropwatch_core::types::{AlertId, NotificationId, UserId};

use crate::alert::{Alert, Severity};

/// What caused a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Receipt sent to the author of a new alert.
    AlertCreated,
    /// An alert the user cares about changed.
    AlertUpdated,
    /// A new alert was published near the user.
    AlertNearby,
}

impl NotificationType {
    /// Storage / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlertCreated => "alert_created",
            Self::AlertUpdated => "alert_updated",
            Self::AlertNearby => "alert_nearby",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// What triggered the notification.
    pub notification_type: NotificationType,
    /// The alert this notification is about.
    pub related_alert: Option<AlertId>,
    /// Whether the user has read this notification.
    pub is_read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates an unread notification stamped with the current time.
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
        related_alert: Option<AlertId>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            title: title.into(),
            message: message.into(),
            notification_type,
            related_alert,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// The JSON object pushed to clients inside a `notification` frame.
///
/// Rebuildable at any time from the stored [`Notification`] and its
/// [`Alert`]; never persisted itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    /// Notification id.
    pub id: NotificationId,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub message: String,
    /// Notification type.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Related alert id.
    pub alert_id: AlertId,
    /// Alert headline.
    pub alert_title: String,
    /// Alert severity.
    pub alert_severity: Severity,
    /// Alert crop.
    pub alert_crop: String,
    /// Alert category.
    pub alert_category: String,
    /// Notification creation time.
    pub created_at: DateTime<Utc>,
    /// Read flag at send time.
    pub is_read: bool,
    /// Distance from the recipient to the alert, 2 decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Recipient display name, present alongside `distance_km`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_username: Option<String>,
}

impl DeliveryPayload {
    /// Projects a stored notification plus its alert.
    pub fn new(notification: &Notification, alert: &Alert) -> Self {
        Self {
            id: notification.id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            notification_type: notification.notification_type,
            alert_id: alert.id,
            alert_title: alert.title.clone(),
            alert_severity: alert.severity,
            alert_crop: alert.crop.clone(),
            alert_category: alert.category.clone(),
            created_at: notification.created_at,
            is_read: notification.is_read,
            distance_km: None,
            farmer_username: None,
        }
    }

    /// Adds the personalised distance fields.
    pub fn with_distance(mut self, distance_km: f64, username: impl Into<String>) -> Self {
        self.distance_km = Some(round_to_hundredths(distance_km));
        self.farmer_username = Some(username.into());
        self
    }
}

/// Two-decimal rounding with exact halves going to the even neighbour.
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
