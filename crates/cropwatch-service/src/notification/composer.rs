//! Builds and persists the notifications an alert produces.

use std::sync::Arc;

use tracing::debug;

use cropwatch_core::error::AppError;
use cropwatch_entity::alert::Alert;
use cropwatch_entity::geo::Candidate;
use cropwatch_entity::notification::{DeliveryPayload, Notification, NotificationType};
use cropwatch_entity::traits::NotificationStore;

/// Description characters quoted in a nearby notice.
const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// Composes author receipts and nearby notices.
///
/// Every compose call stores the notification before returning, so the
/// payload always refers to a persisted record.
#[derive(Clone)]
pub struct NotificationComposer {
    /// Durable notification store.
    store: Arc<dyn NotificationStore>,
}

impl std::fmt::Debug for NotificationComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationComposer").finish_non_exhaustive()
    }
}

impl NotificationComposer {
    /// Creates a composer backed by `store`.
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Confirmation sent to the alert's author.
    pub async fn compose_author_receipt(
        &self,
        alert: &Alert,
    ) -> Result<(Notification, DeliveryPayload), AppError> {
        let notification = Notification::new(
            alert.author_id,
            format!("✅ Alert Created: {}", alert.title),
            format!(
                "Your {} alert for {} has been created successfully.",
                alert.severity, alert.crop
            ),
            NotificationType::AlertCreated,
            Some(alert.id),
        );

        let notification = self.persist(notification).await?;
        let payload = DeliveryPayload::new(&notification, alert);
        Ok((notification, payload))
    }

    /// Personalised notice for a farmer near the alert.
    pub async fn compose_nearby_notice(
        &self,
        alert: &Alert,
        candidate: &Candidate,
    ) -> Result<(Notification, DeliveryPayload), AppError> {
        let notification = Notification::new(
            candidate.user.id,
            format!("🌱 Alert Nearby: {}", alert.title),
            nearby_message(alert, Some(candidate.distance_km)),
            NotificationType::AlertNearby,
            Some(alert.id),
        );

        let notification = self.persist(notification).await?;
        let payload = DeliveryPayload::new(&notification, alert)
            .with_distance(candidate.distance_km, candidate.user.username.clone());
        Ok((notification, payload))
    }

    async fn persist(&self, mut notification: Notification) -> Result<Notification, AppError> {
        let id = self.store.create(&notification).await?;
        notification.id = id;

        debug!(
            notification_id = %id,
            user_id = %notification.user_id,
            notification_type = %notification.notification_type,
            "Notification stored"
        );

        Ok(notification)
    }
}

/// Body of a nearby notice.
fn nearby_message(alert: &Alert, distance_km: Option<f64>) -> String {
    let mut message = format!("New {} alert for {}", alert.severity, alert.crop);

    if let Some(distance) = distance_km {
        message.push_str(&format!(" ({distance:.1}km from you)"));
    }

    if !alert.description.is_empty() {
        let preview: String = alert
            .description
            .chars()
            .take(DESCRIPTION_PREVIEW_CHARS)
            .collect();
        message.push_str(&format!(": {preview}..."));
    }

    message
}
