//! Alert fanout: author receipt, proximity selection, per-recipient delivery.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use cropwatch_core::config::FanoutConfig;
use cropwatch_core::error::AppError;
use cropwatch_core::types::AlertId;
use cropwatch_entity::alert::Alert;
use cropwatch_entity::geo::Candidate;
use cropwatch_entity::traits::NotificationPublisher;

use crate::geo::proximity::ProximitySearch;
use crate::geo::relevance::filter_by_crop;
use crate::notification::composer::NotificationComposer;

/// Outcome of one fanout run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    /// The alert that was fanned out.
    pub alert_id: Option<AlertId>,
    /// Whether the author receipt was stored.
    pub author_notified: bool,
    /// Recipients left after proximity and crop filtering.
    pub candidates: usize,
    /// Nearby notices stored and handed to the publisher.
    pub delivered: usize,
    /// Nearby notices that failed to store or publish.
    pub failed: usize,
    /// Live connections reached across all publishes.
    pub connections_reached: usize,
}

/// Runs the notification fanout for a newly created alert.
#[derive(Clone)]
pub struct AlertFanoutOrchestrator {
    search: ProximitySearch,
    composer: NotificationComposer,
    publisher: Arc<dyn NotificationPublisher>,
    config: FanoutConfig,
}

impl std::fmt::Debug for AlertFanoutOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertFanoutOrchestrator")
            .field("search", &self.search)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AlertFanoutOrchestrator {
    /// Creates an orchestrator.
    pub fn new(
        search: ProximitySearch,
        composer: NotificationComposer,
        publisher: Arc<dyn NotificationPublisher>,
        config: FanoutConfig,
    ) -> Self {
        Self {
            search,
            composer,
            publisher,
            config,
        }
    }

    /// Notifies the author and every relevant farmer within the alert's radius.
    ///
    /// Only an invalid alert fails the call. Storage and delivery failures
    /// are logged and counted in the report.
    pub async fn on_alert_created(&self, alert: &Alert) -> Result<FanoutReport, AppError> {
        alert.validate()?;

        let mut report = FanoutReport {
            alert_id: Some(alert.id),
            ..FanoutReport::default()
        };

        self.notify_author(alert, &mut report).await;

        let candidates = self.select_recipients(alert).await;
        report.candidates = candidates.len();

        for candidate in &candidates {
            match self.notify_candidate(alert, candidate).await {
                Ok(connections) => {
                    report.delivered += 1;
                    report.connections_reached += connections;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        alert_id = %alert.id,
                        user_id = %candidate.user.id,
                        error = %e,
                        "Failed to notify nearby user"
                    );
                }
            }
        }

        info!(
            alert_id = %alert.id,
            author_notified = report.author_notified,
            candidates = report.candidates,
            delivered = report.delivered,
            failed = report.failed,
            connections = report.connections_reached,
            "Alert fanout complete"
        );

        Ok(report)
    }

    async fn notify_author(&self, alert: &Alert, report: &mut FanoutReport) {
        let payload = match self.composer.compose_author_receipt(alert).await {
            Ok((_, payload)) => payload,
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "Failed to store author receipt");
                return;
            }
        };
        report.author_notified = true;

        match self.publisher.publish(alert.author_id, &payload).await {
            Ok(connections) => report.connections_reached += connections,
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "Failed to publish author receipt");
            }
        }
    }

    /// Proximity search capped at `max_recipients`, then crop relevance.
    /// The author is never a recipient of their own nearby notice.
    async fn select_recipients(&self, alert: &Alert) -> Vec<Candidate> {
        let nearby = match self
            .search
            .find_within(alert.origin, alert.radius_km, self.config.max_recipients)
            .await
        {
            Ok(nearby) => nearby,
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "Proximity search failed");
                return Vec::new();
            }
        };

        filter_by_crop(nearby, &alert.crop)
            .into_iter()
            .filter(|c| c.user.id != alert.author_id)
            .collect()
    }

    async fn notify_candidate(&self, alert: &Alert, candidate: &Candidate) -> Result<usize, AppError> {
        let (_, payload) = self.composer.compose_nearby_notice(alert, candidate).await?;
        self.publisher.publish(candidate.user.id, &payload).await
    }
}
