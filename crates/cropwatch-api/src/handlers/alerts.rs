//! Alert fanout hook.

use axum::Json;
use axum::extract::State;
use tracing::info;

use cropwatch_service::alert::fanout::FanoutReport;

use crate::dto::FanoutRequest;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/alerts/fanout
///
/// Called by the alert-creation flow once the alert is stored. Notifies the
/// caller and every relevant farmer in range.
pub async fn fanout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<FanoutRequest>,
) -> Result<Json<FanoutReport>, ApiError> {
    let alert = req.into_alert(auth.id)?;

    info!(
        alert_id = %alert.id,
        author_id = %auth.id,
        severity = %alert.severity,
        radius_km = alert.radius_km,
        "Alert fanout requested"
    );

    let report = state.orchestrator.on_alert_created(&alert).await?;
    Ok(Json(report))
}
