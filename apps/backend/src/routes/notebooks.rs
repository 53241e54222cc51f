//! Notebook scheduler settings

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::services::review;
use crate::AppState;

/// GET /api/notebooks/:id/scheduler
pub async fn get_scheduler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(notebook_id): Path<Uuid>,
) -> Result<Json<SchedulerSettingsResponse>> {
    let notebook = state
        .db
        .get_notebook(auth.user_id, notebook_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notebook not found".to_string()))?;

    Ok(Json(SchedulerSettingsResponse {
        notebook_id: notebook.id,
        config: notebook.scheduler_config.0,
    }))
}

/// PUT /api/notebooks/:id/scheduler
///
/// Existing cards keep their schedule until the notebook is rescheduled.
pub async fn update_scheduler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(notebook_id): Path<Uuid>,
    Json(config): Json<SchedulerConfig>,
) -> Result<Json<SchedulerSettingsResponse>> {
    config.validate()?;

    let notebook = state
        .db
        .update_scheduler_config(auth.user_id, notebook_id, &config)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notebook not found".to_string()))?;

    tracing::info!(notebook_id = %notebook.id, "Scheduler config updated");

    Ok(Json(SchedulerSettingsResponse {
        notebook_id: notebook.id,
        config: notebook.scheduler_config.0,
    }))
}

/// POST /api/notebooks/:id/reschedule
pub async fn reschedule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(notebook_id): Path<Uuid>,
) -> Result<Json<RescheduleResponse>> {
    let cards_rescheduled = review::reschedule_notebook(&state.db, auth.user_id, notebook_id).await?;
    Ok(Json(RescheduleResponse { cards_rescheduled }))
}
