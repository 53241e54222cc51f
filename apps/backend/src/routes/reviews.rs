//! Review submission and undo endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{SubmitReviewRequest, SubmitReviewResponse, UndoReviewResponse};
use crate::routes::auth::AuthenticatedUser;
use crate::services::review;
use crate::AppState;

/// POST /api/reviews
pub async fn submit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<SubmitReviewResponse>> {
    let input = payload.validate()?;
    let response = review::submit_review(&state.db, auth.user_id, input).await?;
    Ok(Json(response))
}

/// DELETE /api/reviews/:id
pub async fn undo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<UndoReviewResponse>> {
    let card = review::undo_review(&state.db, auth.user_id, review_id).await?;
    Ok(Json(UndoReviewResponse {
        card: card.map(|c| c.to_response()),
    }))
}
