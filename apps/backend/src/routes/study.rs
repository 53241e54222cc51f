//! Study endpoints

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::services::study;
use crate::AppState;

/// GET /api/reviews/study
pub async fn queue(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<StudyQuery>,
) -> Result<Json<Vec<StudyCard>>> {
    let cards = study::study_cards(&state.db, &state.config, auth.user_id, &query, Utc::now()).await?;
    Ok(Json(cards))
}

/// GET /api/reviews/practice
pub async fn practice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<PracticeQuery>,
) -> Result<Json<PracticePage>> {
    let page = study::practice_cards(&state.db, &state.config, auth.user_id, &query, Utc::now()).await?;
    Ok(Json(page))
}

/// GET /api/reviews/study-counts
pub async fn counts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<StudyCountsResponse>> {
    let counts = study::study_counts(&state.db, &state.config, auth.user_id, Utc::now()).await?;
    Ok(Json(counts))
}
