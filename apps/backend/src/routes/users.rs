//! User registration

use axum::{extract::State, Json};

use crate::error::Result;
use crate::models::{RegisterUserRequest, RegisterUserResponse};
use crate::AppState;

/// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    payload: Option<Json<RegisterUserRequest>>,
) -> Result<Json<RegisterUserResponse>> {
    let name = payload.and_then(|Json(p)| p.name);
    let user = state.db.create_user(name.as_deref()).await?;

    tracing::info!(user_id = %user.id, "Registered user");

    Ok(Json(RegisterUserResponse {
        user_id: user.id,
        token: user.token,
    }))
}
