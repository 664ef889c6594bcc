use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};

use hydrate_types::api::UpdateSettingsRequest;
use hydrate_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// GET /api/auth/user
pub async fn current_user(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

/// PATCH /api/user/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<UpdateSettingsRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(req) = payload?;
    let updated = run_blocking(&state, move |service| service.update_settings(&user.id, &req)).await?;
    Ok(Json(updated))
}
