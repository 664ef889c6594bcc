use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use hydrate_engine::Error;
use hydrate_types::api::{LogDrinkRequest, LogDrinkResponse};
use hydrate_types::models::{Drink, User};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /api/drinks — records a drink if the challenge is still running.
/// `challengeCompleted` tells the client this drink ended it.
pub async fn log_drink(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<LogDrinkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let challenge_id = req
        .challenge_id
        .ok_or_else(|| Error::validation("Challenge ID is required"))?;

    let logged = run_blocking(&state, move |service| {
        service.log_drink(&user.id, challenge_id, req.amount_ml)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(LogDrinkResponse {
            drink: logged.drink,
            challenge_completed: logged.challenge_completed,
        }),
    ))
}

/// GET /api/drinks/challenge/{challenge_id} — the caller's own drinks.
pub async fn my_drinks(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Drink>>, ApiError> {
    let Path(challenge_id) = path?;
    let drinks = run_blocking(&state, move |service| service.drinks(&user.id, challenge_id)).await?;
    Ok(Json(drinks))
}
