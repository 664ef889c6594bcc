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

use hydrate_engine::service::Standing;
use hydrate_types::api::{CreateChallengeRequest, JoinResponse, LeaderboardParticipant};
use hydrate_types::models::{Challenge, DEFAULT_LIQUID_COLOR, User};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /api/challenges — the creator is enrolled automatically.
pub async fn create_challenge(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<CreateChallengeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let challenge =
        run_blocking(&state, move |service| service.create_challenge(&user.id, &req)).await?;
    Ok((StatusCode::CREATED, Json(challenge)))
}

/// GET /api/challenges/active — includes challenges that just completed
/// during this request so the client can show the result.
pub async fn active_challenges(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Challenge>>, ApiError> {
    let challenges = run_blocking(&state, move |service| service.active_challenges(&user.id)).await?;
    Ok(Json(challenges))
}

pub async fn challenge_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Challenge>>, ApiError> {
    let challenges = run_blocking(&state, move |service| service.challenge_history(&user.id)).await?;
    Ok(Json(challenges))
}

pub async fn get_challenge(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Challenge>, ApiError> {
    let Path(id) = path?;
    let challenge = run_blocking(&state, move |service| service.challenge(id)).await?;
    Ok(Json(challenge))
}

/// GET /api/challenges/invite/{code} — public so invite links can be previewed.
pub async fn get_by_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Challenge>, ApiError> {
    let challenge = run_blocking(&state, move |service| service.challenge_by_invite(&code)).await?;
    Ok(Json(challenge))
}

pub async fn join_challenge(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    Extension(user): Extension<User>,
) -> Result<Json<JoinResponse>, ApiError> {
    let Path(id) = path?;
    let challenge = run_blocking(&state, move |service| service.join_challenge(id, &user.id)).await?;
    Ok(Json(JoinResponse {
        success: true,
        challenge,
    }))
}

pub async fn join_by_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<JoinResponse>, ApiError> {
    let challenge =
        run_blocking(&state, move |service| service.join_by_invite(&code, &user.id)).await?;
    Ok(Json(JoinResponse {
        success: true,
        challenge,
    }))
}

/// GET /api/challenges/{id}/leaderboard — every participant, highest total
/// first, with the profile details the client renders.
pub async fn leaderboard(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<LeaderboardParticipant>>, ApiError> {
    let Path(id) = path?;
    let standings = run_blocking(&state, move |service| service.standings(id)).await?;
    Ok(Json(standings.into_iter().map(to_participant).collect()))
}

fn to_participant(standing: Standing) -> LeaderboardParticipant {
    let user = standing.user.as_ref();
    LeaderboardParticipant {
        name: user.map(User::public_name).unwrap_or("User").to_string(),
        avatar: user
            .and_then(|u| u.profile_image_url.clone())
            .unwrap_or_else(|| {
                format!("https://api.dicebear.com/7.x/avataaars/svg?seed={}", standing.user_id)
            }),
        color: user
            .map(|u| u.liquid_color.clone())
            .unwrap_or_else(|| DEFAULT_LIQUID_COLOR.to_string()),
        current_ml: standing.total_ml,
        id: standing.user_id,
    }
}
