pub mod challenges;
pub mod drinks;
pub mod error;
pub mod middleware;
pub mod state;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;

/// All `/api` routes. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/challenges/invite/{code}", get(challenges::get_by_invite));

    let protected_routes = Router::new()
        .route("/api/auth/user", get(users::current_user))
        .route("/api/user/settings", patch(users::update_settings))
        .route("/api/challenges", post(challenges::create_challenge))
        .route("/api/challenges/active", get(challenges::active_challenges))
        .route("/api/challenges/history", get(challenges::challenge_history))
        .route("/api/challenges/{id}", get(challenges::get_challenge))
        .route("/api/challenges/{id}/join", post(challenges::join_challenge))
        .route("/api/challenges/{id}/leaderboard", get(challenges::leaderboard))
        .route("/api/challenges/invite/{code}/join", post(challenges::join_by_invite))
        .route("/api/drinks", post(drinks::log_drink))
        .route("/api/drinks/challenge/{challenge_id}", get(drinks::my_drinks))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
