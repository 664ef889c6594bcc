use std::sync::Arc;

use hydrate_db::Database;
use hydrate_engine::ChallengeService;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: ChallengeService<Database>,
    pub jwt_secret: String,
}

/// Run a service call on the blocking pool; SQLite calls must stay off the
/// async workers.
pub async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&ChallengeService<Database>) -> hydrate_engine::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.service))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}
