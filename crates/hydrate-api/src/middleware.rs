use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use hydrate_types::api::Claims;
use hydrate_types::models::UserProfile;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// Validate the identity provider's bearer token and attach the caller's
/// `User` record, creating it on first sight.
pub async fn require_auth(
    State(state): State<AppState>,
    auth: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = auth.map_err(|_| ApiError::Unauthenticated)?;

    let claims = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthenticated
    })?
    .claims;

    let profile = UserProfile {
        id: claims.sub,
        email: claims.email,
        first_name: claims.given_name,
        last_name: claims.family_name,
        profile_image_url: claims.picture,
    };
    let user = run_blocking(&state, move |service| service.ensure_user(&profile)).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
