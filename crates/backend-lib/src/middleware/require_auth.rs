// ============================
// crates/backend-lib/src/middleware/require_auth.rs
// ============================
use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};
use userauth_common::LoginClaims;

use crate::{error::AppError, handlers::auth::LOGIN_COOKIE, AppState};

/// Pull the login token from `Authorization: Bearer` or the login cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == LOGIN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn authenticate(state: &AppState, request: &Request) -> Result<LoginClaims, AppError> {
    let token = extract_token(request.headers()).ok_or(AppError::Unauthorized)?;
    state.auth.validate_token(&token).ok_or(AppError::Unauthorized)
}

/// Reject requests without a valid login token; on success the
/// [`LoginClaims`] are available as a request extension
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &request)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Like [`require_auth`], and the token must carry the admin flag
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &request)?;
    if !claims.is_admin {
        tracing::warn!(user_id = %claims.id, "non-admin request to admin route");
        return Err(AppError::Forbidden);
    }
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
