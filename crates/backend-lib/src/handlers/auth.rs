// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Auth endpoints. Successful logins hand the opaque login token back as
//! an HttpOnly cookie.
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
    Extension, Json,
};
use userauth_common::{Credentials, GoogleLoginRequest, LoginClaims, SignupRequest, User};

use crate::{error::AppError, AppState};

/// Cookie carrying the login token
pub const LOGIN_COOKIE: &str = "loginToken";

fn login_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{LOGIN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cleared_cookie() -> String {
    format!("{LOGIN_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

/// Issue a login token for `user` and return it with the user body
fn logged_in(state: &AppState, user: User) -> Result<Response, AppError> {
    let token = state.auth.get_login_token(&user)?;
    let cookie = login_cookie(&token, state.settings.auth.cookie_secure);
    Ok(([(SET_COOKIE, cookie)], Json(user)).into_response())
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Response, AppError> {
    let user = state
        .auth
        .login(&credentials.username, &credentials.password)
        .await?;
    tracing::info!(user_id = %user.id, "user logged in");
    logged_in(&state, user)
}

/// `POST /api/auth/signup`: create the account and log straight in
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Response, AppError> {
    let user = state.auth.signup(&request).await?;
    logged_in(&state, user)
}

/// `POST /api/auth/google`
pub async fn google(
    State(state): State<AppState>,
    Json(request): Json<GoogleLoginRequest>,
) -> Result<Response, AppError> {
    if request.credential.trim().is_empty() {
        return Err(AppError::InvalidInput("credential is required".to_string()));
    }
    let user = state.auth.verify_google_token(&request.credential).await?;
    logged_in(&state, user)
}

/// `POST /api/auth/logout`
pub async fn logout() -> Response {
    (
        [(SET_COOKIE, cleared_cookie())],
        Json(serde_json::json!({ "msg": "Logged out successfully" })),
    )
        .into_response()
}

/// `GET /api/auth/me`, behind `require_auth`
pub async fn me(Extension(claims): Extension<LoginClaims>) -> Json<LoginClaims> {
    Json(claims)
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_cookie_attributes() {
        let cookie = login_cookie("abc", false);
        assert!(cookie.starts_with("loginToken=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));

        assert!(login_cookie("abc", true).ends_with("; Secure"));
        assert!(cleared_cookie().contains("Max-Age=0"));
    }
}
