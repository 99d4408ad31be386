// ============================
// crates/backend-lib/src/router.rs
// ============================
//! Router wiring for the auth endpoints.
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::auth::{google, health, login, logout, me, signup};
use crate::middleware::require_auth;
use crate::AppState;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let auth = Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/google", post(google))
        .route("/logout", post(logout))
        .merge(protected);

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
