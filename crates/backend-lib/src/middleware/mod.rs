// crates/backend-lib/src/middleware/mod.rs

//! Middleware guarding routes behind a valid login token.

pub mod require_auth;

pub use require_auth::{extract_token, require_admin, require_auth};
