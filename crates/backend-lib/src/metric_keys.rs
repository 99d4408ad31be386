// ==============
// crates/backend-lib/src/metric_keys.rs

//! Central place for metric keys
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const SIGNUP: &str = "auth.signup";
pub const GOOGLE_VERIFIED: &str = "auth.google.verified";
pub const GOOGLE_USER_CREATED: &str = "auth.google.user_created";
pub const TOKEN_REJECTED: &str = "auth.token.rejected";
