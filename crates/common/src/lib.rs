// ================
// common/src/lib.rs
// ================
//! Common types shared between the auth backend and its HTTP clients.
//! This module defines the user record as seen by callers, the claims carried
//! inside login tokens, and the request bodies of the auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identifier assigned to a user by the user directory
pub type UserId = String;

/// A user record with every credential stripped.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Directory identifier, always in string form
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Login name; absent for accounts created through an identity provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Display name
    pub fullname: String,
    /// Profile image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    /// Administrative flag
    #[serde(default)]
    pub is_admin: bool,
    /// Google subject identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// When the directory created the record
    pub created_at: DateTime<Utc>,
}

/// Public claims carried inside an opaque login token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginClaims {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub fullname: String,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl From<&User> for LoginClaims {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            fullname: user.fullname.clone(),
            img_url: user.img_url.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Username/password pair sent to the login endpoint.
/// The plaintext is wiped when the value is dropped.
#[derive(Deserialize, Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Signup form
/// # Fields
/// * `username` - Requested login name (required)
/// * `password` - Plaintext password (required, wiped on drop)
/// * `fullname` - Display name (required)
/// * `img_url` - Optional profile image
/// * `is_admin` - Optional admin flag, defaults to false
#[derive(Deserialize, Clone, Default, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

impl SignupRequest {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        fullname: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            fullname: fullname.into(),
            img_url: None,
            is_admin: None,
        }
    }

    /// True when any of username, password or fullname is empty
    pub fn is_missing_fields(&self) -> bool {
        self.username.trim().is_empty()
            || self.password.is_empty()
            || self.fullname.trim().is_empty()
    }
}

/// Body of the Google sign-in endpoint; `credential` is the ID token
/// returned by Google Identity Services.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GoogleLoginRequest {
    pub credential: String,
}
