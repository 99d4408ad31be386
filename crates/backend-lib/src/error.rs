// crates/backend-lib/src/error.rs

//! Central error types + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::google::IdentityError;
use crate::auth::token::TokenError;
use crate::directory::DirectoryError;

/// Failures reported by [`crate::auth::AuthService`]
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Missing required signup information")]
    MissingFields,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid token payload")]
    InvalidPayload,

    #[error("Failed to verify Google token or process user data: {cause}")]
    VerificationFailed { cause: VerificationCause },

    #[error("User directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Login token error: {0}")]
    Token(#[from] TokenError),
}

/// What went wrong underneath a failed identity-provider sign-in
#[derive(Error, Debug)]
pub enum VerificationCause {
    #[error("identity provider rejected the token: {0}")]
    Provider(#[from] IdentityError),

    #[error("user directory failed: {0}")]
    Directory(#[from] DirectoryError),
}

impl VerificationCause {
    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            VerificationCause::Provider(err) => err.is_transient(),
            VerificationCause::Directory(
                DirectoryError::UsernameTaken | DirectoryError::GoogleIdTaken,
            ) => false,
            VerificationCause::Directory(_) => true,
        }
    }
}

impl AuthError {
    pub(crate) fn verification(cause: impl Into<VerificationCause>) -> Self {
        AuthError::VerificationFailed {
            cause: cause.into(),
        }
    }
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Administrator access required")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidPayload => {
                    StatusCode::UNAUTHORIZED
                },
                AuthError::MissingFields => StatusCode::BAD_REQUEST,
                AuthError::UsernameTaken => StatusCode::CONFLICT,
                AuthError::VerificationFailed { cause } if cause.is_retryable() => {
                    StatusCode::SERVICE_UNAVAILABLE
                },
                AuthError::VerificationFailed { .. } => StatusCode::UNAUTHORIZED,
                AuthError::Directory(_) | AuthError::PasswordHash(_) | AuthError::Token(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
            },
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(err) => match err {
                AuthError::InvalidCredentials => "AUTH_001",
                AuthError::MissingFields => "AUTH_002",
                AuthError::UsernameTaken => "AUTH_003",
                AuthError::InvalidPayload => "AUTH_004",
                AuthError::VerificationFailed { .. } => "AUTH_005",
                AuthError::Directory(_) => "DIR_001",
                AuthError::PasswordHash(_) => "INT_002",
                AuthError::Token(_) => "INT_003",
            },
            AppError::Unauthorized => "AUTH_006",
            AppError::Forbidden => "AUTH_007",
            AppError::InvalidInput(_) => "VAL_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid username or password".to_string(),
                AuthError::MissingFields => "Missing required signup information".to_string(),
                AuthError::UsernameTaken => "Username already taken".to_string(),
                AuthError::InvalidPayload | AuthError::VerificationFailed { .. } => {
                    "Failed to verify Google sign-in".to_string()
                },
                _ => "An internal server error occurred".to_string(),
            },
            AppError::Unauthorized => "Not authenticated".to_string(),
            AppError::Forbidden => "Not authorized".to_string(),
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
        assert_eq!(AuthError::UsernameTaken.to_string(), "Username already taken");

        let err = AuthError::verification(IdentityError::NotConfigured);
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::MissingFields).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::UsernameTaken).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);

        let unknown_key = AuthError::verification(IdentityError::UnknownKey("kid-1".into()));
        assert_eq!(
            AppError::from(unknown_key).status_code(),
            StatusCode::UNAUTHORIZED
        );

        let disk = DirectoryError::Io(std::io::Error::other("disk full"));
        let retryable = AuthError::verification(disk);
        assert_eq!(
            AppError::from(retryable).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_app_error_error_codes() {
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).error_code(),
            "AUTH_001"
        );
        assert_eq!(AppError::Unauthorized.error_code(), "AUTH_006");
        assert_eq!(AppError::InvalidInput("x".into()).error_code(), "VAL_001");
    }

    #[test]
    fn test_sanitized_message_hides_internals() {
        let err = AppError::from(AuthError::PasswordHash("bcrypt exploded".into()));
        assert!(!err.sanitized_message().contains("bcrypt"));
    }

    #[tokio::test]
    async fn test_error_serialization() {
        let response = AppError::from(AuthError::UsernameTaken).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let content_type = response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.contains("application/json"));
    }
}
