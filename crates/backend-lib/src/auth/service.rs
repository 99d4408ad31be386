// ============================
// userauth-backend/src/auth/service.rs
// ============================
//! The auth service: credential checks, signup, login tokens and Google
//! sign-in, on top of the user directory and its crypto collaborators.
use std::sync::Arc;

use userauth_common::{LoginClaims, SignupRequest, User};

use super::google::{IdentityError, IdentityProvider};
use super::password::PasswordHasher;
use super::token::TokenCodec;
use crate::directory::{DirectoryError, NewUser, UserDirectory};
use crate::error::AuthError;
use crate::metric_keys;

fn reject_login(reason: &'static str) -> AuthError {
    tracing::warn!(reason, "login rejected");
    metrics::counter!(metric_keys::LOGIN_FAILURE).increment(1);
    AuthError::InvalidCredentials
}

/// Identity-provider client plus the audience its tokens must carry
struct GoogleSignIn {
    provider: Arc<dyn IdentityProvider>,
    client_id: String,
}

/// Orchestrates the user directory, password hasher, token codec and
/// identity provider. Built once at startup and shared.
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: TokenCodec,
    google: Option<GoogleSignIn>,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: TokenCodec,
    ) -> Self {
        Self {
            directory,
            hasher,
            tokens,
            google: None,
        }
    }

    /// Enable Google sign-in; `client_id` is the expected token audience
    pub fn with_identity_provider(
        mut self,
        provider: Arc<dyn IdentityProvider>,
        client_id: impl Into<String>,
    ) -> Self {
        self.google = Some(GoogleSignIn {
            provider,
            client_id: client_id.into(),
        });
        self
    }

    /// Check a username/password pair and return the matching user
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        tracing::debug!("login attempt");

        let Some(record) = self.directory.get_by_username(username).await? else {
            return Err(reject_login("unknown username"));
        };

        // Accounts created through Google have no password to match
        let Some(hash) = record.password_hash.as_deref() else {
            return Err(reject_login("account has no password"));
        };

        if !self.hasher.verify(password, hash).await? {
            return Err(reject_login("password mismatch"));
        }

        metrics::counter!(metric_keys::LOGIN_SUCCESS).increment(1);
        Ok(record.user)
    }

    /// Create a username/password account
    #[tracing::instrument(
        skip_all,
        fields(username = %request.username, fullname = %request.fullname)
    )]
    pub async fn signup(&self, request: &SignupRequest) -> Result<User, AuthError> {
        tracing::debug!("signup attempt");
        if request.is_missing_fields() {
            return Err(AuthError::MissingFields);
        }

        if self
            .directory
            .get_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let new_user = NewUser {
            username: Some(request.username.clone()),
            password_hash: Some(password_hash),
            fullname: request.fullname.clone(),
            img_url: request.img_url.clone(),
            is_admin: request.is_admin.unwrap_or(false),
            google_id: None,
            email: None,
        };

        // The directory's own uniqueness check catches a concurrent signup
        // that slipped past the lookup above
        let record = self.directory.add(new_user).await.map_err(|err| match err {
            DirectoryError::UsernameTaken => AuthError::UsernameTaken,
            other => AuthError::Directory(other),
        })?;

        metrics::counter!(metric_keys::SIGNUP).increment(1);
        tracing::info!(user_id = %record.user.id, "user signed up");
        Ok(record.user)
    }

    /// Encrypt the user's public claims into an opaque login token
    pub fn get_login_token(&self, user: &User) -> Result<String, AuthError> {
        Ok(self.tokens.seal(&LoginClaims::from(user))?)
    }

    /// Decrypt a login token. Every failure collapses to `None`.
    pub fn validate_token(&self, token: &str) -> Option<LoginClaims> {
        match self.tokens.open::<LoginClaims>(token) {
            Ok(claims) => Some(claims),
            Err(err) => {
                tracing::debug!(error = %err, "invalid login token");
                metrics::counter!(metric_keys::TOKEN_REJECTED).increment(1);
                None
            },
        }
    }

    /// Verify a Google ID token and return the local user it maps to,
    /// creating that user on first sight
    #[tracing::instrument(skip_all)]
    pub async fn verify_google_token(&self, id_token: &str) -> Result<User, AuthError> {
        let result = self.google_user(id_token).await;
        if let Err(AuthError::VerificationFailed { cause }) = &result {
            tracing::error!(
                error = %cause,
                retryable = cause.is_retryable(),
                "error in verify_google_token"
            );
        }
        result
    }

    async fn google_user(&self, id_token: &str) -> Result<User, AuthError> {
        let google = self
            .google
            .as_ref()
            .ok_or_else(|| AuthError::verification(IdentityError::NotConfigured))?;

        let claims = google
            .provider
            .verify_id_token(id_token, &google.client_id)
            .await
            .map_err(AuthError::verification)?;

        if claims.subject.trim().is_empty() {
            return Err(AuthError::InvalidPayload);
        }
        metrics::counter!(metric_keys::GOOGLE_VERIFIED).increment(1);

        if let Some(existing) = self
            .directory
            .get_by_google_id(&claims.subject)
            .await
            .map_err(AuthError::verification)?
        {
            return Ok(existing.user);
        }

        let fullname = claims
            .name
            .clone()
            .or_else(|| claims.email.clone())
            .unwrap_or_default();
        let new_user = NewUser {
            google_id: Some(claims.subject.clone()),
            email: claims.email,
            fullname,
            img_url: claims.picture,
            ..NewUser::default()
        };

        let record = match self.directory.add(new_user).await {
            Ok(record) => record,
            // A concurrent first sign-in for the same subject got there first
            Err(DirectoryError::GoogleIdTaken) => {
                return self
                    .directory
                    .get_by_google_id(&claims.subject)
                    .await
                    .map_err(AuthError::verification)?
                    .map(|winner| winner.user)
                    .ok_or_else(|| AuthError::verification(DirectoryError::GoogleIdTaken));
            },
            Err(err) => return Err(AuthError::verification(err)),
        };

        metrics::counter!(metric_keys::GOOGLE_USER_CREATED).increment(1);
        tracing::info!(user_id = %record.user.id, "created user from google sign-in");
        Ok(record.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::BcryptHasher;
    use crate::directory::MemoryDirectory;

    fn service(directory: Arc<MemoryDirectory>) -> AuthService {
        AuthService::new(
            directory,
            Arc::new(BcryptHasher::new(4)),
            TokenCodec::new("unit-test-secret-value").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let directory = Arc::new(MemoryDirectory::new());
        let auth = service(directory.clone());

        let created = auth
            .signup(&SignupRequest::new("alice", "pw123", "Alice A"))
            .await
            .unwrap();
        assert_eq!(created.username.as_deref(), Some("alice"));
        assert!(!created.is_admin);

        let stored = directory.get_by_username("alice").await.unwrap().unwrap();
        let hash = stored.password_hash.unwrap();
        assert_ne!(hash, "pw123");
        assert!(hash.starts_with("$2"));

        let logged_in = auth.login("alice", "pw123").await.unwrap();
        assert_eq!(logged_in.id, created.id);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let auth = service(Arc::new(MemoryDirectory::new()));
        auth.signup(&SignupRequest::new("alice", "pw123", "Alice A"))
            .await
            .unwrap();

        let err = auth.login("alice", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let auth = service(Arc::new(MemoryDirectory::new()));
        let err = auth.login("ghost", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let auth = service(Arc::new(MemoryDirectory::new()));
        let mut request = SignupRequest::new("root", "pw", "Root");
        request.is_admin = Some(true);
        request.img_url = Some("https://img/root.png".to_string());
        let user = auth.signup(&request).await.unwrap();

        let token = auth.get_login_token(&user).unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims, LoginClaims::from(&user));
        assert!(claims.is_admin);
    }

    #[tokio::test]
    async fn test_google_not_configured() {
        let auth = service(Arc::new(MemoryDirectory::new()));
        let err = auth.verify_google_token("anything").await.unwrap_err();
        match err {
            AuthError::VerificationFailed {
                cause: crate::error::VerificationCause::Provider(IdentityError::NotConfigured),
            } => {},
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
