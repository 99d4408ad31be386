// ============================
// userauth-backend/src/lib.rs
// ============================
//! Username/password and Google sign-in for a web backend, with stateless
//! encrypted login tokens.

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod metric_keys;
pub mod middleware;
pub mod router;

use std::sync::Arc;

use crate::auth::{AuthService, BcryptHasher, GoogleIdentityProvider, TokenCodec};
use crate::config::Settings;
use crate::directory::{FlatFileDirectory, UserDirectory};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<AuthService>,
    /// Settings the process started with
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build every collaborator from validated settings, backed by the
    /// flat-file user directory under `storage.path`
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        settings.validate()?;
        let directory = Arc::new(FlatFileDirectory::new(&settings.storage.path)?);
        Self::with_directory(directory, settings)
    }

    /// Same as [`AppState::new`] with a caller-supplied user directory
    pub fn with_directory(
        directory: Arc<dyn UserDirectory>,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        settings.validate()?;

        let tokens = TokenCodec::new(&settings.auth.token_secret)?;
        let hasher = Arc::new(BcryptHasher::default());
        let mut auth = AuthService::new(directory, hasher, tokens);

        match settings.auth.google_client_id.as_deref() {
            Some(client_id) => {
                let provider =
                    GoogleIdentityProvider::with_certs_url(settings.auth.google_certs_url.clone());
                auth = auth.with_identity_provider(Arc::new(provider), client_id);
            },
            None => tracing::info!("google sign-in disabled: no client id configured"),
        }

        Ok(Self::from_parts(auth, settings))
    }

    /// Wrap an already-built service
    pub fn from_parts(auth: AuthService, settings: Settings) -> Self {
        Self {
            auth: Arc::new(auth),
            settings: Arc::new(settings),
        }
    }
}
