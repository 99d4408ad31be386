// ============================
// userauth-backend/src/auth/google.rs
// ============================
//! Google ID-token verification.
//!
//! Tokens are RS256 JWTs signed with one of the keys Google publishes as a
//! JWKS document. Keys are cached and refetched when stale or when a token
//! names a key id the cache has not seen.
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

/// Google's published signing keys
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Issuers Google puts in the `iss` claim
pub const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// How long a fetched key set is trusted
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("identity provider is not configured")]
    NotConfigured,

    #[error("malformed ID token: {0}")]
    MalformedToken(String),

    #[error("no signing key with id {0}")]
    UnknownKey(String),

    #[error("ID token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),
}

impl IdentityError {
    /// Failures caused by the network rather than by the token
    pub fn is_transient(&self) -> bool {
        matches!(self, IdentityError::KeyFetch(_))
    }
}

/// Verified fields taken from an ID token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Verifies third-party ID tokens
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check signature, audience, issuer and expiry, returning the claims
    async fn verify_id_token(
        &self,
        id_token: &str,
        audience: &str,
    ) -> Result<IdentityClaims, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

struct CachedKeys {
    fetched_at: Instant,
    keys: HashMap<String, DecodingKey>,
}

impl CachedKeys {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Verifies Google-issued ID tokens against Google's public keys
pub struct GoogleIdentityProvider {
    http: reqwest::Client,
    certs_url: String,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl Default for GoogleIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleIdentityProvider {
    pub fn new() -> Self {
        Self::with_certs_url(GOOGLE_CERTS_URL)
    }

    /// Point the provider at a different JWKS endpoint
    pub fn with_certs_url(certs_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            certs_url: certs_url.into(),
            cache_ttl: JWKS_CACHE_TTL,
            cache: RwLock::new(None),
        }
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.is_fresh(self.cache_ttl))
            .and_then(|c| c.keys.get(kid).cloned())
    }

    async fn refresh_keys(&self) -> Result<(), IdentityError> {
        let set: JwkSet = self
            .http
            .get(&self.certs_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in set.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                continue;
            };
            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                },
                Err(err) => {
                    tracing::warn!(kid = %jwk.kid, error = %err, "skipping unusable signing key");
                },
            }
        }

        tracing::debug!(count = keys.len(), "refreshed identity provider signing keys");
        *self.cache.write().await = Some(CachedKeys {
            fetched_at: Instant::now(),
            keys,
        });
        Ok(())
    }

    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }
        self.refresh_keys().await?;
        self.cached_key(kid)
            .await
            .ok_or_else(|| IdentityError::UnknownKey(kid.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    #[tracing::instrument(skip_all)]
    async fn verify_id_token(
        &self,
        id_token: &str,
        audience: &str,
    ) -> Result<IdentityClaims, IdentityError> {
        let header =
            decode_header(id_token).map_err(|e| IdentityError::MalformedToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::MalformedToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::MalformedToken("missing key id".to_string()))?;

        let key = self.signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&GOOGLE_ISSUERS[..]);

        let data = decode::<GoogleClaims>(id_token, &key, &validation)?;
        Ok(IdentityClaims {
            subject: data.claims.sub,
            email: data.claims.email,
            name: data.claims.name,
            picture: data.claims.picture,
        })
    }
}
