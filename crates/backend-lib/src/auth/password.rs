// ============================
// userauth-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::AuthError;

/// Bcrypt cost factor used for new hashes
pub const DEFAULT_COST: u32 = 10;

/// One-way salted hashing of plaintext passwords
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password
    async fn hash(&self, plain: &str) -> Result<String, AuthError>;

    /// Check a plaintext password against a stored hash
    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Bcrypt hasher. Hashing runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let plain = Zeroizing::new(plain.to_owned());
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain.as_bytes(), cost))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, AuthError> {
        let plain = Zeroizing::new(plain.to_owned());
        let hash = hash.to_owned();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(plain.as_bytes(), &hash))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        // A stored value that is not a bcrypt hash can never match
        match verified {
            Ok(matched) => Ok(matched),
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is unreadable");
                Ok(false)
            },
        }
    }
}
