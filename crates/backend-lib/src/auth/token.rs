// ============================
// userauth-backend/src/auth/token.rs
// ============================
//! Opaque login tokens.
//!
//! A token is the URL-safe base64 form of `nonce || AES-256-GCM ciphertext`,
//! keyed by a single process-wide secret.
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// Nonce length for AES-GCM (12 bytes standard)
pub const NONCE_LENGTH: usize = 12;

/// Derived key length for AES-256 (32 bytes)
pub const KEY_LENGTH: usize = 32;

/// Shortest secret the codec accepts
pub const MIN_SECRET_LENGTH: usize = 16;

/// Fixed salt for deriving the token key from the configured secret.
/// Changing it invalidates every outstanding token.
const KEY_DERIVATION_SALT: &[u8] = b"userauth.login-token.v1";

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token secret must be at least {} characters", MIN_SECRET_LENGTH)]
    WeakSecret,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("token is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("token is too short")]
    Truncated,

    #[error("token cipher failure")]
    Cipher,

    #[error("token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Symmetric encrypt/decrypt of login tokens
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from the configured secret.
    /// The AES key is stretched from the secret with Argon2id.
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(TokenError::WeakSecret);
        }

        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        Argon2::default()
            .hash_password_into(secret.as_bytes(), KEY_DERIVATION_SALT, &mut key[..])
            .map_err(|e| TokenError::KeyDerivation(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| TokenError::KeyDerivation(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt raw bytes into an opaque token
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, TokenError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| TokenError::Cipher)?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(nonce.as_slice());
        combined.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(combined))
    }

    /// Decrypt an opaque token. Any tampering or a foreign key fails here.
    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>, TokenError> {
        let combined = URL_SAFE_NO_PAD.decode(token.trim())?;
        if combined.len() <= NONCE_LENGTH {
            return Err(TokenError::Truncated);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LENGTH);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| TokenError::Cipher)
    }

    /// Serialize `value` as JSON and encrypt it
    pub fn seal<T: Serialize>(&self, value: &T) -> Result<String, TokenError> {
        let json = Zeroizing::new(serde_json::to_vec(value)?);
        self.encrypt(&json)
    }

    /// Decrypt a token and parse its JSON payload
    pub fn open<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        let json = Zeroizing::new(self.decrypt(token)?);
        Ok(serde_json::from_slice(&json)?)
    }
}
