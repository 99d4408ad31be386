// ============================
// userauth-backend/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod google;
pub mod password;
pub mod token;
mod service;

pub use google::{GoogleIdentityProvider, IdentityClaims, IdentityError, IdentityProvider};
pub use password::{BcryptHasher, PasswordHasher, DEFAULT_COST};
pub use service::AuthService;
pub use token::{TokenCodec, TokenError};
