//! Push-channel authentication.
//!
//! Tokens are opaque to the core; a `TokenValidator` either returns the
//! principal behind a token or rejects it. The bundled implementation decodes
//! JWTs, but anything satisfying the trait plugs in.

pub mod jwt;

pub use jwt::JwtValidator;

#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub user_id: String,
    /// Unix seconds.
    pub expires_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    Expired,
}

pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<AuthPrincipal, AuthError>;
}
