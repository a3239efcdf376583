//! Authentication error types.

use thiserror::Error;

/// Errors returned by an [`IdentityProvider`](super::IdentityProvider).
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] crate::types::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already uses this email.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The account has been disabled by an operator.
    #[error("account disabled")]
    Disabled,

    /// The ID token is expired, revoked or malformed.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The federated provider is not enabled.
    #[error("sign-in provider not supported: {0}")]
    UnsupportedProvider(String),

    /// The identity service could not be reached or failed.
    #[error("identity service error: {0}")]
    Transport(String),
}

impl AuthError {
    /// Whether the error is caused by the caller's input rather than the service.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
