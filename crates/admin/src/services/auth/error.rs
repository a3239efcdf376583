//! Admin authentication error types.

use thiserror::Error;

use shopfront_core::auth::AuthError;
use shopfront_core::db::RepositoryError;

/// Errors that can occur during admin sign-in.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shopfront_core::EmailError),

    /// The identity service rejected the sign-in.
    #[error("identity error: {0}")]
    Identity(#[from] AuthError),

    /// Signed in, but the profile role is not admin (or there is no profile).
    #[error("this account does not have admin access")]
    NotAnAdmin,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl AdminAuthError {
    /// Message for the login form. Transport and database details stay in
    /// the logs.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "Enter a valid email address",
            Self::Identity(AuthError::Transport(_)) | Self::Repository(_) => {
                "Sign-in is temporarily unavailable, please try again"
            }
            Self::Identity(AuthError::Disabled) => "This account has been disabled",
            Self::Identity(_) => "Invalid email or password",
            Self::NotAnAdmin => "This account does not have admin access",
        }
    }
}
