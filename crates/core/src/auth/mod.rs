//! Identity service seam.
//!
//! Accounts live in the hosted identity service; profiles (name, role, ...)
//! live in the database under `users/{uid}`. The [`IdentityProvider`] trait
//! covers the operations the applications need; sign-out and "auth state
//! changed" are handled by the server session, not the provider.

mod error;
pub mod memory;
#[cfg(feature = "remote")]
pub mod rest;

use async_trait::async_trait;

pub use error::AuthError;
pub use memory::MemoryIdentity;
#[cfg(feature = "remote")]
pub use rest::IdentityToolkitClient;

use crate::types::{Email, UserId};

/// Minimum password length accepted by the identity service.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: UserId,
    pub email: Email,
    pub display_name: Option<String>,
}

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub identity: Identity,
    /// Short-lived token accepted by [`IdentityProvider::lookup`].
    pub id_token: String,
    /// True when this call created the account.
    pub is_new_user: bool,
}

/// Federated sign-in providers offered on the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederatedProvider {
    Google,
}

impl FederatedProvider {
    /// Provider id understood by the identity service.
    #[must_use]
    pub const fn provider_id(self) -> &'static str {
        match self {
            Self::Google => "google.com",
        }
    }
}

impl std::str::FromStr for FederatedProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" | "google.com" => Ok(Self::Google),
            other => Err(AuthError::UnsupportedProvider(other.to_owned())),
        }
    }
}

/// Account operations offered by the identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account with email and password.
    async fn register(
        &self,
        email: &Email,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<SignedIn, AuthError>;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<SignedIn, AuthError>;

    /// Exchange a federated provider's ID token for a session, creating the
    /// account on first use.
    async fn sign_in_with_provider(
        &self,
        provider: FederatedProvider,
        provider_token: &str,
    ) -> Result<SignedIn, AuthError>;

    /// Resolve an ID token to its account.
    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError>;
}

/// Check a password against the identity service's minimum rules before
/// sending it.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("12345"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(
            "google".parse::<FederatedProvider>().ok(),
            Some(FederatedProvider::Google)
        );
        assert!(matches!(
            "myspace".parse::<FederatedProvider>(),
            Err(AuthError::UnsupportedProvider(_))
        ));
    }
}
