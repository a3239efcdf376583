//! In-process identity provider for tests and local development.
//!
//! Passwords are kept in memory as given; nothing here is persisted. For
//! federated sign-in the "provider token" is taken to be the account's email.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AuthError, FederatedProvider, Identity, IdentityProvider, SignedIn, validate_password};
use crate::types::{Email, UserId};

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: Option<String>,
    disabled: bool,
}

#[derive(Debug, Default)]
struct Accounts {
    /// Keyed by lowercased email.
    by_email: HashMap<String, Account>,
    /// Issued token -> lowercased email.
    tokens: HashMap<String, String>,
}

/// Identity provider backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    accounts: Mutex<Accounts>,
}

impl MemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable an account so further sign-ins fail.
    pub fn disable(&self, email: &Email) {
        if let Some(account) = self.accounts.lock().by_email.get_mut(&key(email)) {
            account.disabled = true;
        }
    }

    /// Revoke every issued token (simulates token expiry).
    pub fn revoke_all_tokens(&self) {
        self.accounts.lock().tokens.clear();
    }

    fn issue(accounts: &mut Accounts, identity: Identity, is_new_user: bool) -> SignedIn {
        let token = format!("mem-{}", uuid::Uuid::new_v4().simple());
        accounts.tokens.insert(token.clone(), key(&identity.email));
        SignedIn {
            identity,
            id_token: token,
            is_new_user,
        }
    }
}

fn key(email: &Email) -> String {
    email.as_str().to_lowercase()
}

fn new_uid() -> UserId {
    UserId::new(uuid::Uuid::new_v4().simple().to_string())
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn register(
        &self,
        email: &Email,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<SignedIn, AuthError> {
        validate_password(password)?;
        let mut accounts = self.accounts.lock();
        if accounts.by_email.contains_key(&key(email)) {
            return Err(AuthError::UserAlreadyExists);
        }
        let identity = Identity {
            uid: new_uid(),
            email: email.clone(),
            display_name: display_name.map(ToOwned::to_owned),
        };
        accounts.by_email.insert(
            key(email),
            Account {
                identity: identity.clone(),
                password: Some(password.to_owned()),
                disabled: false,
            },
        );
        Ok(Self::issue(&mut accounts, identity, true))
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<SignedIn, AuthError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .by_email
            .get(&key(email))
            .ok_or(AuthError::InvalidCredentials)?;
        if account.password.as_deref() != Some(password) {
            return Err(AuthError::InvalidCredentials);
        }
        if account.disabled {
            return Err(AuthError::Disabled);
        }
        let identity = account.identity.clone();
        Ok(Self::issue(&mut accounts, identity, false))
    }

    async fn sign_in_with_provider(
        &self,
        _provider: FederatedProvider,
        provider_token: &str,
    ) -> Result<SignedIn, AuthError> {
        let email = Email::parse(provider_token).map_err(|_| AuthError::InvalidToken)?;
        let mut accounts = self.accounts.lock();
        if let Some(account) = accounts.by_email.get(&key(&email)) {
            if account.disabled {
                return Err(AuthError::Disabled);
            }
            let identity = account.identity.clone();
            return Ok(Self::issue(&mut accounts, identity, false));
        }
        let identity = Identity {
            uid: new_uid(),
            email: email.clone(),
            display_name: None,
        };
        accounts.by_email.insert(
            key(&email),
            Account {
                identity: identity.clone(),
                password: None,
                disabled: false,
            },
        );
        Ok(Self::issue(&mut accounts, identity, true))
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError> {
        let accounts = self.accounts.lock();
        let account = accounts
            .tokens
            .get(id_token)
            .and_then(|email| accounts.by_email.get(email))
            .ok_or(AuthError::InvalidToken)?;
        if account.disabled {
            return Err(AuthError::Disabled);
        }
        Ok(account.identity.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_register_then_sign_in() {
        let idp = MemoryIdentity::new();
        let created = idp
            .register(&email("ann@example.com"), "hunter22", Some("Ann"))
            .await
            .unwrap();
        assert!(created.is_new_user);

        let signed_in = idp.sign_in(&email("ann@example.com"), "hunter22").await.unwrap();
        assert_eq!(signed_in.identity.uid, created.identity.uid);
        assert_eq!(
            idp.lookup(&signed_in.id_token).await.unwrap().uid,
            created.identity.uid
        );
    }

    #[tokio::test]
    async fn test_register_errors() {
        let idp = MemoryIdentity::new();
        assert!(matches!(
            idp.register(&email("a@example.com"), "123", None).await,
            Err(AuthError::WeakPassword(_))
        ));
        idp.register(&email("a@example.com"), "123456", None).await.unwrap();
        assert!(matches!(
            idp.register(&email("a@example.com"), "123456", None).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_disabled() {
        let idp = MemoryIdentity::new();
        let e = email("b@example.com");
        idp.register(&e, "secret1", None).await.unwrap();
        assert!(matches!(
            idp.sign_in(&e, "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        idp.disable(&e);
        assert!(matches!(
            idp.sign_in(&e, "secret1").await,
            Err(AuthError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_provider_sign_in_creates_once() {
        let idp = MemoryIdentity::new();
        let first = idp
            .sign_in_with_provider(FederatedProvider::Google, "c@example.com")
            .await
            .unwrap();
        let second = idp
            .sign_in_with_provider(FederatedProvider::Google, "c@example.com")
            .await
            .unwrap();
        assert!(first.is_new_user);
        assert!(!second.is_new_user);
        assert_eq!(first.identity.uid, second.identity.uid);

        idp.revoke_all_tokens();
        assert!(matches!(
            idp.lookup(&second.id_token).await,
            Err(AuthError::InvalidToken)
        ));
    }
}
