//! Admin authentication service.
//!
//! Email and password through the identity service, then the profile role
//! decides. Accounts are created on the storefront; the back-office only
//! signs them in.

mod error;

pub use error::AdminAuthError;

use shopfront_core::Email;
use shopfront_core::auth::IdentityProvider;
use shopfront_core::db::{Database, UserRepository};

use crate::models::CurrentAdmin;

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    identity: &'a dyn IdentityProvider,
    users: UserRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    #[must_use]
    pub fn new(identity: &'a dyn IdentityProvider, db: &'a dyn Database) -> Self {
        Self {
            identity,
            users: UserRepository::new(db),
        }
    }

    /// Sign in and require the admin role on the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::Identity` if the credentials are rejected.
    /// Returns `AdminAuthError::NotAnAdmin` if the profile is missing or its
    /// role cannot access the back-office.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentAdmin, AdminAuthError> {
        let email = Email::parse(email)?;
        let signed_in = self.identity.sign_in(&email, password).await?;
        let uid = signed_in.identity.uid;

        let profile = self
            .users
            .get(&uid)
            .await?
            .ok_or(AdminAuthError::NotAnAdmin)?;
        if !profile.role.can_access_admin() {
            return Err(AdminAuthError::NotAnAdmin);
        }

        Ok(CurrentAdmin {
            name: profile.display_name().to_owned(),
            uid,
            email: signed_in.identity.email,
            role: profile.role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use shopfront_core::UserRole;
    use shopfront_core::auth::MemoryIdentity;
    use shopfront_core::db::MemoryDatabase;
    use shopfront_core::models::UserProfile;

    use super::*;

    async fn account(identity: &MemoryIdentity, db: &MemoryDatabase, role: UserRole) -> Email {
        let email = Email::parse("ops@shop.test").unwrap();
        let signed_in = identity
            .register(&email, "hunter22", Some("Ops"))
            .await
            .unwrap();
        let users = UserRepository::new(db);
        let profile = UserProfile::customer(
            signed_in.identity.uid.clone(),
            "Ops".to_owned(),
            email.to_string(),
            Utc::now(),
        );
        users.ensure(&profile).await.unwrap();
        users.set_role(&signed_in.identity.uid, role).await.unwrap();
        email
    }

    #[tokio::test]
    async fn test_admin_role_signs_in() {
        let identity = MemoryIdentity::new();
        let db = MemoryDatabase::new();
        let email = account(&identity, &db, UserRole::Admin).await;

        let admin = AdminAuthService::new(&identity, &db)
            .sign_in(email.as_str(), "hunter22")
            .await
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert_eq!(admin.name, "Ops");
    }

    #[tokio::test]
    async fn test_customer_role_is_refused() {
        let identity = MemoryIdentity::new();
        let db = MemoryDatabase::new();
        let email = account(&identity, &db, UserRole::Customer).await;

        let err = AdminAuthService::new(&identity, &db)
            .sign_in(email.as_str(), "hunter22")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminAuthError::NotAnAdmin));
    }

    #[tokio::test]
    async fn test_wrong_password_is_identity_error() {
        let identity = MemoryIdentity::new();
        let db = MemoryDatabase::new();
        let email = account(&identity, &db, UserRole::Admin).await;

        let err = AdminAuthService::new(&identity, &db)
            .sign_in(email.as_str(), "wrong-pass")
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Invalid email or password");
    }
}
