//! User profile commands.
//!
//! Roles live on the profile record, so granting back-office access is a
//! database write; the identity service account is not touched.

use shopfront_core::db::{Database, UserRepository};
use shopfront_core::models::UserProfile;
use shopfront_core::{UserId, UserRole};

use super::CliError;

/// Find a profile by email (case-insensitive) or by user id.
///
/// # Errors
///
/// Returns `CliError::NotFound` if no profile matches.
pub async fn find_profile(db: &dyn Database, user: &str) -> Result<UserProfile, CliError> {
    let users = UserRepository::new(db);
    let user = user.trim();

    let found = if user.contains('@') {
        users
            .list()
            .await?
            .into_iter()
            .find(|p| p.email.eq_ignore_ascii_case(user))
    } else {
        let uid = UserId::parse(user).map_err(|e| CliError::Invalid("user id", e.to_string()))?;
        users.get(&uid).await?
    };

    found.ok_or_else(|| CliError::NotFound(format!("user {user}")))
}

/// Set a user's role.
///
/// # Errors
///
/// Returns `CliError::Invalid` for an unknown role and `CliError::NotFound`
/// if the user has no profile.
pub async fn set_role(db: &dyn Database, user: &str, role: &str) -> Result<(), CliError> {
    let role: UserRole = role
        .trim()
        .parse()
        .map_err(|_| CliError::Invalid("role", format!("{role} (valid: customer, admin)")))?;

    let profile = find_profile(db, user).await?;
    if profile.role == role {
        tracing::info!(uid = %profile.uid, role = %role, "Role already set");
        return Ok(());
    }

    UserRepository::new(db).set_role(&profile.uid, role).await?;
    tracing::info!(
        uid = %profile.uid,
        email = %profile.email,
        from = %profile.role,
        to = %role,
        "Role updated"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use shopfront_core::db::MemoryDatabase;

    use super::*;

    async fn db_with_user() -> MemoryDatabase {
        let db = MemoryDatabase::new();
        UserRepository::new(&db)
            .ensure(&UserProfile::customer(
                UserId::new("u1"),
                "Ann".to_owned(),
                "Ann@Shop.test".to_owned(),
                Utc::now(),
            ))
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_promote_by_email_ignores_case() {
        let db = db_with_user().await;
        set_role(&db, "ann@shop.test", "admin").await.unwrap();
        let profile = UserRepository::new(&db)
            .get(&UserId::new("u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_unknown_role_and_user() {
        let db = db_with_user().await;
        assert!(matches!(
            set_role(&db, "u1", "owner").await,
            Err(CliError::Invalid("role", _))
        ));
        assert!(matches!(
            set_role(&db, "nobody@shop.test", "admin").await,
            Err(CliError::NotFound(_))
        ));
    }
}
