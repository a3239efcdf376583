//! User management route handlers.
//!
//! Only the profile record is managed here; identity service accounts are
//! left alone.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::db::{RepositoryError, UserRepository};
use shopfront_core::models::UserProfile;
use shopfront_core::{UserId, UserRole};

use super::{AdminUserView, render};
use crate::{
    error::{AppError, Result},
    filters,
    middleware::{RequireAdminAuth, flash, take_flash},
    models::{CurrentAdmin, Flash},
    state::AppState,
};

const CURRENT_PATH: &str = "/users";

/// Role select option.
#[derive(Debug, Clone)]
pub struct RoleOption {
    pub value: &'static str,
    pub selected: bool,
}

/// User row for the listing.
#[derive(Debug, Clone)]
pub struct UserView {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: &'static str,
    pub roles: Vec<RoleOption>,
    pub joined: String,
    /// The signed-in admin's own row: no role change or delete offered.
    pub is_self: bool,
}

impl UserView {
    fn new(profile: &UserProfile, admin: &CurrentAdmin) -> Self {
        Self {
            uid: profile.uid.to_string(),
            name: profile.display_name().to_owned(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            role: profile.role.as_str(),
            roles: UserRole::ALL
                .iter()
                .map(|&role| RoleOption {
                    value: role.as_str(),
                    selected: role == profile.role,
                })
                .collect(),
            joined: profile.created_at.format("%Y-%m-%d").to_string(),
            is_self: profile.uid == admin.uid,
        }
    }
}

/// Users list template.
#[derive(Template)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    pub users: Vec<UserView>,
}

/// Role change form.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

fn parse_uid(raw: &str) -> Result<UserId> {
    UserId::parse(raw).map_err(|_| AppError::NotFound("user".to_string()))
}

/// Refuse changes to the signed-in admin's own profile, which would lock
/// them out mid-session.
fn ensure_not_self(admin: &CurrentAdmin, uid: &UserId) -> Result<()> {
    if &admin.uid == uid {
        return Err(AppError::BadRequest(
            "You cannot change or delete your own account here".to_string(),
        ));
    }
    Ok(())
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{uid}/role", post(update_role))
        .route("/{uid}/delete", post(delete))
}

/// Users list page handler.
#[instrument(skip_all)]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let mut users = UserRepository::new(state.db()).list().await?;
    users.sort_by_key(|u| std::cmp::Reverse(u.created_at));

    Ok(render(&UsersIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: CURRENT_PATH.to_string(),
        flash: take_flash(&session).await,
        users: users.iter().map(|u| UserView::new(u, &admin)).collect(),
    }))
}

/// Change a user's role.
#[instrument(skip(admin, state, session))]
pub async fn update_role(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(uid): Path<String>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect> {
    let uid = parse_uid(&uid)?;
    ensure_not_self(&admin, &uid)?;
    let role = form
        .role
        .trim()
        .parse::<UserRole>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    match UserRepository::new(state.db()).set_role(&uid, role).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => return Err(AppError::NotFound("user".to_string())),
        Err(e) => return Err(e.into()),
    }
    tracing::info!(uid = %uid, role = role.as_str(), by = %admin.uid, "User role changed");
    flash(&session, Flash::info(format!("Role set to {role}"))).await;
    Ok(Redirect::to(CURRENT_PATH))
}

/// Delete a user's profile record, with their addresses and cart mirror.
#[instrument(skip(admin, state, session))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(uid): Path<String>,
) -> Result<Redirect> {
    let uid = parse_uid(&uid)?;
    ensure_not_self(&admin, &uid)?;
    UserRepository::new(state.db()).delete(&uid).await?;
    tracing::info!(uid = %uid, by = %admin.uid, "User profile deleted");
    flash(&session, Flash::info("User profile deleted")).await;
    Ok(Redirect::to(CURRENT_PATH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use shopfront_core::Email;

    use super::*;

    fn admin() -> CurrentAdmin {
        CurrentAdmin {
            uid: UserId::new("a1"),
            email: Email::parse("ops@shop.test").unwrap(),
            name: "Ops".to_string(),
            role: UserRole::Admin,
        }
    }

    #[test]
    fn test_own_account_is_protected() {
        assert!(ensure_not_self(&admin(), &UserId::new("a1")).is_err());
        assert!(ensure_not_self(&admin(), &UserId::new("u2")).is_ok());
    }

    #[test]
    fn test_user_view_selects_current_role() {
        let profile = UserProfile::customer(
            UserId::new("u2"),
            String::new(),
            "ann@shop.test".to_string(),
            Utc::now(),
        );
        let view = UserView::new(&profile, &admin());
        assert_eq!(view.name, "ann");
        assert!(!view.is_self);
        let selected: Vec<&str> = view
            .roles
            .iter()
            .filter(|r| r.selected)
            .map(|r| r.value)
            .collect();
        assert_eq!(selected, ["customer"]);
    }
}
