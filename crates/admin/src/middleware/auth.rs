//! Authentication middleware and extractors for admin.
//!
//! The session says who signed in; the profile record says whether they are
//! still an admin. [`RequireAdminAuth`] checks both on every request, so a
//! demoted or deleted user loses access without waiting for the session to
//! expire.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use shopfront_core::UserRole;
use shopfront_core::db::UserRepository;

use crate::models::{CurrentAdmin, Flash, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user whose profile role is admin.
///
/// If nobody is signed in, returns a redirect to the login page for HTML
/// requests, or 401 Unauthorized for API requests.
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when admin authentication fails.
pub enum AdminAuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// The profile could not be read.
    Unavailable,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "The store database is unavailable, please try again",
            )
                .into_response(),
        }
    }
}

fn not_signed_in(parts: &Parts) -> AdminAuthRejection {
    if parts.uri.path().starts_with("/api/") {
        AdminAuthRejection::Unauthorized
    } else {
        AdminAuthRejection::RedirectToLogin
    }
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection::Unauthorized)?;

        let Some(admin) = session
            .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
        else {
            return Err(not_signed_in(parts));
        };

        let profile = UserRepository::new(state.db())
            .get(&admin.uid)
            .await
            .map_err(|e| {
                tracing::error!(uid = %admin.uid, error = %e, "Failed to load admin profile");
                AdminAuthRejection::Unavailable
            })?;

        let role = profile.as_ref().map_or(UserRole::Customer, |p| p.role);
        if role.can_access_admin() {
            return Ok(Self(CurrentAdmin { role, ..admin }));
        }

        tracing::warn!(uid = %admin.uid, "Admin access revoked, ending session");
        let _ = clear_current_admin(&session).await;
        let _ = session
            .insert(
                session_keys::FLASH,
                Flash::error("Your account no longer has admin access"),
            )
            .await;
        Err(not_signed_in(parts))
    }
}

/// Extractor that optionally gets the current admin from the session.
///
/// Does not consult the profile; only used to skip the login page.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(admin))
    }
}

/// Store the admin in the session after sign-in, cycling the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Remove the admin from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?;
    Ok(())
}

/// Queue a flash message for the next page.
pub async fn flash(session: &Session, message: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, &message).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the pending flash message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
