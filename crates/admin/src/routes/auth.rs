//! Authentication route handlers for admin.
//!
//! Accounts are registered on the storefront; here they only sign in, and
//! only if their profile role is admin.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::render;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin, take_flash};
use crate::models::Flash;
use crate::services::{AdminAuthError, AdminAuthService};
use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginPageTemplate {
    pub email: String,
    pub flash: Option<Flash>,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", post(logout))
}

/// Render the login page.
///
/// GET /auth/login
async fn login_page(OptionalAdminAuth(admin): OptionalAdminAuth, session: Session) -> Response {
    if admin.is_some() {
        return Redirect::to("/").into_response();
    }
    render(&LoginPageTemplate {
        email: String::new(),
        flash: take_flash(&session).await,
    })
    .into_response()
}

fn login_failed(email: String, err: &AdminAuthError) -> Html<String> {
    render(&LoginPageTemplate {
        email,
        flash: Some(Flash::error(err.public_message())),
    })
}

/// Sign in.
///
/// POST /auth/login
#[instrument(skip_all, fields(email = %form.email))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim().to_owned();
    let service = AdminAuthService::new(state.identity(), state.db());

    let admin = match service.sign_in(&email, &form.password).await {
        Ok(admin) => admin,
        Err(e) => {
            match &e {
                AdminAuthError::Repository(_) => {
                    tracing::error!(error = %e, "Admin sign-in failed");
                }
                _ => tracing::warn!(error = %e, "Admin sign-in rejected"),
            }
            return login_failed(email, &e).into_response();
        }
    };

    if let Err(e) = set_current_admin(&session, &admin).await {
        return AppError::from(e).into_response();
    }
    set_sentry_user(&admin.uid, Some(admin.email.as_str()));
    tracing::info!(uid = %admin.uid, "Admin signed in");

    Redirect::to("/").into_response()
}

/// Logout and clear session.
///
/// POST /auth/logout
async fn logout(session: Session) -> impl IntoResponse {
    let _ = clear_current_admin(&session).await;
    clear_sentry_user();
    Redirect::to("/auth/login")
}
