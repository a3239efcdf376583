//! Authentication route handlers.
//!
//! Handles email/password login and registration plus federated sign-in
//! through the identity service. A successful sign-in makes sure the user has
//! a profile record, stores a [`CurrentUser`] in the session and restores the
//! user's saved cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::Email;
use shopfront_core::auth::{AuthError, FederatedProvider, SignedIn, validate_password};
use shopfront_core::db::UserRepository;
use shopfront_core::models::UserProfile;

use crate::error::{Result, add_breadcrumb, auth_message, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    Page, clear_current_user, flash, safe_redirect, set_current_user, with_next,
};
use crate::models::{CurrentUser, Notice};
use crate::services::cart_store;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Federated sign-in form data: the provider's ID token obtained by the
/// browser.
#[derive(Debug, Deserialize)]
pub struct ProviderForm {
    pub provider: String,
    pub token: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Where to go after signing in.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub next: String,
}

/// Show the identity error as a notice and go back to `path`.
async fn reject(session: &Session, err: &AuthError, path: &str, next: &str) -> Redirect {
    if err.is_user_error() {
        tracing::info!(error = %err, "Sign-in rejected");
    } else {
        tracing::error!(error = %err, "Identity service failed");
    }
    flash(session, Notice::error(auth_message(err))).await;
    Redirect::to(&with_next(path, next))
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: Page, Query(query): Query<NextQuery>) -> impl IntoResponse {
    LoginTemplate {
        page,
        next: safe_redirect(query.next.as_deref(), "/account"),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let next = safe_redirect(form.next.as_deref(), "/account");

    let signed_in = match Email::parse(&form.email) {
        Ok(email) => state.identity().sign_in(&email, &form.password).await,
        Err(e) => Err(AuthError::from(e)),
    };

    match signed_in {
        Ok(signed_in) => {
            complete_sign_in(&state, &session, signed_in, None).await?;
            Ok(Redirect::to(&next))
        }
        Err(e) => Ok(reject(&session, &e, "/auth/login", &next).await),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: Page, Query(query): Query<NextQuery>) -> impl IntoResponse {
    RegisterTemplate {
        page,
        next: safe_redirect(query.next.as_deref(), "/account"),
    }
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect> {
    let next = safe_redirect(form.next.as_deref(), "/account");

    if form.password != form.password_confirm {
        flash(&session, Notice::error("Passwords do not match")).await;
        return Ok(Redirect::to(&with_next("/auth/register", &next)));
    }

    let name = form.name.trim();
    let display_name = (!name.is_empty()).then_some(name);

    let registered = match (Email::parse(&form.email), validate_password(&form.password)) {
        (Err(e), _) => Err(AuthError::from(e)),
        (_, Err(e)) => Err(e),
        (Ok(email), Ok(())) => {
            state
                .identity()
                .register(&email, &form.password, display_name)
                .await
        }
    };

    match registered {
        Ok(signed_in) => {
            complete_sign_in(&state, &session, signed_in, display_name).await?;
            flash(&session, Notice::success("Welcome! Your account is ready")).await;
            Ok(Redirect::to(&next))
        }
        Err(e) => Ok(reject(&session, &e, "/auth/register", &next).await),
    }
}

// =============================================================================
// Federated Sign-in
// =============================================================================

/// Exchange a federated provider token for a session.
#[instrument(skip_all, fields(provider = %form.provider))]
pub async fn provider(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProviderForm>,
) -> Result<Redirect> {
    let next = safe_redirect(form.next.as_deref(), "/account");

    let signed_in = match form.provider.parse::<FederatedProvider>() {
        Ok(provider) => {
            state
                .identity()
                .sign_in_with_provider(provider, form.token.trim())
                .await
        }
        Err(e) => Err(e),
    };

    match signed_in {
        Ok(signed_in) => {
            complete_sign_in(&state, &session, signed_in, None).await?;
            Ok(Redirect::to(&next))
        }
        Err(e) => Ok(reject(&session, &e, "/auth/login", &next).await),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out. The saved cart stays with the account.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    flash(&session, Notice::info("You have been signed out")).await;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Shared
// =============================================================================

/// Finish any successful sign-in or sign-up.
///
/// Creates the profile record on first sign-in (keeping an existing one
/// untouched), stores the session user and merges the guest cart into the
/// saved one. A cart merge failure is logged and does not block sign-in.
///
/// # Errors
///
/// Returns an error if the profile cannot be read or created, or the session
/// cannot be updated.
pub async fn complete_sign_in(
    state: &AppState,
    session: &Session,
    signed_in: SignedIn,
    name_hint: Option<&str>,
) -> Result<CurrentUser> {
    let identity = signed_in.identity;
    let name = name_hint
        .map(str::to_owned)
        .or(identity.display_name)
        .unwrap_or_default();

    let fresh = UserProfile::customer(
        identity.uid.clone(),
        name,
        identity.email.to_string(),
        Utc::now(),
    );
    let (profile, created) = UserRepository::new(state.db()).ensure(&fresh).await?;
    if created {
        tracing::info!(uid = %identity.uid, "Profile created");
    }

    let user = CurrentUser {
        uid: identity.uid,
        email: identity.email,
        name: profile.name,
        role: profile.role,
    };
    set_current_user(session, &user).await?;
    set_sentry_user(&user.uid, Some(user.email.as_str()));
    add_breadcrumb("auth", "Signed in", None);

    if let Err(e) = cart_store::adopt_on_sign_in(state, session, &user).await {
        tracing::warn!(uid = %user.uid, error = %e, "Could not restore saved cart");
    }

    Ok(user)
}
