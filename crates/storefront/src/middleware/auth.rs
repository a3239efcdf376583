//! Authentication extractors.
//!
//! The session is the source of truth for "who is signed in": sign-in puts a
//! [`CurrentUser`] in it, sign-out removes it, and every request sees the
//! current state through these extractors.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// Page requests are redirected to the login page (coming back afterwards);
/// JSON endpoints get a 401 body.
pub struct RequireAuth(pub CurrentUser);

/// Rejection used when a signed-in user is required.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin { next: String },
    /// Unauthorized response (for JSON requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => {
                Redirect::to(&with_next("/auth/login", &next)).into_response()
            }
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": "Sign in required" })),
            )
                .into_response(),
        }
    }
}

/// Whether a request expects a JSON answer rather than a page.
fn wants_json(parts: &Parts) -> bool {
    let path = parts.uri.path();
    path.starts_with("/api/")
        || path.starts_with("/send-")
        || parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"))
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = current_user(parts).await {
            return Ok(Self(user));
        }

        if wants_json(parts) {
            Err(AuthRejection::Unauthorized)
        } else {
            // Nested routers see the URI with their prefix stripped.
            let uri = parts
                .extensions
                .get::<OriginalUri>()
                .map_or(&parts.uri, |original| &original.0);
            let next = uri.path_and_query().map_or("/", |pq| pq.as_str()).to_owned();
            Err(AuthRejection::RedirectToLogin { next })
        }
    }
}

/// Extractor that optionally gets the signed-in user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Put the signed-in user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Sign out: drop the user and the working cart from the session.
///
/// The cart stays in the user's database mirror.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.remove_value(session_keys::CART).await?;
    Ok(())
}

/// `path?next=<target>`, with the target form-encoded.
#[must_use]
pub fn with_next(path: &str, next: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{path}?{query}")
}

/// Only allow same-site relative redirect targets.
#[must_use]
pub fn safe_redirect(target: Option<&str>, fallback: &str) -> String {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.contains('\\') => t.to_owned(),
        _ => fallback.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/account/orders"), "/"), "/account/orders");
        assert_eq!(safe_redirect(Some("//evil.test"), "/"), "/");
        assert_eq!(safe_redirect(Some("https://evil.test"), "/account"), "/account");
        assert_eq!(safe_redirect(None, "/account"), "/account");
    }

    #[test]
    fn test_with_next_encodes_target() {
        assert_eq!(
            with_next("/auth/login", "/account/orders?page=2"),
            "/auth/login?next=%2Faccount%2Forders%3Fpage%3D2"
        );
    }

    #[tokio::test]
    async fn test_redirect_keeps_the_nested_path() {
        let (mut parts, ()) = axum::http::Request::builder()
            .uri("/orders")
            .body(())
            .unwrap()
            .into_parts();
        parts
            .extensions
            .insert(OriginalUri("/account/orders".parse().unwrap()));

        let response = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap()
            .into_response();

        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login?next=%2Faccount%2Forders"
        );
    }

    #[test]
    fn test_wants_json_for_api_and_notification_paths() {
        let (parts, ()) = axum::http::Request::builder()
            .uri("/send-order-confirmation")
            .body(())
            .unwrap()
            .into_parts();
        assert!(wants_json(&parts));

        let (parts, ()) = axum::http::Request::builder()
            .uri("/account")
            .body(())
            .unwrap()
            .into_parts();
        assert!(!wants_json(&parts));
    }
}
