//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Route handlers that cannot turn a
//! failure into a notice return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use shopfront_core::auth::AuthError;
use shopfront_core::checkout::CheckoutError;
use shopfront_core::db::{DbError, RepositoryError};

/// Shown when the database refuses our credentials or rules.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "The store database refused the request. Check the database rules and credentials.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Checkout did not produce an order.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Identity service operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

fn db_status(err: &DbError) -> StatusCode {
    match err {
        DbError::PermissionDenied { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DbError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
        DbError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DbError::TooManyRetries { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn db_message(err: &DbError) -> String {
    match err {
        DbError::PermissionDenied { .. } => PERMISSION_DENIED_MESSAGE.to_string(),
        DbError::InvalidPath { .. } => "Invalid identifier".to_string(),
        DbError::Serialization(_) => "Internal server error".to_string(),
        _ => "The store is temporarily unavailable, please try again".to_string(),
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Database(db) => db_status(db),
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::DataCorruption(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::Database(db) => db_message(db),
        RepositoryError::NotFound => "Not found".to_string(),
        RepositoryError::Conflict(msg) => msg.clone(),
        RepositoryError::DataCorruption(_) => "Internal server error".to_string(),
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Checkout(err) => match err {
                CheckoutError::Store(store) => repository_status(store),
                CheckoutError::EmptyCart
                | CheckoutError::ProductUnavailable { .. }
                | CheckoutError::InsufficientStock { .. }
                | CheckoutError::StockConflict { .. } => StatusCode::CONFLICT,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::UnsupportedProvider(_) => StatusCode::BAD_REQUEST,
                AuthError::Disabled => StatusCode::FORBIDDEN,
                AuthError::Transport(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(err) => repository_message(err),
            Self::Checkout(CheckoutError::Store(err)) => repository_message(err),
            Self::Checkout(err) => err.to_string(),
            Self::Auth(err) => auth_message(err),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// User-facing text for identity errors. Transport details stay in the logs.
#[must_use]
pub fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => "Invalid email or password".to_string(),
        AuthError::UserAlreadyExists => "An account with this email already exists".to_string(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
        AuthError::Disabled => "This account has been disabled".to_string(),
        AuthError::InvalidToken => "Your session has expired, please sign in again".to_string(),
        AuthError::UnsupportedProvider(_) => "That sign-in method is not available".to_string(),
        AuthError::Transport(_) => "Sign-in is temporarily unavailable, please try again".to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use shopfront_core::ProductId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("order".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::UserAlreadyExists)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_permission_denied_gives_guidance() {
        let err = AppError::from(DbError::PermissionDenied {
            path: "orders".to_string(),
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.public_message(), PERMISSION_DENIED_MESSAGE);
    }

    #[test]
    fn test_stock_conflict_is_conflict_and_names_product() {
        let err = AppError::Checkout(CheckoutError::StockConflict {
            product: ProductId::new("mug"),
            name: "Blue Mug".to_string(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.public_message().contains("Blue Mug"));
    }

    #[test]
    fn test_transport_details_are_hidden() {
        let err = AppError::Auth(AuthError::Transport("HTTP 500: stack trace".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(!err.public_message().contains("stack trace"));
    }
}
