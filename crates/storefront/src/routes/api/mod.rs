//! JSON endpoints.
//!
//! Every failure is answered as `{"success": false, "error": "..."}` with a
//! matching status code, never as an HTML page.

pub mod notifications;
pub mod promo;

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

/// Error response for API endpoints.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub success: bool,
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            error: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(&err);
            tracing::error!(error = %err, sentry_event_id = %event_id, "API error");
        }
        Self::new(status, err.public_message())
    }
}

impl From<shopfront_core::db::RepositoryError> for ApiError {
    fn from(err: shopfront_core::db::RepositoryError) -> Self {
        AppError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected JSON body");
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => "Expected a JSON request body",
            _ => "Invalid request body",
        };
        Self::new(rejection.status(), message)
    }
}

/// JSON body extractor that fails with an [`ApiError`] body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Successful action response.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn new(msg: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: msg.into(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_body_shape() {
        let err = ApiError::new(StatusCode::NOT_FOUND, "Order not found");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "error": "Order not found" }));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_an_api_error() {
        let request = axum::http::Request::builder()
            .method("POST")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{\"id\": "))
            .unwrap();

        let err = ApiJson::<serde_json::Value>::from_request(request, &())
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(!err.success);
        assert_eq!(err.error, "Invalid request body");
    }
}
