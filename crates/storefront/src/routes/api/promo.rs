//! Promo code lookup for the product page.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use shopfront_core::ProductId;

use super::ApiError;
use crate::routes::cart::promo_discount;
use crate::state::AppState;

/// Query for `GET /api/promo/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub code: String,
    pub product_id: String,
}

/// Result of a promo check. A rejected code is a normal answer, not an error.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `GET /api/promo/validate?code=..&product_id=..`
pub async fn validate(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let product_id = ProductId::parse(query.product_id.trim())
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let answer = match promo_discount(&state, &query.code, &product_id).await? {
        Ok(percent) => ValidateResponse {
            valid: true,
            discount: Some(percent.value()),
            reason: None,
        },
        Err(e) => ValidateResponse {
            valid: false,
            discount: None,
            reason: Some(e.to_string()),
        },
    };
    Ok(Json(answer))
}
