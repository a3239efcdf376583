//! Order email endpoints.
//!
//! The client posts the order it just placed (or wants re-sent). Only the
//! order id is trusted: the order is reloaded from the database and must
//! belong to the caller, unless the caller is an admin.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::OrderId;
use shopfront_core::db::OrderRepository;
use shopfront_core::models::Order;

use super::{ApiError, ApiJson, ApiMessage};
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::services::notifications::NotifyError;
use crate::state::AppState;

/// Order payload. Any other order fields in the body are ignored.
#[derive(Debug, Deserialize)]
pub struct OrderPayload {
    #[serde(alias = "orderId")]
    pub id: String,
}

async fn load_order(state: &AppState, user: &CurrentUser, raw_id: &str) -> Result<Order, ApiError> {
    let not_found = || ApiError::new(StatusCode::NOT_FOUND, "Order not found");
    let id = OrderId::parse(raw_id.trim()).map_err(|_| not_found())?;
    match OrderRepository::new(state.db()).get(&id).await? {
        Some(order) if order.user_id == user.uid || user.role.can_access_admin() => Ok(order),
        _ => Err(not_found()),
    }
}

fn notify_error(err: &NotifyError) -> ApiError {
    match err {
        NotifyError::NoAdminRecipient => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Admin notifications are not configured",
        ),
        NotifyError::InvalidRecipient(_) => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "The order has no valid email address")
        }
        NotifyError::Render(_) | NotifyError::Mail(_) => {
            tracing::error!(error = %err, "Order email failed");
            ApiError::new(StatusCode::BAD_GATEWAY, "Email could not be sent, please try again")
        }
    }
}

/// `POST /send-order-confirmation`
#[instrument(skip_all, fields(uid = %user.uid, order_id = %payload.id))]
pub async fn send_order_confirmation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(payload): ApiJson<OrderPayload>,
) -> Result<Json<ApiMessage>, ApiError> {
    let order = load_order(&state, &user, &payload.id).await?;
    state
        .notifier()
        .send_order_confirmation(&order)
        .await
        .map_err(|e| notify_error(&e))?;
    Ok(ApiMessage::new(format!(
        "Confirmation sent to {}",
        order.customer.email
    )))
}

/// `POST /send-admin-notification`
#[instrument(skip_all, fields(uid = %user.uid, order_id = %payload.id))]
pub async fn send_admin_notification(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(payload): ApiJson<OrderPayload>,
) -> Result<Json<ApiMessage>, ApiError> {
    let order = load_order(&state, &user, &payload.id).await?;
    state
        .notifier()
        .send_admin_notification(&order)
        .await
        .map_err(|e| notify_error(&e))?;
    Ok(ApiMessage::new("Admin notified"))
}
