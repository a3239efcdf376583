//! Order management route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::db::{OrderRepository, RepositoryError};
use shopfront_core::models::Order;
use shopfront_core::{OrderId, OrderStatus};

use super::dashboard::status_class;
use super::{AdminUserView, render};
use crate::{
    error::{AppError, Result},
    filters,
    middleware::{RequireAdminAuth, flash, take_flash},
    models::Flash,
    state::AppState,
};

const CURRENT_PATH: &str = "/orders";

/// Listing filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrderFilterQuery {
    pub status: Option<String>,
}

impl OrderFilterQuery {
    /// The requested status; blank or unknown values mean "all".
    fn status(&self) -> Option<OrderStatus> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// One entry of the status filter or status select.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn status_options(selected: Option<OrderStatus>) -> Vec<StatusOption> {
    OrderStatus::ALL
        .iter()
        .map(|&status| StatusOption {
            value: status.as_str(),
            label: status.label(),
            selected: selected == Some(status),
        })
        .collect()
}

/// Order row for the listing.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: String,
    pub reference: String,
    pub customer_name: String,
    pub customer_email: String,
    pub item_count: u32,
    pub total: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub placed: String,
}

impl From<&Order> for OrderRowView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            reference: order.reference(),
            customer_name: order.customer.name.clone(),
            customer_email: order.customer.email.clone(),
            item_count: order.item_count(),
            total: order.total.to_string(),
            status: order.status.label(),
            status_class: status_class(order.status),
            placed: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Orders list template.
#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    pub orders: Vec<OrderRowView>,
    pub filter: Vec<StatusOption>,
    pub filtered: bool,
}

/// Order detail template.
#[derive(Template)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    pub order: Order,
    pub summary: OrderRowView,
    pub statuses: Vec<StatusOption>,
}

fn parse_id(raw: &str) -> Result<OrderId> {
    OrderId::parse(raw).map_err(|_| AppError::NotFound("order".to_string()))
}

/// Keep orders with the given status; `None` keeps everything.
fn filter_orders(orders: Vec<Order>, status: Option<OrderStatus>) -> Vec<Order> {
    match status {
        Some(status) => orders.into_iter().filter(|o| o.status == status).collect(),
        None => orders,
    }
}

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}", get(show))
        .route("/{id}/status", post(update_status))
        .route("/{id}/delete", post(delete))
}

/// Orders list page handler, newest first.
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderFilterQuery>,
) -> Result<Html<String>> {
    let status = query.status();
    let orders = filter_orders(OrderRepository::new(state.db()).list_all().await?, status);

    Ok(render(&OrdersIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: CURRENT_PATH.to_string(),
        flash: take_flash(&session).await,
        orders: orders.iter().map(OrderRowView::from).collect(),
        filter: status_options(status),
        filtered: status.is_some(),
    }))
}

/// Order detail page handler.
#[instrument(skip(admin, state, session))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let id = parse_id(&id)?;
    let order = OrderRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("order".to_string()))?;

    Ok(render(&OrderShowTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: CURRENT_PATH.to_string(),
        flash: take_flash(&session).await,
        summary: OrderRowView::from(&order),
        statuses: status_options(Some(order.status)),
        order,
    }))
}

/// Change an order's status.
#[instrument(skip(_admin, state, session))]
pub async fn update_status(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let id = parse_id(&id)?;
    let status = form
        .status
        .trim()
        .parse::<OrderStatus>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    match OrderRepository::new(state.db()).set_status(&id, status).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => return Err(AppError::NotFound("order".to_string())),
        Err(e) => return Err(e.into()),
    }
    tracing::info!(order_id = %id, status = status.as_str(), "Order status changed");
    flash(&session, Flash::info(format!("Order marked {}", status.label()))).await;
    Ok(Redirect::to(&format!("/orders/{id}")))
}

/// Delete an order. Stock is not restored.
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = parse_id(&id)?;
    OrderRepository::new(state.db()).delete(&id).await?;
    tracing::info!(order_id = %id, "Order deleted");
    flash(&session, Flash::info("Order deleted")).await;
    Ok(Redirect::to(CURRENT_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_filter_means_all() {
        let query = OrderFilterQuery {
            status: Some("shipped".to_string()),
        };
        assert_eq!(query.status(), None);

        let query = OrderFilterQuery {
            status: Some(" delivered ".to_string()),
        };
        assert_eq!(query.status(), Some(OrderStatus::Delivered));
    }

    #[test]
    fn test_status_options_mark_selection() {
        let options = status_options(Some(OrderStatus::Confirmed));
        let selected: Vec<&str> = options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, ["confirmed"]);
        assert_eq!(options.len(), OrderStatus::ALL.len());
    }
}
