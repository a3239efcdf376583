//! Dashboard route handler.

use askama::Template;
use axum::{Router, extract::State, response::Html, routing::get};
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::models::Order;
use shopfront_core::{OrderStatus, UserRole};

use super::render;
use crate::{
    error::Result,
    filters,
    middleware::{RequireAdminAuth, take_flash},
    models::{CurrentAdmin, Flash},
    services::DashboardStats,
    state::AppState,
};

/// Admin user view for templates.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
}

impl From<&CurrentAdmin> for AdminUserView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            name: admin.name.clone(),
            email: admin.email.to_string(),
        }
    }
}

/// One status tile.
#[derive(Debug, Clone)]
pub struct StatusCountView {
    pub label: &'static str,
    pub class: &'static str,
    pub count: usize,
}

/// Recent order view for dashboard.
#[derive(Debug, Clone)]
pub struct RecentOrderView {
    pub id: String,
    pub reference: String,
    pub customer_name: String,
    pub total: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub placed: String,
}

impl From<&Order> for RecentOrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            reference: order.reference(),
            customer_name: order.customer.name.clone(),
            total: order.total.to_string(),
            status: order.status.label(),
            status_class: status_class(order.status),
            placed: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// CSS badge class for an order status.
#[must_use]
pub const fn status_class(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "badge badge-pending",
        OrderStatus::Confirmed => "badge badge-confirmed",
        OrderStatus::Delivered => "badge badge-delivered",
        OrderStatus::Cancelled => "badge badge-cancelled",
    }
}

/// Dashboard metrics, formatted.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub orders: usize,
    pub revenue: String,
    pub average_order_value: String,
    pub products: usize,
    pub out_of_stock: usize,
    pub low_stock: usize,
    pub customers: usize,
    pub admins: usize,
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    pub metrics: DashboardMetrics,
    pub statuses: Vec<StatusCountView>,
    pub recent_orders: Vec<RecentOrderView>,
}

fn role_count(stats: &DashboardStats, role: UserRole) -> usize {
    stats
        .users_by_role
        .iter()
        .find(|(r, _)| *r == role)
        .map_or(0, |(_, n)| *n)
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// Dashboard page handler.
#[instrument(skip_all, fields(uid = %admin.uid))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let stats = DashboardStats::load(state.db()).await?;

    let template = DashboardTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/".to_string(),
        flash: take_flash(&session).await,
        metrics: DashboardMetrics {
            orders: stats.order_count,
            revenue: stats.revenue.to_string(),
            average_order_value: stats.average_order_value.to_string(),
            products: stats.product_count,
            out_of_stock: stats.out_of_stock,
            low_stock: stats.low_stock,
            customers: role_count(&stats, UserRole::Customer),
            admins: role_count(&stats, UserRole::Admin),
        },
        statuses: stats
            .orders_by_status
            .iter()
            .map(|&(status, count)| StatusCountView {
                label: status.label(),
                class: status_class(status),
                count,
            })
            .collect(),
        recent_orders: stats.recent_orders.iter().map(RecentOrderView::from).collect(),
    };

    Ok(render(&template))
}
