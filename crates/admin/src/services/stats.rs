//! Dashboard statistics.
//!
//! The database has no aggregate queries, so every figure comes from one
//! full read of orders, products and users.

use shopfront_core::db::{Database, OrderRepository, ProductRepository, RepositoryError, UserRepository};
use shopfront_core::models::{Order, Product, UserProfile};
use shopfront_core::{Money, OrderStatus, UserRole};

/// Orders listed on the dashboard.
pub const RECENT_ORDER_COUNT: usize = 5;

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub order_count: usize,
    /// Order count per status, in lifecycle order.
    pub orders_by_status: Vec<(OrderStatus, usize)>,
    /// Sum of totals of orders that are not cancelled.
    pub revenue: Money,
    /// Revenue divided by the number of revenue orders, rounded half up.
    pub average_order_value: Money,
    pub product_count: usize,
    pub out_of_stock: usize,
    pub low_stock: usize,
    pub user_count: usize,
    pub users_by_role: Vec<(UserRole, usize)>,
    /// Newest first.
    pub recent_orders: Vec<Order>,
}

impl DashboardStats {
    /// Compute the figures from full collections. `orders` must be newest
    /// first, as [`OrderRepository::list_all`] returns them.
    #[must_use]
    pub fn compute(orders: &[Order], products: &[Product], users: &[UserProfile]) -> Self {
        let orders_by_status = OrderStatus::ALL
            .iter()
            .map(|&status| (status, orders.iter().filter(|o| o.status == status).count()))
            .collect();

        let revenue_orders: Vec<&Order> = orders
            .iter()
            .filter(|o| o.status.counts_as_revenue())
            .collect();
        let revenue: Money = revenue_orders.iter().map(|o| o.total).sum();
        let average_order_value = match u64::try_from(revenue_orders.len()) {
            Ok(0) | Err(_) => Money::ZERO,
            Ok(n) => Money::new(revenue.units().saturating_add(n / 2) / n),
        };

        let users_by_role = UserRole::ALL
            .iter()
            .map(|&role| (role, users.iter().filter(|u| u.role == role).count()))
            .collect();

        Self {
            order_count: orders.len(),
            orders_by_status,
            revenue,
            average_order_value,
            product_count: products.len(),
            out_of_stock: products.iter().filter(|p| !p.in_stock()).count(),
            low_stock: products.iter().filter(|p| p.is_low_stock()).count(),
            user_count: users.len(),
            users_by_role,
            recent_orders: orders.iter().take(RECENT_ORDER_COUNT).cloned().collect(),
        }
    }

    /// Read everything and compute the figures.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any of the reads fail.
    pub async fn load(db: &dyn Database) -> Result<Self, RepositoryError> {
        let orders = OrderRepository::new(db);
        let products = ProductRepository::new(db);
        let users = UserRepository::new(db);
        let (orders, products, users) =
            tokio::try_join!(orders.list_all(), products.list(), users.list())?;
        Ok(Self::compute(&orders, &products, &users))
    }

    /// Count for one status.
    #[must_use]
    pub fn status_count(&self, status: OrderStatus) -> usize {
        self.orders_by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, n)| *n)
    }
}
