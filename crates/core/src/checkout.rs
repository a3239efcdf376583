//! Checkout: turn a cart into a persisted order without overselling.
//!
//! The database has no multi-key transactions, so the sequence is:
//!
//! 1. Read every product and fail fast (no writes) when one is gone or short.
//! 2. Insert the order.
//! 3. Take stock line by line with the conditional update on
//!    `products/{id}/stock`, which never lets stock go below zero.
//! 4. If a line fails, give back the stock already taken by this checkout,
//!    delete the order and report the product that lost the race.
//!
//! The pre-check is advisory: a concurrent checkout can still win between
//! steps 1 and 3, which is what the compensation path handles.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use thiserror::Error;
use tracing::instrument;

use crate::db::products::StockChange;
use crate::db::{Database, DbError, OrderRepository, ProductRepository, RepositoryError};
use crate::models::{Cart, CustomerContact, Order, PostalAddress};
use crate::types::{PaymentMethod, ProductId, UserId};

/// Why a checkout did not produce an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("your cart is empty")]
    EmptyCart,

    /// A product in the cart has been removed from the catalog.
    #[error("{name} is no longer available")]
    ProductUnavailable { product: ProductId, name: String },

    /// Live stock is below the requested quantity.
    #[error("only {available} of {name} left (you asked for {requested})")]
    InsufficientStock {
        product: ProductId,
        name: String,
        available: u32,
        requested: u32,
    },

    /// Another checkout took the stock between the pre-check and the
    /// decrement. The order has been removed.
    #[error("stock for {name} changed while you were checking out")]
    StockConflict { product: ProductId, name: String },

    /// The database failed. Any order created has been removed where possible.
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),
}

impl From<DbError> for CheckoutError {
    fn from(err: DbError) -> Self {
        Self::Store(RepositoryError::Database(err))
    }
}

impl CheckoutError {
    /// The product the failure is about, if any.
    #[must_use]
    pub const fn product(&self) -> Option<&ProductId> {
        match self {
            Self::ProductUnavailable { product, .. }
            | Self::InsufficientStock { product, .. }
            | Self::StockConflict { product, .. } => Some(product),
            Self::EmptyCart | Self::Store(_) => None,
        }
    }
}

/// Everything needed to place an order besides the cart.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub customer: CustomerContact,
    pub address: PostalAddress,
    pub payment_method: PaymentMethod,
}

/// Runs the checkout sequence against a [`Database`].
pub struct CheckoutSequencer<'a> {
    products: ProductRepository<'a>,
    orders: OrderRepository<'a>,
}

impl<'a> CheckoutSequencer<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self {
            products: ProductRepository::new(db),
            orders: OrderRepository::new(db),
        }
    }

    /// Place an order for `cart`. On success the returned order carries its
    /// new id; the caller clears the cart and sends notifications.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]. On every error no order record remains, unless
    /// deleting it failed too (logged).
    #[instrument(skip(self, cart, request), fields(user_id = %request.user_id, lines = cart.lines().count()))]
    pub async fn place_order(
        &self,
        cart: &Cart,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.pre_check(cart).await?;

        let mut order = Order::from_cart(
            request.user_id,
            request.customer,
            request.address,
            request.payment_method,
            cart,
            now,
        );
        order.id = self.orders.create(&order).await?;
        tracing::info!(order_id = %order.id, total = order.total.units(), "Order created, reserving stock");

        if let Err(err) = self.reserve_stock(cart).await {
            self.discard_order(&order).await;
            return Err(err);
        }

        tracing::info!(order_id = %order.id, "Checkout complete");
        Ok(order)
    }

    /// Read every product concurrently and check stock.
    async fn pre_check(&self, cart: &Cart) -> Result<(), CheckoutError> {
        let lines: Vec<_> = cart.lines().collect();
        let products = try_join_all(lines.iter().map(|line| self.products.get(&line.product_id))).await?;

        for (line, product) in lines.into_iter().zip(products) {
            let Some(product) = product else {
                return Err(CheckoutError::ProductUnavailable {
                    product: line.product_id.clone(),
                    name: line.name.clone(),
                });
            };
            if product.stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product: line.product_id.clone(),
                    name: line.name.clone(),
                    available: product.stock,
                    requested: line.quantity,
                });
            }
        }
        Ok(())
    }

    /// Take stock for each line in order. On the first failure, give back
    /// what this call already took.
    async fn reserve_stock(&self, cart: &Cart) -> Result<(), CheckoutError> {
        let mut taken: Vec<(&ProductId, u32)> = Vec::new();

        for line in cart.lines() {
            let failure = match self.products.take_stock(&line.product_id, line.quantity).await {
                Ok(StockChange::Applied(remaining)) => {
                    tracing::debug!(product_id = %line.product_id, quantity = line.quantity, remaining, "Stock reserved");
                    taken.push((&line.product_id, line.quantity));
                    continue;
                }
                Ok(StockChange::Insufficient(seen)) => {
                    tracing::warn!(product_id = %line.product_id, requested = line.quantity, seen, "Stock changed concurrently");
                    CheckoutError::StockConflict {
                        product: line.product_id.clone(),
                        name: line.name.clone(),
                    }
                }
                Ok(StockChange::Missing) => {
                    tracing::warn!(product_id = %line.product_id, "Product removed during checkout");
                    CheckoutError::StockConflict {
                        product: line.product_id.clone(),
                        name: line.name.clone(),
                    }
                }
                Err(err) => {
                    tracing::error!(product_id = %line.product_id, error = %err, "Stock update failed");
                    CheckoutError::from(err)
                }
            };

            self.give_back(&taken).await;
            return Err(failure);
        }
        Ok(())
    }

    async fn give_back(&self, taken: &[(&ProductId, u32)]) {
        for &(product_id, quantity) in taken.iter().rev() {
            match self.products.restore_stock(product_id, quantity).await {
                Ok(StockChange::Applied(stock)) => {
                    tracing::info!(%product_id, quantity, stock, "Stock restored");
                }
                Ok(StockChange::Missing | StockChange::Insufficient(_)) => {
                    tracing::warn!(%product_id, quantity, "Product deleted before stock could be restored");
                }
                Err(err) => {
                    tracing::error!(%product_id, quantity, error = %err, "Failed to restore stock");
                }
            }
        }
    }

    async fn discard_order(&self, order: &Order) {
        if let Err(err) = self.orders.delete(&order.id).await {
            tracing::error!(order_id = %order.id, error = %err, "Failed to delete order after checkout failure");
        } else {
            tracing::info!(order_id = %order.id, "Order removed after checkout failure");
        }
    }
}
