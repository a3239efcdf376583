//! Order repository.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::{Database, DbError, RepositoryError, decode, decode_children, paths};
use crate::models::Order;
use crate::types::{OrderId, OrderStatus, UserId};

/// Repository for `orders/*`.
pub struct OrderRepository<'a> {
    db: &'a dyn Database,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Insert an order under a fresh push key and return the key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn create(&self, order: &Order) -> Result<OrderId, RepositoryError> {
        let mut value = serde_json::to_value(order).map_err(DbError::from)?;
        if let Value::Object(map) = &mut value {
            map.remove("id");
        }
        let key = self.db.push(paths::ORDERS, value).await?;
        Ok(OrderId::new(key))
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the record is invalid.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let path = paths::order(id)?;
        let Some(value) = self.db.read(&path).await? else {
            return Ok(None);
        };
        let mut order: Order = decode(&path, value)?;
        order.id = id.clone();
        Ok(Some(order))
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let value = self.db.read(paths::ORDERS).await?;
        let mut orders: Vec<Order> = decode_children::<Order>(paths::ORDERS, value)
            .into_iter()
            .map(|(key, mut order)| {
                order.id = OrderId::new(key);
                order
            })
            .collect();
        orders.sort_by_key(|o| Reverse(o.created_at));
        Ok(orders)
    }

    /// Orders placed by one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    pub async fn list_for_user(&self, uid: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.list_all().await?;
        orders.retain(|o| &o.user_id == uid);
        Ok(orders)
    }

    /// Change an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), RepositoryError> {
        let path = paths::order(id)?;
        if self.db.read(&path).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        let mut updates = BTreeMap::new();
        updates.insert("status".to_owned(), json!(status));
        self.db.patch(&path, updates).await?;
        Ok(())
    }

    /// Delete an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: &OrderId) -> Result<(), RepositoryError> {
        self.db.delete(&paths::order(id)?).await?;
        Ok(())
    }
}
