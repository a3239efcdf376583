//! Product repository, including the conditional stock updates used at
//! checkout.

use serde_json::{Value, json};

use super::{Database, DbError, RepositoryError, Transition, decode, decode_children, paths};
use crate::models::Product;
use crate::types::ProductId;

/// Outcome of a conditional stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    /// The change was applied; holds the new stock level.
    Applied(u32),
    /// Not enough stock; holds the level that was seen.
    Insufficient(u32),
    /// The product (or its stock field) no longer exists.
    Missing,
}

/// Repository for `products/*`.
pub struct ProductRepository<'a> {
    db: &'a dyn Database,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Every product, in key order. Malformed records are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let value = self.db.read(paths::PRODUCTS).await?;
        Ok(decode_children::<Product>(paths::PRODUCTS, value)
            .into_iter()
            .map(|(key, mut product)| {
                product.id = ProductId::new(key);
                product
            })
            .collect())
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the record is invalid.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let path = paths::product(id)?;
        let Some(value) = self.db.read(&path).await? else {
            return Ok(None);
        };
        let mut product: Product = decode(&path, value)?;
        product.id = id.clone();
        Ok(Some(product))
    }

    /// Insert a product under a fresh key and return it with its id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn create(&self, mut product: Product) -> Result<Product, RepositoryError> {
        product.id = ProductId::default();
        let key = self
            .db
            .push(paths::PRODUCTS, serde_json::to_value(&product).map_err(DbError::from)?)
            .await?;
        product.id = ProductId::new(key);
        Ok(product)
    }

    /// Write a product at its own id, replacing any existing record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails or the id is
    /// not a valid key.
    pub async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
        let path = paths::product(&product.id)?;
        let mut value = serde_json::to_value(product).map_err(DbError::from)?;
        if let Value::Object(map) = &mut value {
            map.remove("id");
        }
        self.db.write(&path, value).await?;
        Ok(())
    }

    /// Replace an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        if self.get(&product.id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.save(product).await
    }

    /// Delete a product. Carts and orders keep their snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError> {
        self.db.delete(&paths::product(id)?).await?;
        Ok(())
    }

    /// Atomically take `quantity` units from stock, never going below zero.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`DbError`].
    pub async fn take_stock(&self, id: &ProductId, quantity: u32) -> Result<StockChange, DbError> {
        self.change_stock(id, |stock| stock.checked_sub(quantity))
            .await
    }

    /// Atomically give back `quantity` units. A deleted product is left
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`DbError`].
    pub async fn restore_stock(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<StockChange, DbError> {
        self.change_stock(id, |stock| Some(stock.saturating_add(quantity)))
            .await
    }

    async fn change_stock<F>(&self, id: &ProductId, apply: F) -> Result<StockChange, DbError>
    where
        F: Fn(u32) -> Option<u32> + Send + Sync,
    {
        let path = paths::product_stock(id)?;
        let update = |current: Option<&Value>| {
            let Some(stock) = current.and_then(stock_of) else {
                return Transition::Abort;
            };
            apply(stock).map_or(Transition::Abort, |next| Transition::Commit(json!(next)))
        };
        let result = self.db.transaction(&path, &update).await?;

        let seen = result.value.as_ref().and_then(stock_of);
        Ok(match (result.committed, seen) {
            (true, Some(stock)) => StockChange::Applied(stock),
            (true, None) => StockChange::Applied(0),
            (false, Some(stock)) => StockChange::Insufficient(stock),
            (false, None) => StockChange::Missing,
        })
    }
}

/// Stock is stored as a JSON number; anything else counts as missing.
fn stock_of(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use crate::types::{Money, Percent};

    fn mug() -> Product {
        Product {
            id: ProductId::new("mug"),
            name: "Mug".to_owned(),
            category: "home".to_owned(),
            description: String::new(),
            price: Money::new(300),
            discount: Percent::ZERO,
            stock: 5,
            image: None,
            featured: false,
            is_new: false,
        }
    }

    #[tokio::test]
    async fn test_save_get_list() {
        let db = MemoryDatabase::new();
        let repo = ProductRepository::new(&db);
        repo.save(&mug()).await.unwrap();
        assert_eq!(repo.get(&ProductId::new("mug")).await.unwrap(), Some(mug()));
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert_eq!(db.read("products/mug/id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_assigns_key() {
        let db = MemoryDatabase::new();
        let repo = ProductRepository::new(&db);
        let created = repo.create(mug()).await.unwrap();
        assert_ne!(created.id.as_str(), "mug");
        assert_eq!(repo.get(&created.id).await.unwrap().unwrap().name, "Mug");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = MemoryDatabase::new();
        let repo = ProductRepository::new(&db);
        assert!(matches!(
            repo.update(&mug()).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_take_stock_never_negative() {
        let db = MemoryDatabase::new();
        let repo = ProductRepository::new(&db);
        repo.save(&mug()).await.unwrap();
        let id = ProductId::new("mug");

        assert_eq!(repo.take_stock(&id, 3).await.unwrap(), StockChange::Applied(2));
        assert_eq!(
            repo.take_stock(&id, 3).await.unwrap(),
            StockChange::Insufficient(2)
        );
        assert_eq!(repo.take_stock(&id, 2).await.unwrap(), StockChange::Applied(0));
        assert_eq!(repo.get(&id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_restore_skips_deleted_product() {
        let db = MemoryDatabase::new();
        let repo = ProductRepository::new(&db);
        let id = ProductId::new("mug");
        assert_eq!(repo.restore_stock(&id, 2).await.unwrap(), StockChange::Missing);
        assert_eq!(db.read("products").await.unwrap(), None);

        repo.save(&mug()).await.unwrap();
        assert_eq!(repo.restore_stock(&id, 2).await.unwrap(), StockChange::Applied(7));
    }
}
