//! Cached read-only view of the product collection.
//!
//! Browse pages read the whole `products` collection and filter in process,
//! so the list is cached for a short TTL. Cart and checkout always read live
//! product records instead.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use shopfront_core::ProductId;
use shopfront_core::db::{Database, ProductRepository, RepositoryError};
use shopfront_core::models::Product;

const PRODUCTS_KEY: &str = "products";

/// Product list cache.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<&'static str, Arc<Vec<Product>>>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { cache }
    }

    /// All products, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the repository error when the collection has to be read and
    /// the read fails.
    #[instrument(skip_all)]
    pub async fn products(&self, db: &dyn Database) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.cache.get(PRODUCTS_KEY).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(db).list().await?);
        self.cache.insert(PRODUCTS_KEY, Arc::clone(&products)).await;
        debug!(count = products.len(), "Product list cached");
        Ok(products)
    }

    /// One product from the cached list.
    ///
    /// # Errors
    ///
    /// See [`Self::products`].
    pub async fn product(
        &self,
        db: &dyn Database,
        id: &ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let products = self.products(db).await?;
        Ok(products.iter().find(|p| &p.id == id).cloned())
    }

    /// Drop the cached list so the next read goes to the database.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::db::MemoryDatabase;
    use shopfront_core::{Money, Percent};

    use super::*;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_owned(),
            category: "misc".to_owned(),
            description: String::new(),
            price: Money::new(100),
            discount: Percent::ZERO,
            stock: 1,
            image: None,
            featured: false,
            is_new: false,
        }
    }

    #[tokio::test]
    async fn test_serves_from_cache_until_invalidated() {
        let db = MemoryDatabase::new();
        let repo = ProductRepository::new(&db);
        repo.save(&product("a")).await.unwrap();

        let cache = CatalogCache::new(Duration::from_secs(60));
        assert_eq!(cache.products(&db).await.unwrap().len(), 1);

        repo.save(&product("b")).await.unwrap();
        assert_eq!(cache.products(&db).await.unwrap().len(), 1);
        assert!(cache.product(&db, &ProductId::new("b")).await.unwrap().is_none());

        cache.invalidate().await;
        assert_eq!(cache.products(&db).await.unwrap().len(), 2);
    }
}
