//! Catalog products.

use serde::{Deserialize, Serialize};

use crate::types::{Money, Percent, ProductId};

/// Stock level below which the back-office flags a product as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// A product as stored under `products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Database key, filled in from the path on read.
    #[serde(default, skip_serializing_if = "ProductId::is_empty")]
    pub id: ProductId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// List price in whole currency units.
    pub price: Money,
    /// Percent taken off the list price.
    #[serde(default)]
    pub discount: Percent,
    #[serde(default)]
    pub stock: u32,
    /// Reference into the image host; never fetched by the server.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub is_new: bool,
}

impl Product {
    /// Price a shopper pays today.
    #[must_use]
    pub const fn effective_price(&self) -> Money {
        self.price.discounted(self.discount)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock < LOW_STOCK_THRESHOLD
    }
}

/// Errors raised when validating product input from the back-office.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("product category is required")]
    MissingCategory,
    #[error("{0}")]
    Discount(#[from] crate::types::PercentError),
}

/// Unvalidated product fields as submitted by an admin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    #[serde(default)]
    pub discount: u32,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub is_new: bool,
}

impl ProductDraft {
    /// Validate the draft into a product stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] when the name or category is blank or the
    /// discount is above 100.
    pub fn into_product(self, id: ProductId) -> Result<Product, ProductError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ProductError::MissingName);
        }
        let category = self.category.trim().to_owned();
        if category.is_empty() {
            return Err(ProductError::MissingCategory);
        }

        Ok(Product {
            id,
            name,
            category,
            description: self.description.trim().to_owned(),
            price: Money::new(self.price),
            discount: Percent::new(self.discount)?,
            stock: self.stock,
            image: self
                .image
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
            featured: self.featured,
            is_new: self.is_new,
        })
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            price: product.price.units(),
            discount: u32::from(product.discount),
            stock: product.stock,
            image: product.image.clone(),
            featured: product.featured,
            is_new: product.is_new,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: " Linen Shirt ".to_owned(),
            category: "apparel".to_owned(),
            price: 2000,
            discount: 25,
            stock: 3,
            image: Some("  ".to_owned()),
            ..ProductDraft::default()
        }
    }

    #[test]
    fn test_draft_into_product_trims_and_prices() {
        let product = draft().into_product(ProductId::new("p1")).unwrap();
        assert_eq!(product.name, "Linen Shirt");
        assert_eq!(product.effective_price(), Money::new(1500));
        assert_eq!(product.image, None);
        assert!(product.is_low_stock());
    }

    #[test]
    fn test_draft_validation() {
        let mut bad = draft();
        bad.name = "   ".to_owned();
        assert_eq!(
            bad.into_product(ProductId::new("p1")),
            Err(ProductError::MissingName)
        );

        let mut bad = draft();
        bad.discount = 120;
        assert!(matches!(
            bad.into_product(ProductId::new("p1")),
            Err(ProductError::Discount(_))
        ));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"name":"Mug","category":"home","price":450,"isNew":true}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.stock, 0);
        assert!(product.is_new);
        assert!(!product.in_stock());
        assert_eq!(product.effective_price(), Money::new(450));
    }
}
