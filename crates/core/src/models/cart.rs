//! Shopping cart and its mutation rules.
//!
//! A cart maps product ids to lines carrying a price snapshot taken when the
//! product was first added. Guest carts live in the session; signed-in carts
//! are mirrored under `users/{uid}/cart` with the same JSON shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::product::Product;
use crate::types::{Money, Percent, ProductId};

/// Errors returned by cart mutations. A failed mutation leaves the cart as it was.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantities must be positive integers.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    /// The resulting quantity would exceed the stock seen when adding.
    #[error("only {available} of {name} in stock (requested {requested})")]
    ExceedsStock {
        name: String,
        requested: u32,
        available: u32,
    },
    /// The product has no stock at all.
    #[error("{0} is out of stock")]
    OutOfStock(String),
    /// The line does not exist.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
}

/// One product in the cart, with its price frozen at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Post-discount price per unit.
    pub unit_price: Money,
    pub original_price: Money,
    pub discount_percent: Percent,
    pub quantity: u32,
    /// Stock observed the last time this product was added.
    pub stock_ceiling: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartLine {
    /// Snapshot a product for the cart, taking `discount` percent off.
    #[must_use]
    pub fn snapshot(product: &Product, discount: Percent, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price.discounted(discount),
            original_price: product.price,
            discount_percent: discount,
            quantity,
            stock_ceiling: product.stock,
            image: product.image.clone(),
        }
    }

    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    #[must_use]
    pub const fn line_savings(&self) -> Money {
        self.original_price
            .saturating_sub(self.unit_price)
            .times(self.quantity)
    }

    fn check_ceiling(&self, requested: u32) -> Result<(), CartError> {
        if requested > self.stock_ceiling {
            return Err(CartError::ExceedsStock {
                name: self.name.clone(),
                requested,
                available: self.stock_ceiling,
            });
        }
        Ok(())
    }
}

/// A cart keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: BTreeMap<ProductId, CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of `product`, snapshotting its price with `discount` off.
    ///
    /// An existing line keeps its original price snapshot and has its
    /// quantity increased; its stock ceiling is refreshed from `product`.
    ///
    /// # Errors
    ///
    /// - [`CartError::ZeroQuantity`] when `quantity` is 0
    /// - [`CartError::OutOfStock`] when the product has no stock
    /// - [`CartError::ExceedsStock`] when the line would exceed `product.stock`
    pub fn add(
        &mut self,
        product: &Product,
        discount: Percent,
        quantity: u32,
    ) -> Result<&CartLine, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if product.stock == 0 {
            return Err(CartError::OutOfStock(product.name.clone()));
        }

        let fresh = CartLine::snapshot(product, discount, quantity);
        let current = self.quantity_of(&product.id);
        let requested = current.saturating_add(quantity);
        fresh.check_ceiling(requested)?;

        let line = self
            .lines
            .entry(product.id.clone())
            .and_modify(|line| {
                line.quantity = requested;
                line.stock_ceiling = product.stock;
            })
            .or_insert(fresh);
        Ok(line)
    }

    /// Raise a line's quantity by one, bounded by its stock ceiling.
    ///
    /// # Errors
    ///
    /// [`CartError::NotInCart`] or [`CartError::ExceedsStock`].
    pub fn increment(&mut self, product_id: &ProductId) -> Result<u32, CartError> {
        let line = self
            .lines
            .get_mut(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        let requested = line.quantity.saturating_add(1);
        line.check_ceiling(requested)?;
        line.quantity = requested;
        Ok(requested)
    }

    /// Lower a line's quantity by one; the line is removed when it reaches 0.
    ///
    /// Returns the remaining quantity.
    ///
    /// # Errors
    ///
    /// [`CartError::NotInCart`].
    pub fn decrement(&mut self, product_id: &ProductId) -> Result<u32, CartError> {
        let line = self
            .lines
            .get_mut(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        line.quantity = line.quantity.saturating_sub(1);
        let remaining = line.quantity;
        if remaining == 0 {
            self.lines.remove(product_id);
        }
        Ok(remaining)
    }

    /// Set a line's quantity; 0 removes the line.
    ///
    /// # Errors
    ///
    /// [`CartError::NotInCart`] or [`CartError::ExceedsStock`].
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(product_id).map(|_| ());
        }
        let line = self
            .lines
            .get_mut(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        line.check_ceiling(quantity)?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// [`CartError::NotInCart`].
    pub fn remove(&mut self, product_id: &ProductId) -> Result<CartLine, CartError> {
        self.lines
            .remove(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))
    }

    /// Fold a guest cart into this one (used on sign-in).
    ///
    /// Shared products sum their quantities, clamped to the larger of the two
    /// stock ceilings; the incoming line's price snapshot wins.
    pub fn merge(&mut self, incoming: Self) {
        for (id, mut line) in incoming.lines {
            if let Some(existing) = self.lines.get(&id) {
                let ceiling = existing.stock_ceiling.max(line.stock_ceiling);
                line.quantity = existing.quantity.saturating_add(line.quantity).min(ceiling);
                line.stock_ceiling = ceiling;
            }
            if line.quantity > 0 {
                self.lines.insert(id, line);
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in product-id order.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.get(product_id)
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines.get(product_id).map_or(0, |line| line.quantity)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .values()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.values().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn savings(&self) -> Money {
        self.lines.values().map(CartLine::line_savings).sum()
    }
}
