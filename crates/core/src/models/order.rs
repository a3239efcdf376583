//! Orders placed at checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::PostalAddress;
use super::cart::{Cart, CartLine};
use crate::types::{Money, OrderId, OrderStatus, PaymentMethod, Percent, ProductId, UserId};

/// Contact details captured on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// A frozen copy of a cart line at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub original_price: Money,
    #[serde(default)]
    pub discount_percent: Percent,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl OrderLine {
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            original_price: line.original_price,
            discount_percent: line.discount_percent,
            quantity: line.quantity,
            image: line.image.clone(),
        }
    }
}

/// An order as stored under `orders/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Push key assigned on insert.
    #[serde(default, skip_serializing_if = "OrderId::is_empty")]
    pub id: OrderId,
    pub user_id: UserId,
    pub customer: CustomerContact,
    pub address: PostalAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    pub total: Money,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build a pending order from a cart snapshot. The id is left empty until
    /// the record is inserted.
    #[must_use]
    pub fn from_cart(
        user_id: UserId,
        customer: CustomerContact,
        address: PostalAddress,
        payment_method: PaymentMethod,
        cart: &Cart,
        created_at: DateTime<Utc>,
    ) -> Self {
        let items: Vec<OrderLine> = cart.lines().map(OrderLine::from).collect();
        let total = items.iter().map(OrderLine::line_total).sum();
        Self {
            id: OrderId::default(),
            user_id,
            customer,
            address,
            payment_method,
            items,
            total,
            status: OrderStatus::Pending,
            created_at,
        }
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Short reference shown to customers.
    #[must_use]
    pub fn reference(&self) -> String {
        let id = self.id.as_str();
        let start = id.len().saturating_sub(8);
        id.get(start..).unwrap_or(id).to_uppercase()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::product::Product;

    fn product(id: &str, price: u64, discount: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_owned(),
            category: "misc".to_owned(),
            description: String::new(),
            price: Money::new(price),
            discount: Percent::new(discount).unwrap(),
            stock: 10,
            image: None,
            featured: false,
            is_new: false,
        }
    }

    #[test]
    fn test_from_cart_totals_snapshot_prices() {
        let mut cart = Cart::new();
        let p1 = product("p1", 1000, 0);
        let p2 = product("p2", 500, 10);
        cart.add(&p1, p1.discount, 2).unwrap();
        cart.add(&p2, p2.discount, 1).unwrap();

        let order = Order::from_cart(
            UserId::new("u1"),
            CustomerContact::default(),
            PostalAddress::default(),
            PaymentMethod::Card,
            &cart,
            Utc::now(),
        );
        assert_eq!(order.total, Money::new(2450));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_reference_is_short_suffix() {
        let mut order = Order::from_cart(
            UserId::new("u1"),
            CustomerContact::default(),
            PostalAddress::default(),
            PaymentMethod::default(),
            &Cart::new(),
            Utc::now(),
        );
        order.id = OrderId::new("-NzX81kqabcdefgh");
        assert_eq!(order.reference(), "ABCDEFGH");
        order.id = OrderId::new("o1");
        assert_eq!(order.reference(), "O1");
    }

    #[test]
    fn test_serializes_camel_case() {
        let order = Order::from_cart(
            UserId::new("u1"),
            CustomerContact::default(),
            PostalAddress::default(),
            PaymentMethod::CashOnDelivery,
            &Cart::new(),
            Utc::now(),
        );
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["paymentMethod"], "cashOnDelivery");
        assert_eq!(json["status"], "pending");
        assert!(json["createdAt"].is_string());
    }
}
