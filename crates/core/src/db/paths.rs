//! Path builders for the database tree.
//!
//! Every dynamic segment is checked with [`validate_key`] so a crafted id can
//! never address a different subtree.

use super::DbError;
use crate::types::{AddressId, OrderId, ProductId, UserId, id::validate_key};

pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";
pub const USERS: &str = "users";
pub const PROMO_CODES: &str = "promoCodes";
pub const PING: &str = "meta/ping";

fn child(parent: &str, key: &str) -> Result<String, DbError> {
    validate_key(key).map_err(|e| DbError::InvalidPath {
        path: format!("{parent}/{key}"),
        reason: e.to_string(),
    })?;
    Ok(format!("{parent}/{key}"))
}

/// `products/{id}`
pub fn product(id: &ProductId) -> Result<String, DbError> {
    child(PRODUCTS, id.as_str())
}

/// `products/{id}/stock`
pub fn product_stock(id: &ProductId) -> Result<String, DbError> {
    Ok(format!("{}/stock", product(id)?))
}

/// `orders/{id}`
pub fn order(id: &OrderId) -> Result<String, DbError> {
    child(ORDERS, id.as_str())
}

/// `users/{uid}`
pub fn user(uid: &UserId) -> Result<String, DbError> {
    child(USERS, uid.as_str())
}

/// `users/{uid}/addresses`
pub fn addresses(uid: &UserId) -> Result<String, DbError> {
    Ok(format!("{}/addresses", user(uid)?))
}

/// `users/{uid}/addresses/{id}`
pub fn address(uid: &UserId, id: &AddressId) -> Result<String, DbError> {
    child(&addresses(uid)?, id.as_str())
}

/// `users/{uid}/cart`
pub fn cart(uid: &UserId) -> Result<String, DbError> {
    Ok(format!("{}/cart", user(uid)?))
}

/// `promoCodes/{CODE}`
pub fn promo_code(code: &str) -> Result<String, DbError> {
    child(PROMO_CODES, code)
}

/// Split a path into its segments, ignoring empty ones.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_nested_paths() {
        let uid = UserId::new("u1");
        assert_eq!(product_stock(&ProductId::new("p1")).unwrap(), "products/p1/stock");
        assert_eq!(
            address(&uid, &AddressId::new("a1")).unwrap(),
            "users/u1/addresses/a1"
        );
        assert_eq!(cart(&uid).unwrap(), "users/u1/cart");
        assert_eq!(promo_code("SAVE10").unwrap(), "promoCodes/SAVE10");
    }

    #[test]
    fn test_rejects_traversal() {
        assert!(matches!(
            product(&ProductId::new("../orders")),
            Err(DbError::InvalidPath { .. })
        ));
        assert!(user(&UserId::new("")).is_err());
    }

    #[test]
    fn test_segments_skip_empties() {
        assert_eq!(segments("/a//b/").collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(segments("").count(), 0);
    }
}
