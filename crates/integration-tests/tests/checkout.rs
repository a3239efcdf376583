//! Stock reservation under checkout, driven through the core sequencer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use shopfront_core::checkout::{CheckoutError, CheckoutRequest, CheckoutSequencer};
use shopfront_core::db::{Database, MemoryDatabase, OrderRepository};
use shopfront_core::models::{Cart, CustomerContact, PostalAddress, Product};
use shopfront_core::{Money, PaymentMethod, UserId};
use shopfront_integration_tests::{GatedDatabase, RacingDatabase, product, seed_products, stock_of};

fn request(uid: &str) -> CheckoutRequest {
    CheckoutRequest {
        user_id: UserId::new(uid),
        customer: CustomerContact {
            name: "Ann Buyer".to_owned(),
            email: "ann@example.com".to_owned(),
            phone: "555-0100".to_owned(),
        },
        address: PostalAddress {
            full_name: "Ann Buyer".to_owned(),
            line1: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            ..PostalAddress::default()
        },
        payment_method: PaymentMethod::default(),
    }
}

fn cart_of(lines: &[(&Product, u32)]) -> Cart {
    let mut cart = Cart::new();
    for (product, quantity) in lines {
        cart.add(product, product.discount, *quantity).unwrap();
    }
    cart
}

async fn order_count(db: &dyn Database) -> usize {
    OrderRepository::new(db).list_all().await.unwrap().len()
}

#[tokio::test]
async fn test_checkout_decrements_stock_and_records_total() {
    let db = MemoryDatabase::new();
    let p1 = product("p1", 1000, 5);
    seed_products(&db, std::slice::from_ref(&p1)).await;

    let order = CheckoutSequencer::new(&db)
        .place_order(&cart_of(&[(&p1, 2)]), request("u1"), Utc::now())
        .await
        .unwrap();

    assert_eq!(order.total, Money::new(2000));
    assert_eq!(stock_of(&db, "p1").await, 3);

    let stored = OrderRepository::new(&db).get(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.total, Money::new(2000));
    assert_eq!(stored.item_count(), 2);
    assert_eq!(stored.user_id.as_str(), "u1");
}

#[tokio::test]
async fn test_quantity_above_live_stock_creates_nothing() {
    let db = MemoryDatabase::new();
    // The cart was filled while stock was 10.
    let snapshot = product("p1", 1000, 10);
    let cart = cart_of(&[(&snapshot, 10)]);
    seed_products(&db, &[product("p1", 1000, 5)]).await;

    let err = CheckoutSequencer::new(&db)
        .place_order(&cart, request("u1"), Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock {
            available: 5,
            requested: 10,
            ..
        }
    ));
    assert_eq!(order_count(&db).await, 0);
    assert_eq!(stock_of(&db, "p1").await, 5);
}

#[tokio::test]
async fn test_concurrent_checkouts_for_the_last_units_admit_one() {
    let inner = MemoryDatabase::new();
    let p1 = product("p1", 1000, 5);
    seed_products(&inner, std::slice::from_ref(&p1)).await;
    let db = GatedDatabase::new(inner, 2);

    let cart_a = cart_of(&[(&p1, 3)]);
    let cart_b = cart_of(&[(&p1, 3)]);
    let sequencer = CheckoutSequencer::new(&db);

    let (a, b) = tokio::join!(
        sequencer.place_order(&cart_a, request("ua"), Utc::now()),
        sequencer.place_order(&cart_b, request("ub"), Utc::now()),
    );

    let outcomes = [a, b];
    let placed = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(CheckoutError::StockConflict { .. })))
        .count();

    assert_eq!(placed, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(stock_of(db.inner(), "p1").await, 2);
    assert_eq!(order_count(db.inner()).await, 1);
}

#[tokio::test]
async fn test_failure_on_a_later_line_gives_back_earlier_lines() {
    let inner = MemoryDatabase::new();
    let p1 = product("p1", 1000, 5);
    let p2 = product("p2", 500, 3);
    seed_products(&inner, &[p1.clone(), p2.clone()]).await;
    // Someone buys p2 down to 1 after the pre-check.
    let db = RacingDatabase::new(inner, "products/p2/stock", json!(1));

    let err = CheckoutSequencer::new(&db)
        .place_order(&cart_of(&[(&p1, 2), (&p2, 3)]), request("u1"), Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::StockConflict { ref product, .. } if product.as_str() == "p2"));
    assert_eq!(stock_of(db.inner(), "p1").await, 5);
    assert_eq!(stock_of(db.inner(), "p2").await, 1);
    assert_eq!(order_count(db.inner()).await, 0);
}

#[tokio::test]
async fn test_product_deleted_mid_checkout_leaves_no_order() {
    let inner = MemoryDatabase::new();
    let p1 = product("p1", 1000, 5);
    seed_products(&inner, std::slice::from_ref(&p1)).await;
    let db = RacingDatabase::new(inner, "products/p1/stock", serde_json::Value::Null);

    let err = CheckoutSequencer::new(&db)
        .place_order(&cart_of(&[(&p1, 1)]), request("u1"), Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::StockConflict { .. }));
    assert_eq!(order_count(db.inner()).await, 0);
}

#[tokio::test]
async fn test_stock_never_goes_negative_under_many_buyers() {
    let db = Arc::new(MemoryDatabase::new());
    let p1 = product("p1", 250, 5);
    seed_products(db.as_ref(), std::slice::from_ref(&p1)).await;

    let carts: Vec<Cart> = (0..8).map(|_| cart_of(&[(&p1, 1)])).collect();
    let sequencer = CheckoutSequencer::new(db.as_ref());
    let results = futures::future::join_all(
        carts
            .iter()
            .enumerate()
            .map(|(i, cart)| sequencer.place_order(cart, request(&format!("u{i}")), Utc::now())),
    )
    .await;

    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 5);
    assert_eq!(stock_of(db.as_ref(), "p1").await, 0);
    assert_eq!(order_count(db.as_ref()).await, 5);
}
