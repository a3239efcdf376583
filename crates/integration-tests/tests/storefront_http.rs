//! Storefront flows over HTTP: sign-up, cart, checkout and order emails.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use std::sync::Arc;

use shopfront_core::db::{
    MemoryDatabase, OrderRepository, ProductRepository, PromoRepository, UserRepository,
};
use shopfront_core::models::{ProductScope, PromoCode};
use shopfront_core::{ProductId, UserRole};
use shopfront_integration_tests::{
    FailingWrites, SHOP_INBOX, Storefront, create_account, location, product, seed_products,
    stock_of,
};

const ADDRESS: [(&str, &str); 3] = [
    ("full_name", "Ann Buyer"),
    ("line1", "1 Main St"),
    ("city", "Springfield"),
];

async fn checkout(shop: &Storefront) -> reqwest::Response {
    shop.post_form("/checkout", &ADDRESS).await
}

#[tokio::test]
async fn test_health_endpoints() {
    let shop = Storefront::start().await;

    let live = shop.client.get(shop.url("/health")).send().await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(live.text().await.unwrap(), "ok");

    let ready = shop.client.get(shop.url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_pages_render() {
    let shop = Storefront::start().await;
    seed_products(shop.db.as_ref(), &[product("p1", 1000, 5)]).await;

    let home = shop.client.get(shop.url("/")).send().await.unwrap();
    assert_eq!(home.status(), StatusCode::OK);

    let detail = shop.client.get(shop.url("/products/p1")).send().await.unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    assert!(detail.text().await.unwrap().contains("Product p1"));
}

#[tokio::test]
async fn test_checkout_requires_sign_in() {
    let shop = Storefront::start().await;

    let response = shop.client.get(shop.url("/checkout")).send().await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login?next=%2Fcheckout");

    let orders = shop.client.get(shop.url("/account/orders?page=2")).send().await.unwrap();
    assert_eq!(
        location(&orders),
        "/auth/login?next=%2Faccount%2Forders%3Fpage%3D2"
    );
}

#[tokio::test]
async fn test_notification_endpoint_answers_json_when_signed_out() {
    let shop = Storefront::start().await;

    let response = shop
        .client
        .post(shop.url("/send-order-confirmation"))
        .json(&json!({ "id": "anything" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_malformed_notification_body_answers_json() {
    let shop = Storefront::start().await;
    shop.register("Ann Buyer", "ann@example.com").await;

    let response = shop
        .client
        .post(shop.url("/send-order-confirmation"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"orderId\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_sign_up_cart_and_checkout() {
    let shop = Storefront::start().await;
    seed_products(shop.db.as_ref(), &[product("p1", 1000, 5)]).await;

    let registered = shop.register("Ann Buyer", "ann@example.com").await;
    assert!(registered.status().is_redirection());
    assert_eq!(location(&registered), "/account");

    let added = shop
        .post_form("/cart/add", &[("product_id", "p1"), ("quantity", "2")])
        .await;
    assert!(added.status().is_redirection());

    let placed = checkout(&shop).await;
    assert!(placed.status().is_redirection());
    let target = location(&placed);
    let order_id = target
        .strip_prefix("/checkout/complete/")
        .expect("redirect to the completion page")
        .to_owned();

    assert_eq!(stock_of(shop.db.as_ref(), "p1").await, 3);
    let orders = OrderRepository::new(shop.db.as_ref()).list_all().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id.as_str(), order_id);
    assert_eq!(orders[0].total.units(), 2000);
    assert_eq!(orders[0].customer.email, "ann@example.com");

    let complete = shop.client.get(shop.url(&target)).send().await.unwrap();
    assert_eq!(complete.status(), StatusCode::OK);

    // Confirmation to the buyer and a notice to the shop.
    let sent = shop.wait_for_mail(2).await;
    assert!(sent.iter().any(|m| m.to == ["ann@example.com"]));
    assert!(sent.iter().any(|m| m.to == [SHOP_INBOX]));

    // The cart is emptied, so a second checkout bounces back to it.
    let again = checkout(&shop).await;
    assert_eq!(location(&again), "/cart");
    assert_eq!(stock_of(shop.db.as_ref(), "p1").await, 3);
}

#[tokio::test]
async fn test_checkout_above_stock_places_nothing() {
    let shop = Storefront::start().await;
    seed_products(shop.db.as_ref(), &[product("p1", 1000, 5)]).await;
    shop.register("Ann Buyer", "ann@example.com").await;

    shop.post_form("/cart/add", &[("product_id", "p1"), ("quantity", "5")])
        .await;
    // Another shopper takes most of it.
    ProductRepository::new(shop.db.as_ref())
        .take_stock(&ProductId::new("p1"), 4)
        .await
        .unwrap();

    let placed = checkout(&shop).await;

    assert_eq!(location(&placed), "/cart");
    assert_eq!(stock_of(shop.db.as_ref(), "p1").await, 1);
    let orders = OrderRepository::new(shop.db.as_ref()).list_all().await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_order_stands_when_saved_cart_cannot_be_cleared() {
    let memory = Arc::new(MemoryDatabase::new());
    let backend = Arc::new(FailingWrites::new(memory.clone(), "/cart"));
    let shop = Storefront::start_on(backend.clone(), memory).await;
    seed_products(shop.db.as_ref(), &[product("p1", 1000, 5)]).await;
    let uid = create_account(
        shop.db.as_ref(),
        &shop.identity,
        "ann@example.com",
        "Ann Buyer",
        UserRole::Customer,
    )
    .await;
    shop.sign_in("ann@example.com").await;
    shop.post_form("/cart/add", &[("product_id", "p1"), ("quantity", "2")])
        .await;

    backend.start_failing();
    let placed = checkout(&shop).await;

    assert!(location(&placed).starts_with("/checkout/complete/"));
    assert_eq!(stock_of(shop.db.as_ref(), "p1").await, 3);
    let orders = OrderRepository::new(shop.db.as_ref()).list_all().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(shop.wait_for_mail(2).await.len(), 2);

    // The session cart is gone even though the saved copy is stale.
    let again = checkout(&shop).await;
    assert_eq!(location(&again), "/cart");
    let saved = UserRepository::new(shop.db.as_ref()).cart(&uid).await.unwrap();
    assert_eq!(saved.item_count(), 2);
}

#[tokio::test]
async fn test_address_is_saved_only_with_a_placed_order() {
    let shop = Storefront::start().await;
    seed_products(shop.db.as_ref(), &[product("p1", 1000, 5)]).await;
    let uid = create_account(
        shop.db.as_ref(),
        &shop.identity,
        "ann@example.com",
        "Ann Buyer",
        UserRole::Customer,
    )
    .await;
    shop.sign_in("ann@example.com").await;
    shop.post_form("/cart/add", &[("product_id", "p1"), ("quantity", "5")])
        .await;
    let products = ProductRepository::new(shop.db.as_ref());
    products.take_stock(&ProductId::new("p1"), 4).await.unwrap();

    let mut form = ADDRESS.to_vec();
    form.push(("save_address", "on"));
    let rejected = shop.post_form("/checkout", &form).await;

    assert_eq!(location(&rejected), "/cart");
    let users = UserRepository::new(shop.db.as_ref());
    assert!(users.addresses(&uid).await.unwrap().is_empty());

    products.save(&product("p1", 1000, 5)).await.unwrap();
    let placed = shop.post_form("/checkout", &form).await;

    assert!(location(&placed).starts_with("/checkout/complete/"));
    let book = users.addresses(&uid).await.unwrap();
    assert_eq!(book.len(), 1);
    assert!(book.iter().any(|(_, saved)| saved.address.line1 == "1 Main St"));
}

#[tokio::test]
async fn test_promo_on_a_line_already_in_cart_is_reported() {
    let shop = Storefront::start().await;
    seed_products(shop.db.as_ref(), &[product("p1", 1000, 5)]).await;
    let expiry = chrono::NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
    let promo = PromoCode::new("summer10", 10, ProductScope::All, expiry).unwrap();
    PromoRepository::new(shop.db.as_ref()).create(&promo).await.unwrap();
    let uid = create_account(
        shop.db.as_ref(),
        &shop.identity,
        "ann@example.com",
        "Ann Buyer",
        UserRole::Customer,
    )
    .await;
    shop.sign_in("ann@example.com").await;

    shop.post_form("/cart/add", &[("product_id", "p1")]).await;
    shop.post_form(
        "/cart/add",
        &[("product_id", "p1"), ("promo_code", "SUMMER10")],
    )
    .await;

    let cart = UserRepository::new(shop.db.as_ref()).cart(&uid).await.unwrap();
    let line = cart.line(&ProductId::new("p1")).unwrap();
    assert_eq!(line.quantity, 2);
    assert_eq!(line.unit_price.units(), 1000);

    let page = shop.client.get(shop.url("/cart")).send().await.unwrap();
    let body = page.text().await.unwrap();
    assert!(body.contains("SUMMER10 only applies when a product is first added"));
}

#[tokio::test]
async fn test_order_emails_only_for_the_owner() {
    let shop = Storefront::start().await;
    seed_products(shop.db.as_ref(), &[product("p1", 1000, 5)]).await;
    shop.register("Ann Buyer", "ann@example.com").await;
    shop.post_form("/cart/add", &[("product_id", "p1")]).await;
    let placed = checkout(&shop).await;
    let order_id = location(&placed).trim_start_matches("/checkout/complete/").to_owned();
    shop.wait_for_mail(2).await;

    let resent = shop
        .client
        .post(shop.url("/send-order-confirmation"))
        .json(&json!({ "orderId": order_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resent.status(), StatusCode::OK);
    assert_eq!(shop.wait_for_mail(3).await.len(), 3);

    // A different customer cannot see the order.
    create_account(
        shop.db.as_ref(),
        &shop.identity,
        "bob@example.com",
        "Bob",
        UserRole::Customer,
    )
    .await;
    let bob = Storefront {
        base_url: shop.base_url.clone(),
        client: shopfront_integration_tests::client(),
        db: shop.db.clone(),
        identity: shop.identity.clone(),
        mailer: shop.mailer.clone(),
    };
    bob.sign_in("bob@example.com").await;

    let denied = bob
        .client
        .post(bob.url("/send-admin-notification"))
        .json(&json!({ "id": order_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_password_stays_signed_out() {
    let shop = Storefront::start().await;
    shop.register("Ann Buyer", "ann@example.com").await;
    shop.post_form("/auth/logout", &[]).await;

    let response = shop
        .post_form(
            "/auth/login",
            &[("email", "ann@example.com"), ("password", "not-the-password")],
        )
        .await;
    assert!(location(&response).starts_with("/auth/login"));

    let account = shop.client.get(shop.url("/account")).send().await.unwrap();
    assert!(location(&account).starts_with("/auth/login"));
}
