//! Admin panel over HTTP: role gating and the back-office actions.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use chrono::Utc;
use reqwest::StatusCode;

use shopfront_core::db::{OrderRepository, ProductRepository, PromoRepository, UserRepository};
use shopfront_core::models::{Cart, CustomerContact, Order, PostalAddress};
use shopfront_core::{OrderStatus, PaymentMethod, UserId, UserRole};
use shopfront_integration_tests::{Admin, create_account, location, product, seed_products, stock_of};

#[tokio::test]
async fn test_signed_out_requests_go_to_login() {
    let admin = Admin::start().await;

    for path in ["/", "/orders", "/products", "/users", "/promos"] {
        let response = admin.get(path).await;
        assert!(response.status().is_redirection(), "{path}");
        assert_eq!(location(&response), "/auth/login", "{path}");
    }

    let health = admin.get("/health").await;
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_customer_accounts_are_refused() {
    let admin = Admin::start().await;

    let (_, response) = admin.sign_in_as("ann@example.com", UserRole::Customer).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("does not have admin access"));

    let dashboard = admin.get("/").await;
    assert_eq!(location(&dashboard), "/auth/login");
}

#[tokio::test]
async fn test_admin_sees_dashboard() {
    let admin = Admin::start().await;
    seed_products(admin.db.as_ref(), &[product("p1", 1000, 2), product("p2", 300, 0)]).await;

    let (_, response) = admin.sign_in_as("boss@example.com", UserRole::Admin).await;
    assert_eq!(location(&response), "/");

    let dashboard = admin.get("/").await;
    assert_eq!(dashboard.status(), StatusCode::OK);

    for path in ["/orders", "/products", "/users", "/promos", "/products/new"] {
        assert_eq!(admin.get(path).await.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn test_demoted_admin_loses_access_on_next_request() {
    let admin = Admin::start().await;
    let (uid, _) = admin.sign_in_as("boss@example.com", UserRole::Admin).await;
    assert_eq!(admin.get("/").await.status(), StatusCode::OK);

    UserRepository::new(admin.db.as_ref())
        .set_role(&uid, UserRole::Customer)
        .await
        .unwrap();

    let response = admin.get("/").await;
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_order_status_update() {
    let admin = Admin::start().await;
    let p1 = product("p1", 1000, 5);
    let mut cart = Cart::new();
    cart.add(&p1, p1.discount, 2).unwrap();
    let order = Order::from_cart(
        UserId::new("u1"),
        CustomerContact {
            name: "Ann".to_owned(),
            email: "ann@example.com".to_owned(),
            phone: String::new(),
        },
        PostalAddress::default(),
        PaymentMethod::default(),
        &cart,
        Utc::now(),
    );
    let orders = OrderRepository::new(admin.db.as_ref());
    let id = orders.create(&order).await.unwrap();
    admin.sign_in_as("boss@example.com", UserRole::Admin).await;

    let show = admin.get(&format!("/orders/{id}")).await;
    assert_eq!(show.status(), StatusCode::OK);

    let response = admin
        .post_form(
            &format!("/orders/{id}/status"),
            &[("status", OrderStatus::Delivered.as_str())],
        )
        .await;
    assert_eq!(location(&response), format!("/orders/{id}"));
    let stored = orders.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);

    admin.post_form(&format!("/orders/{id}/delete"), &[]).await;
    assert!(orders.get(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_product_create_and_delete() {
    let admin = Admin::start().await;
    admin.sign_in_as("boss@example.com", UserRole::Admin).await;

    let response = admin
        .post_form(
            "/products",
            &[
                ("name", "Cast Iron Pan"),
                ("category", "kitchen"),
                ("price", "45"),
                ("discount", "10"),
                ("stock", "7"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/products");

    let products = ProductRepository::new(admin.db.as_ref());
    let listed = products.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Cast Iron Pan");
    assert_eq!(listed[0].stock, 7);

    let id = listed[0].id.clone();
    admin.post_form(&format!("/products/{id}/delete"), &[]).await;
    assert_eq!(stock_of(admin.db.as_ref(), id.as_str()).await, 0);
    assert!(products.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_product_form_is_not_saved() {
    let admin = Admin::start().await;
    admin.sign_in_as("boss@example.com", UserRole::Admin).await;

    let response = admin
        .post_form("/products", &[("name", "Pan"), ("category", "kitchen"), ("price", "abc")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(ProductRepository::new(admin.db.as_ref()).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_promo_lifecycle() {
    let admin = Admin::start().await;
    admin.sign_in_as("boss@example.com", UserRole::Admin).await;

    let form = [
        ("code", "summer10"),
        ("discount_percent", "10"),
        ("applicable_products", "all"),
        ("expiry_date", "2099-12-31"),
    ];
    admin.post_form("/promos", &form).await;

    let promos = PromoRepository::new(admin.db.as_ref());
    let created = promos.find("SUMMER10").await.unwrap().expect("promo stored");
    assert!(created.active);

    admin.post_form("/promos/SUMMER10/toggle", &[]).await;
    assert!(!promos.find("SUMMER10").await.unwrap().unwrap().active);

    admin.post_form("/promos/SUMMER10/delete", &[]).await;
    assert!(promos.find("SUMMER10").await.unwrap().is_none());
}

#[tokio::test]
async fn test_role_change_and_self_protection() {
    let admin = Admin::start().await;
    let (me, _) = admin.sign_in_as("boss@example.com", UserRole::Admin).await;
    let other = create_account(
        admin.db.as_ref(),
        &admin.identity,
        "ann@example.com",
        "Ann",
        UserRole::Customer,
    )
    .await;

    admin
        .post_form(&format!("/users/{other}/role"), &[("role", "admin")])
        .await;
    let users = UserRepository::new(admin.db.as_ref());
    assert_eq!(users.get(&other).await.unwrap().unwrap().role, UserRole::Admin);

    let response = admin
        .post_form(&format!("/users/{me}/role"), &[("role", "customer")])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(users.get(&me).await.unwrap().unwrap().role, UserRole::Admin);
}
