//! End-to-end tests for Shopfront.
//!
//! Both applications run in-process on ephemeral ports, wired to the
//! in-memory database, identity provider and mail transport. Tests drive
//! them over HTTP with a cookie-keeping client, then inspect the backends
//! directly.
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::Barrier;
use url::Url;

use shopfront_admin::config::AdminConfig;
use shopfront_core::auth::{IdentityProvider, MemoryIdentity};
use shopfront_core::db::{
    Database, DbError, MemoryDatabase, ProductRepository, TransactionResult, UpdateFn,
    UserRepository,
};
use shopfront_core::models::{Product, UserProfile};
use shopfront_core::{Email, Money, Percent, ProductId, UserId, UserRole};
use shopfront_storefront::config::{DatabaseConfig, IdentityConfig, MailConfig, StorefrontConfig};
use shopfront_storefront::services::RecordingMailer;

/// Address new-order notifications go to.
pub const SHOP_INBOX: &str = "orders@shop.test";

/// Password used for every test account.
pub const PASSWORD: &str = "correct-horse";

fn local_url() -> Url {
    Url::parse("http://127.0.0.1/").expect("static url")
}

/// Storefront settings pointing nowhere; the backends are injected.
#[must_use]
pub fn storefront_config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1:3000".to_owned(),
        database: DatabaseConfig {
            url: local_url(),
            secret: SecretString::from("unused"),
        },
        identity: IdentityConfig {
            api_url: local_url(),
            api_key: SecretString::from("unused"),
        },
        mail: MailConfig {
            api_url: local_url(),
            api_key: SecretString::from("unused"),
            from: "Shopfront <orders@shop.test>".to_owned(),
            admin_email: Some(Email::parse(SHOP_INBOX).expect("valid email")),
        },
        catalog_cache_ttl: Duration::from_secs(1),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Admin settings pointing nowhere; the backends are injected.
#[must_use]
pub fn admin_config() -> AdminConfig {
    AdminConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1:3001".to_owned(),
        database_url: local_url(),
        database_secret: SecretString::from("unused"),
        identity_api_url: local_url(),
        identity_api_key: SecretString::from("unused"),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A catalog product with no discount.
#[must_use]
pub fn product(id: &str, price: u64, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        category: "kitchen".to_owned(),
        description: String::new(),
        price: Money::new(price),
        discount: Percent::ZERO,
        stock,
        image: None,
        featured: false,
        is_new: false,
    }
}

/// Store products under their own ids.
pub async fn seed_products(db: &dyn Database, products: &[Product]) {
    let repo = ProductRepository::new(db);
    for product in products {
        repo.save(product).await.expect("seed product");
    }
}

/// Current stock of a product, 0 when it is gone.
pub async fn stock_of(db: &dyn Database, id: &str) -> u32 {
    ProductRepository::new(db)
        .get(&ProductId::new(id))
        .await
        .expect("read product")
        .map_or(0, |p| p.stock)
}

/// Create an identity account and its profile with the given role.
pub async fn create_account(
    db: &dyn Database,
    identity: &MemoryIdentity,
    email: &str,
    name: &str,
    role: UserRole,
) -> UserId {
    let email = Email::parse(email).expect("valid email");
    let signed_in = identity
        .register(&email, PASSWORD, Some(name))
        .await
        .expect("register account");
    let uid = signed_in.identity.uid;

    let users = UserRepository::new(db);
    let profile = UserProfile::customer(
        uid.clone(),
        name.to_owned(),
        email.to_string(),
        chrono::Utc::now(),
    );
    users.ensure(&profile).await.expect("create profile");
    if role != UserRole::Customer {
        users.set_role(&uid, role).await.expect("set role");
    }
    uid
}

/// HTTP client that keeps cookies and does not follow redirects.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("build HTTP client")
}

/// Serve a router on an ephemeral local port and return its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}

/// A running storefront and the backends behind it.
pub struct Storefront {
    pub base_url: String,
    pub client: reqwest::Client,
    pub db: Arc<MemoryDatabase>,
    pub identity: Arc<MemoryIdentity>,
    pub mailer: RecordingMailer,
}

impl Storefront {
    pub async fn start() -> Self {
        Self::start_with(MemoryDatabase::new()).await
    }

    pub async fn start_with(db: MemoryDatabase) -> Self {
        let db = Arc::new(db);
        Self::start_on(db.clone(), db).await
    }

    /// Serve `backend`, keeping `db` as the store the test inspects.
    pub async fn start_on(backend: Arc<dyn Database>, db: Arc<MemoryDatabase>) -> Self {
        let identity = Arc::new(MemoryIdentity::new());
        let mailer = RecordingMailer::new();

        let state = shopfront_storefront::state::AppState::new(
            storefront_config(),
            backend,
            identity.clone(),
            Arc::new(mailer.clone()),
        );
        let base_url = serve(shopfront_storefront::app(state)).await;

        Self {
            base_url,
            client: client(),
            db,
            identity,
            mailer,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a form and return the response.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("send form")
    }

    /// Register through the sign-up form; the client is signed in afterwards.
    pub async fn register(&self, name: &str, email: &str) -> reqwest::Response {
        self.post_form(
            "/auth/register",
            &[
                ("name", name),
                ("email", email),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await
    }

    /// Sign in through the login form.
    pub async fn sign_in(&self, email: &str) -> reqwest::Response {
        self.post_form("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await
    }

    /// Wait until the mailer has recorded at least `count` messages.
    pub async fn wait_for_mail(&self, count: usize) -> Vec<shopfront_storefront::services::OutgoingEmail> {
        for _ in 0..100 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.mailer.sent()
    }
}

/// A running admin panel and the backends behind it.
pub struct Admin {
    pub base_url: String,
    pub client: reqwest::Client,
    pub db: Arc<MemoryDatabase>,
    pub identity: Arc<MemoryIdentity>,
}

impl Admin {
    pub async fn start() -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let identity = Arc::new(MemoryIdentity::new());
        let state =
            shopfront_admin::state::AppState::new(admin_config(), db.clone(), identity.clone());
        let base_url = serve(shopfront_admin::app(state)).await;

        Self {
            base_url,
            client: client(),
            db,
            identity,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("send request")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("send form")
    }

    /// Create an account with `role` and sign the client in as it.
    pub async fn sign_in_as(&self, email: &str, role: UserRole) -> (UserId, reqwest::Response) {
        let uid = create_account(self.db.as_ref(), &self.identity, email, "Staff", role).await;
        let response = self
            .post_form("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await;
        (uid, response)
    }
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Database wrapper that holds the first `parties` conditional updates at a
/// barrier, so that concurrent checkouts reach their stock decrements
/// together.
pub struct GatedDatabase {
    inner: MemoryDatabase,
    barrier: Barrier,
    remaining: AtomicUsize,
}

impl GatedDatabase {
    #[must_use]
    pub fn new(inner: MemoryDatabase, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            remaining: AtomicUsize::new(parties),
        }
    }

    #[must_use]
    pub const fn inner(&self) -> &MemoryDatabase {
        &self.inner
    }
}

#[async_trait]
impl Database for GatedDatabase {
    async fn read(&self, path: &str) -> Result<Option<Value>, DbError> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), DbError> {
        self.inner.write(path, value).await
    }

    async fn patch(&self, path: &str, updates: BTreeMap<String, Value>) -> Result<(), DbError> {
        self.inner.patch(path, updates).await
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, DbError> {
        self.inner.push(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<(), DbError> {
        self.inner.delete(path).await
    }

    async fn transaction(
        &self,
        path: &str,
        update: &UpdateFn<'_>,
    ) -> Result<TransactionResult, DbError> {
        let gated = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
        self.inner.transaction(path, update).await
    }
}

/// Database wrapper that overwrites one path with a competing value right
/// before the first conditional update touching it, as if another client
/// had written between a read and the update.
pub struct RacingDatabase {
    inner: MemoryDatabase,
    path: String,
    value: Value,
    fired: AtomicBool,
}

impl RacingDatabase {
    #[must_use]
    pub fn new(inner: MemoryDatabase, path: impl Into<String>, value: Value) -> Self {
        Self {
            inner,
            path: path.into(),
            value,
            fired: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn inner(&self) -> &MemoryDatabase {
        &self.inner
    }
}

#[async_trait]
impl Database for RacingDatabase {
    async fn read(&self, path: &str) -> Result<Option<Value>, DbError> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), DbError> {
        self.inner.write(path, value).await
    }

    async fn patch(&self, path: &str, updates: BTreeMap<String, Value>) -> Result<(), DbError> {
        self.inner.patch(path, updates).await
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, DbError> {
        self.inner.push(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<(), DbError> {
        self.inner.delete(path).await
    }

    async fn transaction(
        &self,
        path: &str,
        update: &UpdateFn<'_>,
    ) -> Result<TransactionResult, DbError> {
        if path == self.path && !self.fired.swap(true, Ordering::SeqCst) {
            self.inner.write(path, self.value.clone()).await?;
        }
        self.inner.transaction(path, update).await
    }
}

/// Database wrapper whose plain writes under a path suffix fail once
/// switched on, as if the backend dropped them.
pub struct FailingWrites {
    inner: Arc<MemoryDatabase>,
    suffix: String,
    failing: AtomicBool,
}

impl FailingWrites {
    #[must_use]
    pub fn new(inner: Arc<MemoryDatabase>, suffix: impl Into<String>) -> Self {
        Self {
            inner,
            suffix: suffix.into(),
            failing: AtomicBool::new(false),
        }
    }

    pub fn start_failing(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Database for FailingWrites {
    async fn read(&self, path: &str) -> Result<Option<Value>, DbError> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), DbError> {
        if self.failing.load(Ordering::SeqCst) && path.ends_with(self.suffix.as_str()) {
            return Err(DbError::Transport(format!("write to {path} dropped")));
        }
        self.inner.write(path, value).await
    }

    async fn patch(&self, path: &str, updates: BTreeMap<String, Value>) -> Result<(), DbError> {
        self.inner.patch(path, updates).await
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, DbError> {
        self.inner.push(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<(), DbError> {
        self.inner.delete(path).await
    }

    async fn transaction(
        &self,
        path: &str,
        update: &UpdateFn<'_>,
    ) -> Result<TransactionResult, DbError> {
        self.inner.transaction(path, update).await
    }
}
