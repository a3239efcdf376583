//! Application state shared across handlers.

use std::sync::Arc;

use shopfront_core::auth::IdentityProvider;
use shopfront_core::db::Database;

use crate::config::StorefrontConfig;
use crate::services::catalog::CatalogCache;
use crate::services::mailer::MailTransport;
use crate::services::notifications::Notifier;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// database, the identity service and outgoing mail.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    db: Arc<dyn Database>,
    identity: Arc<dyn IdentityProvider>,
    catalog: CatalogCache,
    notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `db` - Realtime database client
    /// * `identity` - Identity service client
    /// * `mailer` - Transport for order emails
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        db: Arc<dyn Database>,
        identity: Arc<dyn IdentityProvider>,
        mailer: Arc<dyn MailTransport>,
    ) -> Self {
        let catalog = CatalogCache::new(config.catalog_cache_ttl);
        let notifier = Notifier::new(
            mailer,
            config.mail.from.clone(),
            config.mail.admin_email.clone(),
            config.base_url.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                identity,
                catalog,
                notifier,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database.
    #[must_use]
    pub fn db(&self) -> &dyn Database {
        self.inner.db.as_ref()
    }

    /// Get a reference to the identity service.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get the cached product catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Get the order email sender.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
