//! Application state shared across handlers.

use std::sync::Arc;

use shopfront_core::auth::IdentityProvider;
use shopfront_core::db::Database;

use crate::config::AdminConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable; the back-office only needs the database and the
/// identity service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    db: Arc<dyn Database>,
    identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AdminConfig,
        db: Arc<dyn Database>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                identity,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn db(&self) -> &dyn Database {
        self.inner.db.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }
}
