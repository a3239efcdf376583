//! Per-request page chrome: who is signed in, cart badge, theme and the
//! one-shot notice.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use shopfront_core::models::Cart;

use crate::models::{CurrentUser, Notice, Theme, session_keys};

/// Data every full page template renders in its layout.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub theme: Theme,
    pub notice: Option<Notice>,
}

impl Page {
    /// Name shown in the header, if signed in.
    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.user.as_ref().map(CurrentUser::display_name)
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let cart_count = session
            .get::<Cart>(session_keys::CART)
            .await
            .ok()
            .flatten()
            .map_or(0, |cart| cart.item_count());
        let theme = session
            .get::<Theme>(session_keys::THEME)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        let notice = session
            .remove::<Notice>(session_keys::NOTICE)
            .await
            .ok()
            .flatten();

        Ok(Self {
            user,
            cart_count,
            theme,
            notice,
        })
    }
}

/// Queue a notice for the next rendered page.
pub async fn flash(session: &Session, notice: Notice) {
    if let Err(e) = session.insert(session_keys::NOTICE, &notice).await {
        tracing::warn!(error = %e, "Failed to store notice");
    }
}
