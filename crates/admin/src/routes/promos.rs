//! Promo code management route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::db::{PromoRepository, RepositoryError};
use shopfront_core::models::{ProductScope, PromoCode, PromoError};

use super::{AdminUserView, render};
use crate::{
    error::{AppError, Result},
    filters,
    middleware::{RequireAdminAuth, flash, take_flash},
    models::Flash,
    state::AppState,
};

const CURRENT_PATH: &str = "/promos";

/// Promo code row for the listing.
#[derive(Debug, Clone)]
pub struct PromoView {
    pub code: String,
    pub discount: u8,
    pub scope: String,
    pub expiry_date: String,
    pub active: bool,
    pub expired: bool,
}

impl PromoView {
    fn new(promo: &PromoCode, today: NaiveDate) -> Self {
        Self {
            code: promo.code.clone(),
            discount: promo.discount_percent.value(),
            scope: promo.applicable_products.to_string(),
            expiry_date: promo.expiry_date.format("%Y-%m-%d").to_string(),
            active: promo.active,
            expired: promo.is_expired(today),
        }
    }
}

/// Promo codes template (listing plus create form).
#[derive(Template)]
#[template(path = "promos/index.html")]
pub struct PromosIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<Flash>,
    pub promos: Vec<PromoView>,
}

/// Form input for creating promo codes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromoFormInput {
    pub code: String,
    pub discount_percent: String,
    /// `all`, or product ids separated by commas.
    pub applicable_products: String,
    /// `YYYY-MM-DD`.
    pub expiry_date: String,
}

impl PromoFormInput {
    /// Validate into a new, active code.
    ///
    /// # Errors
    ///
    /// Returns a message for the first invalid field.
    pub fn to_promo(&self) -> std::result::Result<PromoCode, String> {
        let percent: u32 = self
            .discount_percent
            .trim()
            .parse()
            .map_err(|_| PromoError::InvalidPercent.to_string())?;
        let expiry = NaiveDate::parse_from_str(self.expiry_date.trim(), "%Y-%m-%d")
            .map_err(|_| "expiry date must be YYYY-MM-DD".to_string())?;
        PromoCode::new(
            &self.code,
            percent,
            ProductScope::from_list(&self.applicable_products),
            expiry,
        )
        .map_err(|e| e.to_string())
    }
}

/// Build the promo codes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{code}/toggle", post(toggle))
        .route("/{code}/delete", post(delete))
}

/// Promo codes page handler.
#[instrument(skip_all)]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let today = chrono::Utc::now().date_naive();
    let promos = PromoRepository::new(state.db()).list().await?;

    Ok(render(&PromosIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: CURRENT_PATH.to_string(),
        flash: take_flash(&session).await,
        promos: promos.iter().map(|p| PromoView::new(p, today)).collect(),
    }))
}

/// Create promo code handler.
#[instrument(skip_all, fields(code = %input.code))]
pub async fn create(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<PromoFormInput>,
) -> Result<Redirect> {
    let promo = match input.to_promo() {
        Ok(promo) => promo,
        Err(message) => {
            flash(&session, Flash::error(message)).await;
            return Ok(Redirect::to(CURRENT_PATH));
        }
    };

    match PromoRepository::new(state.db()).create(&promo).await {
        Ok(()) => {
            tracing::info!(code = %promo.code, "Promo code created");
            flash(&session, Flash::info(format!("Created {}", promo.code))).await;
        }
        Err(RepositoryError::Conflict(_)) => {
            flash(&session, Flash::error(format!("{} already exists", promo.code))).await;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to(CURRENT_PATH))
}

async fn load(state: &AppState, code: &str) -> Result<PromoCode> {
    PromoRepository::new(state.db())
        .find(code)
        .await?
        .ok_or_else(|| AppError::NotFound("promo code".to_string()))
}

/// Flip a code between active and inactive.
#[instrument(skip(_admin, state, session))]
pub async fn toggle(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(code): Path<String>,
) -> Result<Redirect> {
    let promo = load(&state, &code).await?;
    let active = !promo.active;
    PromoRepository::new(state.db())
        .set_active(&promo.code, active)
        .await?;
    tracing::info!(code = %promo.code, active, "Promo code toggled");
    let verb = if active { "activated" } else { "deactivated" };
    flash(&session, Flash::info(format!("{} {verb}", promo.code))).await;
    Ok(Redirect::to(CURRENT_PATH))
}

/// Delete promo code handler.
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(code): Path<String>,
) -> Result<Redirect> {
    let promo = load(&state, &code).await?;
    PromoRepository::new(state.db()).delete(&promo.code).await?;
    tracing::info!(code = %promo.code, "Promo code deleted");
    flash(&session, Flash::info(format!("{} deleted", promo.code))).await;
    Ok(Redirect::to(CURRENT_PATH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> PromoFormInput {
        PromoFormInput {
            code: " spring10 ".to_string(),
            discount_percent: "10".to_string(),
            applicable_products: "all".to_string(),
            expiry_date: "2026-06-30".to_string(),
        }
    }

    #[test]
    fn test_code_is_uppercased_and_active() {
        let promo = input().to_promo().unwrap();
        assert_eq!(promo.code, "SPRING10");
        assert!(promo.active);
        assert_eq!(promo.applicable_products, ProductScope::All);
    }

    #[test]
    fn test_percent_must_be_one_to_hundred() {
        for bad in ["0", "101", "ten", ""] {
            let f = PromoFormInput {
                discount_percent: bad.to_string(),
                ..input()
            };
            assert_eq!(
                f.to_promo().unwrap_err(),
                PromoError::InvalidPercent.to_string()
            );
        }
    }

    #[test]
    fn test_bad_expiry_date_rejected() {
        let f = PromoFormInput {
            expiry_date: "30/06/2026".to_string(),
            ..input()
        };
        assert!(f.to_promo().unwrap_err().contains("YYYY-MM-DD"));
    }
}
