//! Promo code commands.

use chrono::NaiveDate;

use shopfront_core::db::{Database, PromoRepository, RepositoryError};
use shopfront_core::models::{ProductScope, PromoCode};

use super::CliError;

/// Create a promo code.
///
/// # Errors
///
/// Returns `CliError::Invalid` for a bad code, percent or date, and
/// `CliError::Database` (conflict) if the code already exists.
pub async fn create(
    db: &dyn Database,
    code: &str,
    percent: u32,
    expires: &str,
    products: &str,
) -> Result<(), CliError> {
    let expiry = NaiveDate::parse_from_str(expires.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::Invalid("expiry date", format!("{expires}: {e}")))?;
    let promo = PromoCode::new(code, percent, ProductScope::from_list(products), expiry)
        .map_err(|e| CliError::Invalid("promo code", e.to_string()))?;

    match PromoRepository::new(db).create(&promo).await {
        Ok(()) => {
            tracing::info!(
                code = %promo.code,
                percent = promo.discount_percent.value(),
                products = %promo.applicable_products,
                expires = %promo.expiry_date,
                "Promo code created"
            );
            Ok(())
        }
        Err(RepositoryError::Conflict(_)) => Err(CliError::Invalid(
            "promo code",
            format!("{} already exists", promo.code),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Log every promo code.
///
/// # Errors
///
/// Returns `CliError::Database` if the read fails.
pub async fn list(db: &dyn Database) -> Result<(), CliError> {
    let today = chrono::Utc::now().date_naive();
    let promos = PromoRepository::new(db).list().await?;

    tracing::info!("Promo codes: {}", promos.len());
    for promo in &promos {
        let state = match (promo.active, promo.is_expired(today)) {
            (_, true) => "expired",
            (true, false) => "active",
            (false, false) => "inactive",
        };
        tracing::info!(
            "  {} {}% [{}] until {} ({state})",
            promo.code,
            promo.discount_percent,
            promo.applicable_products,
            promo.expiry_date
        );
    }
    Ok(())
}
