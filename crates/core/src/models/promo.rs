//! Promo codes and their validation rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Percent, ProductId, id::validate_key};

/// Why a promo code was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PromoError {
    #[error("promo code is not valid")]
    Unknown,
    #[error("promo code is no longer active")]
    Inactive,
    #[error("promo code expired on {0}")]
    Expired(NaiveDate),
    #[error("promo code does not apply to this product")]
    NotApplicable,
    #[error("promo discount must be between 1 and 100 percent")]
    InvalidPercent,
    #[error("promo code contains invalid characters")]
    InvalidCode,
}

/// Normalise user input into a promo code key: trimmed and uppercased.
///
/// # Errors
///
/// [`PromoError::InvalidCode`] when the result is empty or not a usable key.
pub fn normalize_code(raw: &str) -> Result<String, PromoError> {
    let code = raw.trim().to_uppercase();
    validate_key(&code).map_err(|_| PromoError::InvalidCode)?;
    Ok(code)
}

/// Which products a promo code applies to.
///
/// Stored as the string `"all"` or as a list of product ids.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ScopeRepr", into = "ScopeRepr")]
pub enum ProductScope {
    #[default]
    All,
    Only(Vec<ProductId>),
}

impl ProductScope {
    #[must_use]
    pub fn includes(&self, product_id: &ProductId) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(product_id),
        }
    }

    /// Parse the comma-separated form used by the back-office ("all" or ids).
    #[must_use]
    pub fn from_list(raw: &str) -> Self {
        let ids: Vec<ProductId> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ProductId::from)
            .collect();
        let only_all = ids.len() == 1 && ids.first().is_some_and(|id| id.as_str().eq_ignore_ascii_case("all"));
        if ids.is_empty() || only_all {
            Self::All
        } else {
            Self::Only(ids)
        }
    }
}

impl std::fmt::Display for ProductScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(ids) => {
                let joined: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
                f.write_str(&joined.join(", "))
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ScopeRepr {
    Keyword(String),
    List(Vec<ProductId>),
}

impl TryFrom<ScopeRepr> for ProductScope {
    type Error = String;

    fn try_from(repr: ScopeRepr) -> Result<Self, Self::Error> {
        match repr {
            ScopeRepr::Keyword(s) if s == "all" => Ok(Self::All),
            ScopeRepr::Keyword(s) => Err(format!("unknown product scope: {s}")),
            ScopeRepr::List(ids) => Ok(Self::Only(ids)),
        }
    }
}

impl From<ProductScope> for ScopeRepr {
    fn from(scope: ProductScope) -> Self {
        match scope {
            ProductScope::All => Self::Keyword("all".to_owned()),
            ProductScope::Only(ids) => Self::List(ids),
        }
    }
}

/// A promo code as stored under `promoCodes/{CODE}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    pub discount_percent: Percent,
    #[serde(default)]
    pub applicable_products: ProductScope,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub active: bool,
}

impl PromoCode {
    /// Create a promo code, normalising the key and checking the percent.
    ///
    /// # Errors
    ///
    /// [`PromoError::InvalidCode`] or [`PromoError::InvalidPercent`].
    pub fn new(
        code: &str,
        percent: u32,
        applicable_products: ProductScope,
        expiry_date: NaiveDate,
    ) -> Result<Self, PromoError> {
        let code = normalize_code(code)?;
        let discount_percent = match Percent::new(percent) {
            Ok(p) if !p.is_zero() => p,
            _ => return Err(PromoError::InvalidPercent),
        };
        Ok(Self {
            code,
            discount_percent,
            applicable_products,
            expiry_date,
            active: true,
        })
    }

    /// A code is expired once its expiry date is strictly before `today`.
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    /// Check this code against a product and return its discount.
    ///
    /// Expiry is checked before the active flag so an expired code always
    /// reports as expired.
    ///
    /// # Errors
    ///
    /// [`PromoError::Expired`], [`PromoError::Inactive`] or
    /// [`PromoError::NotApplicable`].
    pub fn validate_for(&self, product_id: &ProductId, today: NaiveDate) -> Result<Percent, PromoError> {
        if self.is_expired(today) {
            return Err(PromoError::Expired(self.expiry_date));
        }
        if !self.active {
            return Err(PromoError::Inactive);
        }
        if !self.applicable_products.includes(product_id) {
            return Err(PromoError::NotApplicable);
        }
        Ok(self.discount_percent)
    }
}

/// Validate a looked-up code (`None` when the key was absent).
///
/// # Errors
///
/// [`PromoError::Unknown`] for a missing code, otherwise as
/// [`PromoCode::validate_for`].
pub fn validate(
    promo: Option<&PromoCode>,
    product_id: &ProductId,
    today: NaiveDate,
) -> Result<Percent, PromoError> {
    promo
        .ok_or(PromoError::Unknown)?
        .validate_for(product_id, today)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn promo(scope: ProductScope) -> PromoCode {
        PromoCode::new("summer10", 10, scope, date(2026, 8, 31)).unwrap()
    }

    #[test]
    fn test_new_uppercases_and_bounds_percent() {
        assert_eq!(promo(ProductScope::All).code, "SUMMER10");
        assert_eq!(
            PromoCode::new("x", 0, ProductScope::All, date(2026, 1, 1)),
            Err(PromoError::InvalidPercent)
        );
        assert_eq!(
            PromoCode::new("x", 101, ProductScope::All, date(2026, 1, 1)),
            Err(PromoError::InvalidPercent)
        );
        assert_eq!(normalize_code("  "), Err(PromoError::InvalidCode));
        assert_eq!(normalize_code("a/b"), Err(PromoError::InvalidCode));
    }

    #[test]
    fn test_valid_code_returns_percent() {
        let p = promo(ProductScope::All);
        let percent = p.validate_for(&ProductId::new("p1"), date(2026, 8, 31)).unwrap();
        assert_eq!(percent.value(), 10);
    }

    #[test]
    fn test_expired_code_invalid_regardless_of_active() {
        let mut p = promo(ProductScope::All);
        let today = date(2026, 9, 1);
        assert!(matches!(
            p.validate_for(&ProductId::new("p1"), today),
            Err(PromoError::Expired(_))
        ));
        p.active = false;
        assert!(matches!(
            p.validate_for(&ProductId::new("p1"), today),
            Err(PromoError::Expired(_))
        ));
    }

    #[test]
    fn test_inactive_and_not_applicable() {
        let mut p = promo(ProductScope::Only(vec![ProductId::new("p2")]));
        let today = date(2026, 6, 1);
        assert_eq!(
            p.validate_for(&ProductId::new("p1"), today),
            Err(PromoError::NotApplicable)
        );
        p.active = false;
        assert_eq!(
            p.validate_for(&ProductId::new("p2"), today),
            Err(PromoError::Inactive)
        );
        assert_eq!(
            validate(None, &ProductId::new("p2"), today),
            Err(PromoError::Unknown)
        );
    }

    #[test]
    fn test_scope_serde_accepts_keyword_and_list() {
        let all: ProductScope = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, ProductScope::All);
        let some: ProductScope = serde_json::from_str(r#"["p1","p2"]"#).unwrap();
        assert!(some.includes(&ProductId::new("p2")));
        assert!(serde_json::from_str::<ProductScope>("\"some\"").is_err());
        assert_eq!(serde_json::to_string(&ProductScope::All).unwrap(), "\"all\"");
    }

    #[test]
    fn test_scope_from_list() {
        assert_eq!(ProductScope::from_list(" ALL "), ProductScope::All);
        assert_eq!(ProductScope::from_list(""), ProductScope::All);
        assert_eq!(
            ProductScope::from_list("p1, p2,"),
            ProductScope::Only(vec![ProductId::new("p1"), ProductId::new("p2")])
        );
    }

    #[test]
    fn test_record_shape() {
        let json = r#"{"discountPercent":15,"applicableProducts":"all","expiryDate":"2026-12-31","active":true}"#;
        let p: PromoCode = serde_json::from_str(json).unwrap();
        assert_eq!(p.discount_percent.value(), 15);
        assert_eq!(p.expiry_date, date(2026, 12, 31));
    }
}
