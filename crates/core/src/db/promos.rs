//! Promo code repository.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::{Database, DbError, RepositoryError, Transition, decode, decode_children, paths};
use crate::models::PromoCode;
use crate::models::promo::normalize_code;

/// Repository for `promoCodes/*`.
pub struct PromoRepository<'a> {
    db: &'a dyn Database,
}

impl<'a> PromoRepository<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Look up a code as typed by a shopper. Input that cannot be a code
    /// finds nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the record is invalid.
    pub async fn find(&self, raw: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let Ok(code) = normalize_code(raw) else {
            return Ok(None);
        };
        let path = paths::promo_code(&code)?;
        let Some(value) = self.db.read(&path).await? else {
            return Ok(None);
        };
        let mut promo: PromoCode = decode(&path, value)?;
        promo.code = code;
        Ok(Some(promo))
    }

    /// Every promo code, in code order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    pub async fn list(&self) -> Result<Vec<PromoCode>, RepositoryError> {
        let value = self.db.read(paths::PROMO_CODES).await?;
        Ok(decode_children::<PromoCode>(paths::PROMO_CODES, value)
            .into_iter()
            .map(|(key, mut promo)| {
                promo.code = key;
                promo
            })
            .collect())
    }

    /// Insert a new code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    pub async fn create(&self, promo: &PromoCode) -> Result<(), RepositoryError> {
        let path = paths::promo_code(&promo.code)?;
        let mut value = serde_json::to_value(promo).map_err(DbError::from)?;
        if let Value::Object(map) = &mut value {
            map.remove("code");
        }
        let update = |current: Option<&Value>| match current {
            Some(_) => Transition::Abort,
            None => Transition::Commit(value.clone()),
        };
        if self.db.transaction(&path, &update).await?.committed {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!(
                "promo code {} already exists",
                promo.code
            )))
        }
    }

    /// Switch a code on or off.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code does not exist.
    pub async fn set_active(&self, code: &str, active: bool) -> Result<(), RepositoryError> {
        let path = paths::promo_code(code)?;
        if self.db.read(&path).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        let mut fields = BTreeMap::new();
        fields.insert("active".to_owned(), json!(active));
        self.db.patch(&path, fields).await?;
        Ok(())
    }

    /// Delete a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, code: &str) -> Result<(), RepositoryError> {
        self.db.delete(&paths::promo_code(code)?).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::MemoryDatabase;
    use crate::models::ProductScope;

    fn promo() -> PromoCode {
        PromoCode::new(
            "save10",
            10,
            ProductScope::All,
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_normalizes_input() {
        let db = MemoryDatabase::new();
        let repo = PromoRepository::new(&db);
        repo.create(&promo()).await.unwrap();
        let found = repo.find("  save10 ").await.unwrap().unwrap();
        assert_eq!(found.code, "SAVE10");
        assert!(repo.find("no/such").await.unwrap().is_none());
        assert!(repo.find("OTHER").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let db = MemoryDatabase::new();
        let repo = PromoRepository::new(&db);
        repo.create(&promo()).await.unwrap();
        assert!(matches!(
            repo.create(&promo()).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let db = MemoryDatabase::new();
        let repo = PromoRepository::new(&db);
        repo.create(&promo()).await.unwrap();
        repo.set_active("SAVE10", false).await.unwrap();
        assert!(!repo.list().await.unwrap()[0].active);
        repo.delete("SAVE10").await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
        assert!(matches!(
            repo.set_active("SAVE10", true).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
