//! User profiles plus their nested address book and cart mirror.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::{Database, DbError, RepositoryError, Transition, decode, decode_children, paths};
use crate::models::{AddressBook, Cart, ProfileUpdate, UserProfile};
use crate::types::{UserId, UserRole};

/// Repository for `users/*`.
pub struct UserRepository<'a> {
    db: &'a dyn Database,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Get a profile by uid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the record is invalid.
    pub async fn get(&self, uid: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let path = paths::user(uid)?;
        let Some(value) = self.db.read(&path).await? else {
            return Ok(None);
        };
        let mut profile: UserProfile = decode(&path, value)?;
        profile.uid = uid.clone();
        Ok(Some(profile))
    }

    /// Every profile, in uid order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    pub async fn list(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        let value = self.db.read(paths::USERS).await?;
        Ok(decode_children::<UserProfile>(paths::USERS, value)
            .into_iter()
            .map(|(key, mut profile)| {
                profile.uid = UserId::new(key);
                profile
            })
            .collect())
    }

    /// Create the profile unless one already exists. Returns the stored
    /// profile and whether it was created now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn ensure(&self, profile: &UserProfile) -> Result<(UserProfile, bool), RepositoryError> {
        let path = paths::user(&profile.uid)?;
        let mut fresh = serde_json::to_value(profile).map_err(DbError::from)?;
        if let Value::Object(map) = &mut fresh {
            map.remove("uid");
        }
        // A node holding only nested data (a cart mirror) still gets a profile.
        let update = |current: Option<&Value>| match current {
            Some(existing) if existing.get("email").is_some() => Transition::Abort,
            Some(Value::Object(nested)) => {
                let mut merged = nested.clone();
                if let Value::Object(fields) = &fresh {
                    merged.extend(fields.clone());
                }
                Transition::Commit(Value::Object(merged))
            }
            _ => Transition::Commit(fresh.clone()),
        };
        let result = self.db.transaction(&path, &update).await?;
        let stored: UserProfile = match result.value {
            Some(value) => decode(&path, value)?,
            None => return Err(RepositoryError::NotFound),
        };
        Ok((
            UserProfile {
                uid: profile.uid.clone(),
                ..stored
            },
            result.committed,
        ))
    }

    /// Update the editable profile fields without touching nested data.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn update_profile(&self, uid: &UserId, update: &ProfileUpdate) -> Result<(), RepositoryError> {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_owned(), json!(update.name.trim()));
        fields.insert("phone".to_owned(), json!(update.phone.trim()));
        self.patch_existing(uid, fields).await
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn set_role(&self, uid: &UserId, role: UserRole) -> Result<(), RepositoryError> {
        let mut fields = BTreeMap::new();
        fields.insert("role".to_owned(), json!(role));
        self.patch_existing(uid, fields).await
    }

    async fn patch_existing(
        &self,
        uid: &UserId,
        fields: BTreeMap<String, Value>,
    ) -> Result<(), RepositoryError> {
        let path = paths::user(uid)?;
        if self.db.read(&format!("{path}/email")).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.db.patch(&path, fields).await?;
        Ok(())
    }

    /// Delete a profile and everything nested under it.
    ///
    /// The identity service account is not touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, uid: &UserId) -> Result<(), RepositoryError> {
        self.db.delete(&paths::user(uid)?).await?;
        Ok(())
    }

    /// Load the address book, repairing the one-default rule if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn addresses(&self, uid: &UserId) -> Result<AddressBook, RepositoryError> {
        let path = paths::addresses(uid)?;
        let mut book: AddressBook = match self.db.read(&path).await? {
            Some(value) => decode(&path, value)?,
            None => AddressBook::new(),
        };
        book.repair_default();
        Ok(book)
    }

    /// Replace the whole address book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn save_addresses(&self, uid: &UserId, book: &AddressBook) -> Result<(), RepositoryError> {
        let path = paths::addresses(uid)?;
        let value = serde_json::to_value(book).map_err(DbError::from)?;
        self.db.write(&path, value).await?;
        Ok(())
    }

    /// Load the mirrored cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn cart(&self, uid: &UserId) -> Result<Cart, RepositoryError> {
        let path = paths::cart(uid)?;
        match self.db.read(&path).await? {
            Some(value) => decode(&path, value),
            None => Ok(Cart::new()),
        }
    }

    /// Replace the mirrored cart (an empty cart deletes the subtree).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn save_cart(&self, uid: &UserId, cart: &Cart) -> Result<(), RepositoryError> {
        let path = paths::cart(uid)?;
        let value = serde_json::to_value(cart).map_err(DbError::from)?;
        self.db.write(&path, value).await?;
        Ok(())
    }
}
