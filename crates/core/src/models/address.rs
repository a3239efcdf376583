//! Postal addresses and the per-user address book.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::AddressId;

/// Maximum number of saved addresses per user.
pub const MAX_ADDRESSES: usize = 3;

/// A delivery address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// Errors from address validation and address book mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressBookError {
    #[error("you can save at most {MAX_ADDRESSES} addresses")]
    Full,
    #[error("address not found")]
    NotFound,
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl PostalAddress {
    /// Trim every field and check the required ones.
    ///
    /// # Errors
    ///
    /// [`AddressBookError::MissingField`] naming the first blank required field.
    pub fn normalized(mut self) -> Result<Self, AddressBookError> {
        for field in [
            &mut self.full_name,
            &mut self.phone,
            &mut self.line1,
            &mut self.line2,
            &mut self.city,
            &mut self.region,
            &mut self.postal_code,
            &mut self.country,
        ] {
            *field = field.trim().to_owned();
        }
        if self.full_name.is_empty() {
            return Err(AddressBookError::MissingField("name"));
        }
        if self.line1.is_empty() {
            return Err(AddressBookError::MissingField("address"));
        }
        if self.city.is_empty() {
            return Err(AddressBookError::MissingField("city"));
        }
        Ok(self)
    }

    /// Single-line rendering for lists and emails.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.line1.as_str(),
            self.line2.as_str(),
            self.city.as_str(),
            self.region.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// An address stored under `users/{uid}/addresses/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    #[serde(flatten)]
    pub address: PostalAddress,
    #[serde(default)]
    pub is_default: bool,
}

/// A user's saved addresses.
///
/// Keys are time-ordered, so iteration order is insertion order. Holds at
/// most [`MAX_ADDRESSES`] entries with exactly one default when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    entries: BTreeMap<AddressId, SavedAddress>,
}

impl AddressBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address under `id`. The first address, or one added with
    /// `make_default`, becomes the default.
    ///
    /// # Errors
    ///
    /// [`AddressBookError::Full`] when the book already holds
    /// [`MAX_ADDRESSES`] entries.
    pub fn add(
        &mut self,
        id: AddressId,
        address: PostalAddress,
        make_default: bool,
    ) -> Result<(), AddressBookError> {
        if self.entries.len() >= MAX_ADDRESSES {
            return Err(AddressBookError::Full);
        }
        let is_default = make_default || self.entries.is_empty();
        if is_default {
            self.clear_default();
        }
        self.entries.insert(id, SavedAddress { address, is_default });
        Ok(())
    }

    /// Replace the fields of an existing address, keeping its default flag.
    ///
    /// # Errors
    ///
    /// [`AddressBookError::NotFound`].
    pub fn update(&mut self, id: &AddressId, address: PostalAddress) -> Result<(), AddressBookError> {
        let entry = self.entries.get_mut(id).ok_or(AddressBookError::NotFound)?;
        entry.address = address;
        Ok(())
    }

    /// Remove an address. When it was the default, the first remaining entry
    /// becomes the default.
    ///
    /// # Errors
    ///
    /// [`AddressBookError::NotFound`].
    pub fn remove(&mut self, id: &AddressId) -> Result<SavedAddress, AddressBookError> {
        let removed = self.entries.remove(id).ok_or(AddressBookError::NotFound)?;
        if removed.is_default
            && let Some(first) = self.entries.values_mut().next()
        {
            first.is_default = true;
        }
        Ok(removed)
    }

    /// Make `id` the only default address.
    ///
    /// # Errors
    ///
    /// [`AddressBookError::NotFound`].
    pub fn set_default(&mut self, id: &AddressId) -> Result<(), AddressBookError> {
        if !self.entries.contains_key(id) {
            return Err(AddressBookError::NotFound);
        }
        for (key, entry) in &mut self.entries {
            entry.is_default = key == id;
        }
        Ok(())
    }

    /// Restore the one-default rule on data read back from storage.
    pub fn repair_default(&mut self) {
        let mut seen = false;
        for entry in self.entries.values_mut() {
            if entry.is_default && !seen {
                seen = true;
            } else {
                entry.is_default = false;
            }
        }
        if !seen && let Some(first) = self.entries.values_mut().next() {
            first.is_default = true;
        }
    }

    fn clear_default(&mut self) {
        for entry in self.entries.values_mut() {
            entry.is_default = false;
        }
    }

    #[must_use]
    pub fn default_entry(&self) -> Option<(&AddressId, &SavedAddress)> {
        self.entries.iter().find(|(_, entry)| entry.is_default)
    }

    #[must_use]
    pub fn get(&self, id: &AddressId) -> Option<&SavedAddress> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AddressId, &SavedAddress)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_ADDRESSES
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn addr(name: &str) -> PostalAddress {
        PostalAddress {
            full_name: name.to_owned(),
            line1: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            ..PostalAddress::default()
        }
    }

    fn defaults(book: &AddressBook) -> usize {
        book.iter().filter(|(_, a)| a.is_default).count()
    }

    #[test]
    fn test_first_address_becomes_default() {
        let mut book = AddressBook::new();
        book.add(AddressId::new("a1"), addr("A"), false).unwrap();
        assert_eq!(book.default_entry().unwrap().0.as_str(), "a1");
        book.add(AddressId::new("a2"), addr("B"), false).unwrap();
        assert_eq!(book.default_entry().unwrap().0.as_str(), "a1");
        assert_eq!(defaults(&book), 1);
    }

    #[test]
    fn test_capacity_is_three() {
        let mut book = AddressBook::new();
        for i in 0..3 {
            book.add(AddressId::new(format!("a{i}")), addr("A"), false).unwrap();
        }
        assert!(book.is_full());
        assert_eq!(
            book.add(AddressId::new("a9"), addr("A"), false),
            Err(AddressBookError::Full)
        );
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn test_removing_default_reassigns_first_remaining() {
        let mut book = AddressBook::new();
        book.add(AddressId::new("a1"), addr("A"), false).unwrap();
        book.add(AddressId::new("a2"), addr("B"), false).unwrap();
        book.add(AddressId::new("a3"), addr("C"), false).unwrap();
        book.remove(&AddressId::new("a1")).unwrap();
        assert_eq!(book.default_entry().unwrap().0.as_str(), "a2");
        assert_eq!(defaults(&book), 1);

        book.remove(&AddressId::new("a2")).unwrap();
        book.remove(&AddressId::new("a3")).unwrap();
        assert!(book.default_entry().is_none());
    }

    #[test]
    fn test_make_default_moves_flag() {
        let mut book = AddressBook::new();
        book.add(AddressId::new("a1"), addr("A"), false).unwrap();
        book.add(AddressId::new("a2"), addr("B"), true).unwrap();
        assert_eq!(book.default_entry().unwrap().0.as_str(), "a2");
        book.set_default(&AddressId::new("a1")).unwrap();
        assert_eq!(book.default_entry().unwrap().0.as_str(), "a1");
        assert_eq!(defaults(&book), 1);
        assert_eq!(
            book.set_default(&AddressId::new("zz")),
            Err(AddressBookError::NotFound)
        );
    }

    #[test]
    fn test_repair_default() {
        let json = r#"{"a1":{"fullName":"A","line1":"x","city":"y","isDefault":true},
                       "a2":{"fullName":"B","line1":"x","city":"y","isDefault":true}}"#;
        let mut book: AddressBook = serde_json::from_str(json).unwrap();
        book.repair_default();
        assert_eq!(defaults(&book), 1);

        let json = r#"{"a1":{"fullName":"A","line1":"x","city":"y"}}"#;
        let mut book: AddressBook = serde_json::from_str(json).unwrap();
        book.repair_default();
        assert_eq!(book.default_entry().unwrap().0.as_str(), "a1");
    }

    #[test]
    fn test_normalized_requires_fields() {
        let mut a = addr("  ");
        assert_eq!(
            a.clone().normalized(),
            Err(AddressBookError::MissingField("name"))
        );
        a.full_name = " Ann ".to_owned();
        let a = a.normalized().unwrap();
        assert_eq!(a.full_name, "Ann");
        assert_eq!(a.one_line(), "1 Main St, Springfield");
    }
}
