//! Access to the hosted realtime database.
//!
//! # Tree layout
//!
//! ```text
//! products/{productId}          Product
//! orders/{orderId}              Order (push key)
//! users/{uid}                   UserProfile
//! users/{uid}/addresses/{id}    SavedAddress
//! users/{uid}/cart/{productId}  CartLine
//! promoCodes/{CODE}             PromoCode
//! ```
//!
//! The [`Database`] trait mirrors the operations the hosted service offers:
//! path-addressed read/write/patch/push/delete plus a single-key conditional
//! update ([`Database::transaction`]). Nothing spans more than one key
//! atomically. [`MemoryDatabase`] backs tests and local development; the
//! REST client lives behind the `remote` feature.
//!
//! Typed repositories (`ProductRepository`, `OrderRepository`, ...) sit on top
//! and are what the applications use.

pub mod memory;
pub mod orders;
pub mod paths;
pub mod products;
pub mod promos;
#[cfg(feature = "remote")]
pub mod rest;
pub mod users;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryDatabase;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use promos::PromoRepository;
#[cfg(feature = "remote")]
pub use rest::RestDatabase;
pub use users::UserRepository;

/// Errors raised by a [`Database`] implementation.
#[derive(Debug, Error)]
pub enum DbError {
    /// Security rules or credentials refused the operation.
    #[error("permission denied at {path}")]
    PermissionDenied { path: String },

    /// The HTTP request could not be completed.
    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service could not be reached or replied with garbage.
    #[error("transport error: {0}")]
    Transport(String),

    /// A value could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A path segment is not a valid key.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The conditional update kept losing races.
    #[error("transaction at {path} gave up after {attempts} attempts")]
    TooManyRetries { path: String, attempts: u32 },

    /// The service answered with an unexpected status.
    #[error("unexpected response {status}: {body}")]
    Unexpected { status: u16, body: String },
}

impl DbError {
    /// Whether the error is a configuration problem rather than a transient one.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Outcome of a transaction update function.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Write this value (`Null` deletes the key).
    Commit(Value),
    /// Leave the stored value untouched.
    Abort,
}

/// Result of [`Database::transaction`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionResult {
    /// Whether the update function's value was written.
    pub committed: bool,
    /// The value stored at the path after the transaction.
    pub value: Option<Value>,
}

/// Update function passed to [`Database::transaction`].
///
/// Called with the current value (absent keys are `None`); may be called more
/// than once when the underlying store retries.
pub type UpdateFn<'a> = dyn Fn(Option<&Value>) -> Transition + Send + Sync + 'a;

/// A path-addressed JSON tree.
///
/// Paths are `/`-separated keys without leading or trailing slashes; the
/// empty path is the root. Writing `Null` or an empty object deletes.
#[async_trait]
pub trait Database: Send + Sync {
    /// Read the value at `path`, `None` when absent.
    async fn read(&self, path: &str) -> Result<Option<Value>, DbError>;

    /// Replace the value at `path`.
    async fn write(&self, path: &str, value: Value) -> Result<(), DbError>;

    /// Write several children of `path` at once. Keys may be nested
    /// (`"a/b"`); `Null` values delete.
    async fn patch(&self, path: &str, updates: BTreeMap<String, Value>) -> Result<(), DbError>;

    /// Insert `value` under a new time-ordered key below `path` and return
    /// the key.
    async fn push(&self, path: &str, value: Value) -> Result<String, DbError>;

    /// Delete the value at `path`. Deleting an absent key succeeds.
    async fn delete(&self, path: &str) -> Result<(), DbError>;

    /// Atomically read-modify-write a single key.
    async fn transaction(
        &self,
        path: &str,
        update: &UpdateFn<'_>,
    ) -> Result<TransactionResult, DbError>;
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Error from the database client.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The write conflicts with existing data.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    pub(crate) fn corrupt(path: &str, err: &serde_json::Error) -> Self {
        Self::DataCorruption(format!("{path}: {err}"))
    }
}

/// Decode a stored value, reporting the path on failure.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    path: &str,
    value: Value,
) -> Result<T, RepositoryError> {
    serde_json::from_value(value).map_err(|e| RepositoryError::corrupt(path, &e))
}

/// Decode every child of a collection object, skipping malformed entries.
///
/// Returns `(key, record)` pairs in key order.
pub(crate) fn decode_children<T: serde::de::DeserializeOwned>(
    path: &str,
    value: Option<Value>,
) -> Vec<(String, T)> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    map.into_iter()
        .filter_map(|(key, child)| match serde_json::from_value(child) {
            Ok(record) => Some((key, record)),
            Err(e) => {
                tracing::warn!(path, key = %key, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

/// Check that the database answers reads (used by readiness probes).
///
/// # Errors
///
/// Returns the underlying [`DbError`].
pub async fn ping(db: &dyn Database) -> Result<(), DbError> {
    db.read(paths::PING).await.map(|_| ())
}
