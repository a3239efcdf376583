//! Newtype IDs for type-safe entity references.
//!
//! Every record in the realtime database lives under a string key, so IDs wrap
//! a `String`. Use the `define_id!` macro to create wrappers that prevent
//! accidentally mixing keys from different collections.

/// Characters the realtime database forbids inside a key.
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Maximum key length accepted by the realtime database (in bytes).
pub const MAX_KEY_LENGTH: usize = 768;

/// Errors that can occur when validating a database key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key is empty or whitespace.
    #[error("key cannot be empty")]
    Empty,
    /// The key is longer than the database allows.
    #[error("key must be at most {MAX_KEY_LENGTH} bytes")]
    TooLong,
    /// The key contains a character reserved for paths.
    #[error("key contains forbidden character '{0}'")]
    ForbiddenChar(char),
}

/// Check that `key` is usable as a single path segment.
///
/// # Errors
///
/// Returns a [`KeyError`] if the key is empty, too long, or contains one of
/// `/ . # $ [ ]` or an ASCII control character.
pub fn validate_key(key: &str) -> Result<(), KeyError> {
    if key.trim().is_empty() {
        return Err(KeyError::Empty);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(KeyError::TooLong);
    }
    if let Some(c) = key
        .chars()
        .find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_ascii_control())
    {
        return Err(KeyError::ForbiddenChar(c));
    }
    Ok(())
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`, `Default`
/// - `new()` (unchecked), `parse()` (validated as a database key), `as_str()`,
///   `is_empty()`
/// - `Display`, `From<String>`, `From<&str>`, `AsRef<str>`
///
/// # Example
///
/// ```rust
/// # use shopfront_core::define_id;
/// define_id!(WidgetId);
/// define_id!(GadgetId);
///
/// let widget = WidgetId::parse("w1").unwrap();
/// assert!(WidgetId::parse("../w1").is_err());
///
/// // These are different types, so this won't compile:
/// // let _: GadgetId = widget;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a key without validation (keys read back from the database).
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Parse a key supplied from outside (forms, URLs, files).
            ///
            /// # Errors
            ///
            /// Returns a [`KeyError`]($crate::types::id::KeyError) if the value
            /// cannot be used as a database key.
            pub fn parse(id: &str) -> ::core::result::Result<Self, $crate::types::id::KeyError> {
                let id = id.trim();
                $crate::types::id::validate_key(id)?;
                Ok(Self(id.to_owned()))
            }

            /// Get the underlying key.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True for the default (not yet assigned) key.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(OrderId);
define_id!(UserId);
define_id!(AddressId);

impl AddressId {
    /// Generate a fresh, time-ordered key for a new address.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().simple().to_string())
    }
}
