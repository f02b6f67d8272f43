use serde::Serialize;

use super::error::FileError;
use super::record::FileEntity;
use super::relation::{Cardinality, FileRelation};

/// Polymorphic link from a file to the entity that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OwnerRef {
    pub owner_type: String,
    pub owner_id: String,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
        }
    }
}

/// An entity that can own files.
///
/// Loading the concrete owner back from an [`OwnerRef`] is left to the
/// caller, keyed on `owner_type`.
pub trait Owner: Send + Sync {
    /// Stable discriminator stored in `owner_type`.
    fn owner_type(&self) -> &str;

    /// Primary key rendered as a string.
    fn owner_key(&self) -> String;

    /// Table backing the owner. Used for the default storage directory.
    fn table_name(&self) -> &str {
        self.owner_type()
    }

    fn owner_ref(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type(), self.owner_key())
    }
}

/// Relation constructors for every [`Owner`].
pub trait HasFiles: Owner + Sized {
    /// Files of `R` attached to `self` under `collection`.
    fn has_many_files<R: FileEntity>(
        &self,
        collection: &str,
    ) -> Result<FileRelation<'_, Self>, FileError> {
        FileRelation::new::<R>(self, collection, Cardinality::Many)
    }

    /// Single file of `R` attached to `self` under `collection`.
    fn has_file<R: FileEntity>(
        &self,
        collection: &str,
    ) -> Result<FileRelation<'_, Self>, FileError> {
        FileRelation::new::<R>(self, collection, Cardinality::One)
    }
}

impl<T: Owner> HasFiles for T {}

/// `BlogPosts` -> `blog_posts`, `HTTPLog` -> `http_log`.
pub fn to_snake_case(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
