//! Shared types used across the codebase

use serde::{Deserialize, Deserializer};

/// Tri-state field for partial updates.
///
/// A field left out of the request body is `Unchanged`, an explicit JSON
/// `null` is `Clear`, anything else is `Set`. Fields using this type must be
/// marked `#[serde(default)]` so that absence maps to `Unchanged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unchanged
    }
}

impl<T> Patch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    /// SQL-friendly split: (should write, new value)
    pub fn into_sql(self) -> (bool, Option<T>) {
        match self {
            Patch::Unchanged => (false, None),
            Patch::Clear => (true, None),
            Patch::Set(value) => (true, Some(value)),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}
