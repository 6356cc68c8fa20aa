//! The attribute bag.
//!
//! Attributes are an open, insertion-irrelevant mapping from name to an
//! arbitrary JSON value. Attribute *presence* drives system membership;
//! values are opaque to the runtime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named-attribute bag.
///
/// Insert and remove report whether the *name set* changed, which is what
/// the reactive registration protocol cares about: overwriting an existing
/// attribute's value must not re-trigger registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    values: HashMap<String, Value>,
}

impl Attributes {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute. Returns `true` if the name was not present before.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> bool {
        self.values.insert(name.into(), value).is_none()
    }

    /// Removes an attribute. Returns its value if the name was present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Returns the value of an attribute, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns a mutable reference to an attribute's value, if present.
    ///
    /// In-place value mutation never changes the name set.
    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    /// Returns `true` if the bag contains an attribute with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterates `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attributes in the bag.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the bag holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[(&str, Value); N]> for Attributes {
    fn from(pairs: [(&str, Value); N]) -> Self {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}
