//! Role requirement tables.
//!
//! A system declares, for each of its named roles, the set of attribute
//! names an entity must possess to qualify for that role. The table is
//! built once at declaration time; the runtime only ever reads it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;

/// A named parameter slot of a system with its attribute requirements.
///
/// An empty requirement set is legal and matches every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// The role name (becomes the binding position in dispatch).
    pub name: String,
    /// Attribute names an entity must possess to qualify.
    pub requires: BTreeSet<String>,
}

impl Role {
    /// Creates a role from a name and its required attribute names.
    #[must_use]
    pub fn new<S, I>(name: impl Into<String>, requires: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Self {
            name: name.into(),
            requires: requires.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if the given attribute bag satisfies this role.
    ///
    /// Matching is presence-only: values are never inspected.
    #[must_use]
    pub fn matched_by(&self, attributes: &Attributes) -> bool {
        self.requires.iter().all(|name| attributes.contains(name))
    }

    /// Returns `true` if this role's requirement set names the attribute.
    #[must_use]
    pub fn mentions(&self, attribute: &str) -> bool {
        self.requires.contains(attribute)
    }
}

/// An ordered collection of [`Role`]s.
///
/// Declaration order matters: it fixes the nesting order of the dispatch
/// engine's Cartesian product (first declared role varies slowest) and the
/// order of role-bound arguments passed to the processing callable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    roles: Vec<Role>,
}

impl RoleSet {
    /// Creates an empty role set.
    ///
    /// A system with zero roles is legal: its callable runs exactly once
    /// per tick with no bound entities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role. Declaration order is preserved.
    #[must_use]
    pub fn role<S, I>(mut self, name: impl Into<String>, requires: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.roles.push(Role::new(name, requires));
        self
    }

    /// Iterates roles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }

    /// Number of declared roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns `true` if no roles are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns the role at the given declaration position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Role> {
        self.roles.get(index)
    }

    /// Finds a role by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Returns `true` if any role's requirement set names the attribute.
    #[must_use]
    pub fn mentions(&self, attribute: &str) -> bool {
        self.roles.iter().any(|r| r.mentions(attribute))
    }
}
