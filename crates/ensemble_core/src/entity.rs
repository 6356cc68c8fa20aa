//! Entity type and allocation.
//!
//! An [`Entity`] is a lightweight `u64` identifier with no inherent data.
//! Attributes are attached to entities through a metasystem's store; the
//! identifier itself only provides stable identity. A process-wide
//! ownership record enforces that an entity is live in at most one store
//! at a time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Process-wide id counter. Ids start at 1 and are never reused.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide set of ids currently owned by some store.
static OWNED: LazyLock<Mutex<HashSet<u64>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

fn owned() -> MutexGuard<'static, HashSet<u64>> {
    OWNED.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A unique entity identifier.
///
/// Entities are pure identifiers — they carry no data of their own.
/// Membership in system roles is decided by the attributes attached to an
/// entity, never by the identifier value.
///
/// Ids are allocated from a process-wide counter so an entity can be
/// created before any metasystem exists and added to one later. Two
/// entities compare equal exactly when they are the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// Allocates a fresh, globally unique entity id.
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Records this entity as owned by a store. Returns `false` if it is
    /// already owned anywhere in the process.
    #[must_use]
    pub fn claim(self) -> bool {
        owned().insert(self.0)
    }

    /// Clears this entity's ownership record. A no-op if unowned.
    pub fn release(self) {
        owned().remove(&self.0);
    }

    /// Returns `true` if any store in the process currently owns this
    /// entity. The any-runtime membership query.
    #[must_use]
    pub fn is_owned(self) -> bool {
        owned().contains(&self.0)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entities_are_unique() {
        let e1 = Entity::new();
        let e2 = Entity::new();
        let e3 = Entity::new();
        assert_ne!(e1, e2);
        assert_ne!(e2, e3);
        assert_ne!(e1, e3);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let e1 = Entity::new();
        let e2 = Entity::new();
        assert!(e2.id() > e1.id());
    }

    #[test]
    fn test_identity_not_structure() {
        // Copies of the same id are the same entity.
        let e = Entity::new();
        let copy = e;
        assert_eq!(e, copy);
    }

    #[test]
    fn test_display() {
        let e = Entity(42);
        assert_eq!(e.to_string(), "Entity(42)");
    }

    #[test]
    fn test_claim_is_exclusive() {
        let e = Entity::new();
        assert!(!e.is_owned());

        assert!(e.claim());
        assert!(e.is_owned());
        assert!(!e.claim(), "a second claim must fail while owned");

        e.release();
        assert!(!e.is_owned());
        assert!(e.claim(), "a released entity can be claimed again");
        e.release();
    }
}
