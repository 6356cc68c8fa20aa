//! Attribute store — the source of truth for entity state.
//!
//! The [`World`] owns every live entity's attribute bag. Membership lists
//! held by systems are a derived, cached view; whenever the name set of a
//! bag changes, the store queues a reactive event that the metasystem
//! drains to bring membership back in line with attributes.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use ensemble_core::{Attributes, Entity};

/// Errors from attribute store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// The entity is not live in this store.
    #[error("entity {0} not found")]
    EntityNotFound(Entity),
    /// The entity does not carry the requested attribute.
    #[error("attribute '{0}' not found on entity {1}")]
    AttributeNotFound(String, Entity),
}

/// A change to an entity's attribute *name set* (or its lifetime), queued
/// for the metasystem to translate into membership updates.
///
/// Overwriting an existing attribute's value produces no event: membership
/// is name-based, not value-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReactiveEvent {
    /// The entity entered the store; it must be evaluated against every
    /// role of every system (empty requirement sets match it too).
    Adopted(Entity),
    /// The entity gained an attribute it did not have before.
    Added { entity: Entity, attribute: String },
    /// The entity lost an attribute.
    Removed { entity: Entity, attribute: String },
    /// The entity left the store entirely.
    Despawned(Entity),
}

/// The attribute store.
///
/// Processing callables receive `&mut World` during dispatch and may read
/// and mutate freely; structural changes they make take effect on
/// membership when the metasystem flushes, after the owning system's pass.
#[derive(Debug, Default)]
pub struct World {
    entities: HashMap<Entity, Attributes>,
    pending: Vec<ReactiveEvent>,
}

impl World {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Entity lifecycle --

    /// Spawns a fresh entity with the given initial attributes.
    pub fn spawn(&mut self, attributes: impl Into<Attributes>) -> Entity {
        let entity = Entity::new();
        // Fresh ids cannot collide, so adoption cannot fail here.
        let adopted = self.adopt(entity, attributes.into());
        debug_assert!(adopted);
        entity
    }

    /// Places an existing entity into the store with the given attributes,
    /// claiming its process-wide ownership record.
    ///
    /// Returns `false` (and changes nothing) if the entity is already
    /// owned, by this store or any other.
    pub(crate) fn adopt(&mut self, entity: Entity, attributes: Attributes) -> bool {
        if !entity.claim() {
            return false;
        }
        self.pending.push(ReactiveEvent::Adopted(entity));
        self.entities.insert(entity, attributes);
        true
    }

    /// Removes an entity and all its attributes from the store, releasing
    /// its ownership record.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), WorldError> {
        if self.entities.remove(&entity).is_none() {
            return Err(WorldError::EntityNotFound(entity));
        }
        entity.release();
        self.pending.push(ReactiveEvent::Despawned(entity));
        Ok(())
    }

    /// Returns `true` if the entity is live in this store.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns all live entity ids.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.keys().copied().collect()
    }

    // -- Attribute operations --

    /// Sets an attribute on an entity.
    ///
    /// First-time names queue a reactive registration event; overwriting an
    /// existing name does not.
    pub fn set_attribute(
        &mut self,
        entity: Entity,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), WorldError> {
        let attrs = self
            .entities
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        let name = name.into();
        if attrs.insert(name.clone(), value) {
            self.pending.push(ReactiveEvent::Added {
                entity,
                attribute: name,
            });
        }
        Ok(())
    }

    /// Gets an attribute value. Errors if the entity or attribute is absent.
    pub fn get_attribute(&self, entity: Entity, name: &str) -> Result<&Value, WorldError> {
        let attrs = self
            .entities
            .get(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        attrs
            .get(name)
            .ok_or_else(|| WorldError::AttributeNotFound(name.to_string(), entity))
    }

    /// Mutable access to an attribute value.
    ///
    /// In-place mutation never changes the name set, so it has no
    /// registration side effects.
    pub fn get_attribute_mut(
        &mut self,
        entity: Entity,
        name: &str,
    ) -> Result<&mut Value, WorldError> {
        let attrs = self
            .entities
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        attrs
            .get_mut(name)
            .ok_or_else(|| WorldError::AttributeNotFound(name.to_string(), entity))
    }

    /// Gets an attribute value, or the given default when the entity or
    /// attribute is absent. The non-raising accessor.
    #[must_use]
    pub fn attribute_or(&self, entity: Entity, name: &str, default: Value) -> Value {
        self.get_attribute(entity, name).cloned().unwrap_or(default)
    }

    /// Typed accessor: the attribute as an `f64`, if present and numeric.
    #[must_use]
    pub fn get_f64(&self, entity: Entity, name: &str) -> Option<f64> {
        self.get_attribute(entity, name).ok()?.as_f64()
    }

    /// Typed accessor: the attribute as a `bool`, if present and boolean.
    #[must_use]
    pub fn get_bool(&self, entity: Entity, name: &str) -> Option<bool> {
        self.get_attribute(entity, name).ok()?.as_bool()
    }

    /// Typed accessor: the attribute as a `&str`, if present and a string.
    #[must_use]
    pub fn get_str(&self, entity: Entity, name: &str) -> Option<&str> {
        self.get_attribute(entity, name).ok()?.as_str()
    }

    /// Returns `true` if the entity is live and carries the attribute.
    #[must_use]
    pub fn has_attribute(&self, entity: Entity, name: &str) -> bool {
        self.entities
            .get(&entity)
            .map(|a| a.contains(name))
            .unwrap_or(false)
    }

    /// Removes an attribute from an entity, returning its value.
    ///
    /// Queues a reactive event so the entity leaves every role whose
    /// requirements name the attribute.
    pub fn remove_attribute(&mut self, entity: Entity, name: &str) -> Result<Value, WorldError> {
        let attrs = self
            .entities
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        let value = attrs
            .remove(name)
            .ok_or_else(|| WorldError::AttributeNotFound(name.to_string(), entity))?;
        self.pending.push(ReactiveEvent::Removed {
            entity,
            attribute: name.to_string(),
        });
        Ok(value)
    }

    /// Returns an entity's full attribute bag.
    pub fn attributes(&self, entity: Entity) -> Result<&Attributes, WorldError> {
        self.entities
            .get(&entity)
            .ok_or(WorldError::EntityNotFound(entity))
    }

    // -- Reactive event queue --

    /// Drains the queued reactive events.
    pub(crate) fn take_events(&mut self) -> Vec<ReactiveEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Returns `true` if reactive events are waiting to be flushed.
    pub(crate) fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Dropping the store releases the ownership record of every entity
/// still live in it.
impl Drop for World {
    fn drop(&mut self) {
        for entity in self.entities.keys() {
            entity.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_spawn_and_get() {
        let mut world = World::new();
        let e = world.spawn([("name", json!("Eric"))]);
        assert!(world.contains(e));
        assert_eq!(world.get_attribute(e, "name").unwrap(), &json!("Eric"));
    }

    #[test]
    fn test_spawn_queues_adopted_event() {
        let mut world = World::new();
        let e = world.spawn([("x", json!(0)), ("y", json!(0))]);
        assert_eq!(world.take_events(), vec![ReactiveEvent::Adopted(e)]);
    }

    #[test]
    fn test_overwrite_queues_nothing() {
        let mut world = World::new();
        let e = world.spawn([("x", json!(0))]);
        world.take_events();

        world.set_attribute(e, "x", json!(99)).unwrap();
        assert!(!world.has_pending_events());
        assert_eq!(world.get_f64(e, "x"), Some(99.0));
    }

    #[test]
    fn test_first_time_set_queues_added() {
        let mut world = World::new();
        let e = world.spawn(Attributes::new());
        world.take_events();

        world.set_attribute(e, "flag", json!(true)).unwrap();
        assert_eq!(
            world.take_events(),
            vec![ReactiveEvent::Added {
                entity: e,
                attribute: "flag".to_string()
            }]
        );
    }

    #[test]
    fn test_remove_attribute_queues_removed() {
        let mut world = World::new();
        let e = world.spawn([("flag", json!(true))]);
        world.take_events();

        let value = world.remove_attribute(e, "flag").unwrap();
        assert_eq!(value, json!(true));
        assert_eq!(
            world.take_events(),
            vec![ReactiveEvent::Removed {
                entity: e,
                attribute: "flag".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_attribute_errors() {
        let mut world = World::new();
        let e = world.spawn(Attributes::new());
        assert_eq!(
            world.get_attribute(e, "ghost"),
            Err(WorldError::AttributeNotFound("ghost".to_string(), e))
        );
        assert_eq!(
            world.remove_attribute(e, "ghost"),
            Err(WorldError::AttributeNotFound("ghost".to_string(), e))
        );
    }

    #[test]
    fn test_defaulted_lookup() {
        let mut world = World::new();
        let e = world.spawn(Attributes::new());
        assert_eq!(world.attribute_or(e, "missing", json!(null)), json!(null));
        world.set_attribute(e, "missing", json!(5)).unwrap();
        assert_eq!(world.attribute_or(e, "missing", json!(null)), json!(5));
    }

    #[test]
    fn test_despawn() {
        let mut world = World::new();
        let e = world.spawn([("name", json!("Red"))]);
        world.take_events();

        world.despawn(e).unwrap();
        assert!(!world.contains(e));
        assert_eq!(world.take_events(), vec![ReactiveEvent::Despawned(e)]);
        assert_eq!(world.despawn(e), Err(WorldError::EntityNotFound(e)));
    }

    #[test]
    fn test_adopt_refuses_entity_owned_elsewhere() {
        let mut first = World::new();
        let mut second = World::new();
        let e = first.spawn([("name", json!("Eric"))]);

        assert!(!second.adopt(e, Attributes::new()));
        assert!(!second.contains(e));
        assert!(!second.has_pending_events());

        // Despawning releases ownership; the entity may then move.
        first.despawn(e).unwrap();
        assert!(second.adopt(e, Attributes::new()));
    }

    #[test]
    fn test_drop_releases_ownership() {
        let e = {
            let mut world = World::new();
            world.spawn(Attributes::new())
        };
        assert!(!e.is_owned());
    }

    #[test]
    fn test_has_attribute() {
        let mut world = World::new();
        let e = world.spawn([("flag", json!(false))]);

        assert!(world.has_attribute(e, "flag"));
        assert!(!world.has_attribute(e, "ghost"));

        world.despawn(e).unwrap();
        assert!(!world.has_attribute(e, "flag"));
    }

    #[test]
    fn test_mutation_on_unknown_entity_errors() {
        let mut world = World::new();
        let stranger = Entity::new();
        assert_eq!(
            world.set_attribute(stranger, "x", json!(1)),
            Err(WorldError::EntityNotFound(stranger))
        );
        assert!(!world.has_pending_events());
    }

    #[test]
    fn test_in_place_mutation_has_no_events() {
        let mut world = World::new();
        let e = world.spawn([("pairs", json!([]))]);
        world.take_events();

        world
            .get_attribute_mut(e, "pairs")
            .unwrap()
            .as_array_mut()
            .unwrap()
            .push(json!("Eric & Red"));
        assert!(!world.has_pending_events());
        assert_eq!(world.get_attribute(e, "pairs").unwrap(), &json!(["Eric & Red"]));
    }
}
