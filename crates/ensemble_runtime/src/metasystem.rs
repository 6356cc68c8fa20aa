//! Metasystem — the root registry and dispatcher.
//!
//! The metasystem owns the attribute store and every registered system.
//! All entity and attribute mutations route through it (directly, or via
//! the reactive event queue when a processing callable mutates the store
//! mid-tick), so membership lists always converge to the current
//! attributes. One [`Metasystem::update`] call is one external tick: every
//! registered system runs its full combinatorial pass exactly once, in
//! registration order.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use ensemble_core::{Attributes, Entity};

use crate::dispatch;
use crate::system::System;
use crate::world::{ReactiveEvent, World, WorldError};

/// Ownership violations. Fatal to the offending call only; the runtime's
/// state is unchanged by a failed `add` or `delete`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    /// The entity is already owned by a metasystem, this one or another.
    #[error("entity {0} already belongs to a metasystem")]
    AlreadyOwned(Entity),
    /// The entity is not live in this metasystem.
    #[error("entity {0} does not belong to this metasystem")]
    NotOwned(Entity),
}

/// The root registry/dispatcher: a system-of-systems plus the entity
/// registration entry point.
#[derive(Debug, Default)]
pub struct Metasystem {
    world: World,
    /// The metasystem's own "system" role membership, in registration order.
    systems: Vec<System>,
    tick_id: u64,
}

impl Metasystem {
    /// Constructs an empty runtime. No configuration parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- System registration --

    /// Registers a system and immediately evaluates every live entity
    /// against its roles.
    pub fn add_system(&mut self, mut system: System) {
        for entity in self.world.entities() {
            if let Ok(attributes) = self.world.attributes(entity) {
                system.register(entity, attributes);
            }
        }
        info!(
            system = system.name(),
            roles = system.roles().len(),
            multicore = system.multicore(),
            "system registered"
        );
        self.systems.push(system);
    }

    /// Looks up a registered system by name.
    #[must_use]
    pub fn system(&self, name: &str) -> Option<&System> {
        self.systems.iter().find(|s| s.name() == name)
    }

    /// Iterates registered systems in registration order.
    pub fn systems(&self) -> impl Iterator<Item = &System> {
        self.systems.iter()
    }

    // -- Entity lifecycle --

    /// Creates an entity owned by this metasystem and registers it against
    /// every system.
    pub fn create(&mut self, attributes: impl Into<Attributes>) -> Entity {
        let entity = self.world.spawn(attributes);
        self.flush();
        entity
    }

    /// Adds an existing entity with the given initial attributes.
    ///
    /// An entity belongs to at most one metasystem at a time. Fails with
    /// [`OwnershipError::AlreadyOwned`] if the entity is already owned,
    /// by this metasystem or any other; nothing changes in that case.
    pub fn add(
        &mut self,
        entity: Entity,
        attributes: impl Into<Attributes>,
    ) -> Result<Entity, OwnershipError> {
        if !self.world.adopt(entity, attributes.into()) {
            return Err(OwnershipError::AlreadyOwned(entity));
        }
        self.flush();
        Ok(entity)
    }

    /// Deletes an entity, purging it from every role of every system and
    /// releasing its ownership record.
    ///
    /// Fails with [`OwnershipError::NotOwned`] if the entity is not live
    /// here. Subsequent mutations of the deleted entity are store errors
    /// and have no effect on any system.
    pub fn delete(&mut self, entity: Entity) -> Result<(), OwnershipError> {
        self.world
            .despawn(entity)
            .map_err(|_| OwnershipError::NotOwned(entity))?;
        self.flush();
        Ok(())
    }

    /// Membership query: does the entity currently belong to this runtime?
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    // -- Attribute facade --

    /// Sets an attribute; a first-time name re-registers the entity against
    /// every system mentioning that name before this call returns.
    pub fn set_attribute(
        &mut self,
        entity: Entity,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), WorldError> {
        self.world.set_attribute(entity, name, value)?;
        self.flush();
        Ok(())
    }

    /// Removes an attribute; the entity leaves every role requiring that
    /// name before this call returns.
    pub fn remove_attribute(&mut self, entity: Entity, name: &str) -> Result<Value, WorldError> {
        let value = self.world.remove_attribute(entity, name)?;
        self.flush();
        Ok(value)
    }

    /// Gets an attribute value (the raising accessor).
    pub fn get_attribute(&self, entity: Entity, name: &str) -> Result<&Value, WorldError> {
        self.world.get_attribute(entity, name)
    }

    /// Read access to the attribute store.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    // -- Tick --

    /// Advances the whole runtime by one step: runs every registered
    /// system's combinatorial pass exactly once, in registration order,
    /// applying reactive membership updates between systems.
    pub fn update(&mut self) {
        self.tick_id += 1;
        debug!(
            tick = self.tick_id,
            systems = self.systems.len(),
            entities = self.world.entity_count(),
            "tick start"
        );

        self.flush();
        for index in 0..self.systems.len() {
            dispatch::run_system(&mut self.world, &mut self.systems[index]);
            self.flush();
        }
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    // -- Reactive registration --

    /// Drains queued attribute events and brings every system's membership
    /// lists back in line with current attributes.
    fn flush(&mut self) {
        if !self.world.has_pending_events() {
            return;
        }
        for event in self.world.take_events() {
            match event {
                ReactiveEvent::Adopted(entity) => {
                    if let Ok(attributes) = self.world.attributes(entity) {
                        for system in &mut self.systems {
                            system.register(entity, attributes);
                        }
                    }
                }
                ReactiveEvent::Added { entity, attribute } => {
                    // The entity may already be gone again; skip if so.
                    if let Ok(attributes) = self.world.attributes(entity) {
                        for system in &mut self.systems {
                            if system.roles().mentions(&attribute) {
                                system.register(entity, attributes);
                            }
                        }
                    }
                }
                ReactiveEvent::Removed { entity, attribute } => {
                    for system in &mut self.systems {
                        system.unregister_attribute(entity, &attribute);
                    }
                }
                ReactiveEvent::Despawned(entity) => {
                    for system in &mut self.systems {
                        system.unregister(entity);
                    }
                }
            }
        }
    }
}
