//! System descriptors and the role matcher.
//!
//! A [`System`] wraps a processing callable together with its declared
//! [`RoleSet`] and the per-role membership lists the matcher maintains.
//! Suspendable systems additionally hold in-flight [`Continuation`]s keyed
//! by the exact tuple of role-bound entities.

use std::collections::HashMap;

use tracing::debug;

use ensemble_core::{Attributes, Entity, RoleSet};

use crate::world::World;

/// The result of advancing a continuation by one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work remains; the continuation is retained and advanced again
    /// next tick with the same role-bound arguments.
    Pending,
    /// The work is finished; the continuation's state is discarded and a
    /// later encounter of the same argument tuple starts fresh.
    Done,
}

/// Retained in-flight state for a suspendable system's processing of one
/// specific role combination.
///
/// The dispatch engine advances a continuation by exactly one unit per
/// tick. There is no cancellation: a continuation that never reports
/// [`Step::Done`] runs one step per tick for as long as its argument tuple
/// keeps being produced.
pub trait Continuation {
    /// Performs one unit of work for the given role-bound arguments.
    fn advance(&mut self, world: &mut World, args: &[Entity]) -> Step;
}

/// Closures serve directly as continuations.
impl<F> Continuation for F
where
    F: FnMut(&mut World, &[Entity]) -> Step,
{
    fn advance(&mut self, world: &mut World, args: &[Entity]) -> Step {
        self(world, args)
    }
}

/// The processing callable, in one of its two forms.
pub(crate) enum Process {
    /// Completes a combination's work in a single call.
    Immediate(Box<dyn FnMut(&mut World, &[Entity])>),
    /// Produces a fresh [`Continuation`] for a combination the first time
    /// it is encountered; dispatch advances it once per tick thereafter.
    Suspendable(Box<dyn FnMut(&[Entity]) -> Box<dyn Continuation>>),
}

/// A declared processing unit with named roles.
///
/// Built with [`System::builder`]. The per-role target lists are a derived
/// view maintained by the metasystem — ordered, duplicate-free, and
/// insertion-order-preserving. Attributes remain the source of truth.
pub struct System {
    name: String,
    roles: RoleSet,
    /// Membership lists, parallel to the declared roles.
    targets: Vec<Vec<Entity>>,
    process: Process,
    /// In-flight continuations keyed by the exact argument tuple.
    continuations: HashMap<Vec<Entity>, Box<dyn Continuation>>,
    /// Scheduling hint only: no parallel dispatch is implemented.
    multicore: bool,
}

impl System {
    /// Starts declaring a system.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SystemBuilder {
        SystemBuilder {
            name: name.into(),
            roles: RoleSet::new(),
            multicore: false,
        }
    }

    /// The system's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared role requirement table.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Current members of a role, in registration order.
    #[must_use]
    pub fn targets(&self, role: &str) -> Option<&[Entity]> {
        let index = self.roles.iter().position(|r| r.name == role)?;
        Some(&self.targets[index])
    }

    /// Whether this system asked for parallel dispatch. Carried as a hint;
    /// execution is always sequential.
    #[must_use]
    pub fn multicore(&self) -> bool {
        self.multicore
    }

    /// Whether this system uses the continuation protocol.
    #[must_use]
    pub fn is_suspendable(&self) -> bool {
        matches!(self.process, Process::Suspendable(_))
    }

    /// Number of continuations currently suspended.
    #[must_use]
    pub fn suspended_count(&self) -> usize {
        self.continuations.len()
    }

    // -- Role matcher --

    /// Evaluates an entity against every role and appends it to each role
    /// it qualifies for. Idempotent: an entity already present in a role's
    /// list is never appended twice. One entity may join several roles of
    /// the same system.
    pub(crate) fn register(&mut self, entity: Entity, attributes: &Attributes) {
        for (index, role) in self.roles.iter().enumerate() {
            if role.matched_by(attributes) && !self.targets[index].contains(&entity) {
                self.targets[index].push(entity);
                debug!(
                    system = self.name,
                    role = role.name,
                    %entity,
                    "entity joined role"
                );
            }
        }
    }

    /// Removes an entity from every role's target list and discards any
    /// continuation whose argument tuple mentions it.
    pub(crate) fn unregister(&mut self, entity: Entity) {
        for targets in &mut self.targets {
            targets.retain(|&e| e != entity);
        }
        self.continuations.retain(|args, _| !args.contains(&entity));
    }

    /// Removes an entity from exactly the roles whose requirement set
    /// names the given attribute. Other roles are untouched. Removing an
    /// entity that is not present is a no-op.
    pub(crate) fn unregister_attribute(&mut self, entity: Entity, attribute: &str) {
        for (index, role) in self.roles.iter().enumerate() {
            if role.mentions(attribute) {
                self.targets[index].retain(|&e| e != entity);
            }
        }
    }

    // -- Dispatch support --

    /// Snapshots every role's target list, in declared role order.
    pub(crate) fn target_snapshots(&self) -> Vec<Vec<Entity>> {
        self.targets.clone()
    }

    /// Invokes the processing callable for one role combination, creating
    /// or advancing the combination's continuation for suspendable systems.
    pub(crate) fn invoke(&mut self, world: &mut World, args: &[Entity]) {
        match &mut self.process {
            Process::Immediate(f) => f(world, args),
            Process::Suspendable(factory) => {
                let mut continuation = self
                    .continuations
                    .remove(args)
                    .unwrap_or_else(|| factory(args));
                if continuation.advance(world, args) == Step::Pending {
                    self.continuations.insert(args.to_vec(), continuation);
                }
            }
        }
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("roles", &self.roles)
            .field("targets", &self.targets)
            .field("suspendable", &self.is_suspendable())
            .field("suspended", &self.continuations.len())
            .field("multicore", &self.multicore)
            .finish()
    }
}

/// Builder for [`System`] declarations.
///
/// Role declaration order fixes the dispatch nesting order and the order
/// of the arguments passed to the callable.
#[derive(Debug)]
pub struct SystemBuilder {
    name: String,
    roles: RoleSet,
    multicore: bool,
}

impl SystemBuilder {
    /// Declares a role and the attribute names an entity must possess to
    /// bind to it. An empty requirement set matches every entity.
    #[must_use]
    pub fn role<S, I>(mut self, name: impl Into<String>, requires: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.roles = self.roles.role(name, requires);
        self
    }

    /// Marks the system as wanting parallel dispatch. This is a recorded
    /// hint with no execution semantics.
    #[must_use]
    pub fn multicore(mut self, multicore: bool) -> Self {
        self.multicore = multicore;
        self
    }

    /// Finishes the declaration with a plain processing callable, invoked
    /// once per eligible role combination per tick.
    #[must_use]
    pub fn process<F>(self, f: F) -> System
    where
        F: FnMut(&mut World, &[Entity]) + 'static,
    {
        self.build(Process::Immediate(Box::new(f)))
    }

    /// Finishes the declaration with a suspendable process. The factory is
    /// called the first time a role combination is dispatched; the
    /// returned [`Continuation`] is then advanced one unit per tick until
    /// it reports [`Step::Done`].
    #[must_use]
    pub fn suspendable<F>(self, factory: F) -> System
    where
        F: FnMut(&[Entity]) -> Box<dyn Continuation> + 'static,
    {
        self.build(Process::Suspendable(Box::new(factory)))
    }

    fn build(self, process: Process) -> System {
        let targets = vec![Vec::new(); self.roles.len()];
        System {
            name: self.name,
            roles: self.roles,
            targets,
            process,
            continuations: HashMap::new(),
            multicore: self.multicore,
        }
    }
}
