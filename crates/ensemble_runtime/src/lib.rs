//! # ensemble_runtime
//!
//! A reactive entity–component runtime. Systems declare named roles with
//! attribute requirements; the runtime keeps every role's membership list
//! consistent with entity attributes as they change, and one tick runs
//! every system over the Cartesian product of its role memberships.
//!
//! ```rust
//! use serde_json::json;
//! use ensemble_runtime::{Metasystem, System};
//!
//! let mut ms = Metasystem::new();
//!
//! ms.add_system(
//!     System::builder("greeter")
//!         .role("subject", ["name"])
//!         .process(|world, args| {
//!             let name = world.get_str(args[0], "name").unwrap().to_string();
//!             world.set_attribute(args[0], "greeting", json!(format!("hi, {name}"))).ok();
//!         }),
//! );
//!
//! let eric = ms.create([("name", json!("Eric"))]);
//! ms.update();
//! assert_eq!(ms.world().get_str(eric, "greeting"), Some("hi, Eric"));
//! ```
//!
//! The runtime is single-threaded, cooperative, and synchronous: no
//! operation blocks, and one `update()` performs one bounded pass over
//! every registered system. Long-running per-combination behavior is
//! expressed through the [`Continuation`] protocol instead of blocking.

mod dispatch;
pub mod metasystem;
pub mod system;
pub mod tick;
pub mod world;

pub use ensemble_core::{Attributes, Entity, Role, RoleSet};
pub use metasystem::{Metasystem, OwnershipError};
pub use system::{Continuation, Step, System, SystemBuilder};
pub use tick::{TickConfig, TickLoop};
pub use world::{World, WorldError};
