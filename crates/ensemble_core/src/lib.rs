//! # ensemble_core
//!
//! Leaf primitives for the ensemble reactive entity–component runtime.
//!
//! This crate provides:
//!
//! - [`Entity`] — lightweight `u64` entity identifiers.
//! - [`Attributes`] — the open, name-keyed attribute bag entities carry.
//! - [`Role`] / [`RoleSet`] — declarative attribute requirements for
//!   systems, built once at declaration time.
//!
//! The runtime itself (attribute store, dispatch, metasystem) lives in
//! `ensemble_runtime`; this crate is deliberately free of behavior beyond
//! identity and matching.

pub mod attributes;
pub mod entity;
pub mod role;

pub use attributes::Attributes;
pub use entity::Entity;
pub use role::{Role, RoleSet};
