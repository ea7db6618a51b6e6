//! Catalog domain model for spices and blends.
//!
//! # Responsibility
//! - Define canonical records shared by storage, resolution and callers.
//! - Keep spice attributes opaque so the core never depends on their shape.
//!
//! # Invariants
//! - Every catalog entry is identified by a stable integer id.
//! - A blend only references children by id; it never embeds them.

pub mod blend;
pub mod spice;
