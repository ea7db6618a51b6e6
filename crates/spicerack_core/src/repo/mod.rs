//! Store contracts and the SQLite-backed catalog.
//!
//! # Responsibility
//! - Define the read contracts the resolver fetches through (`store`).
//! - Provide an in-process catalog implementing those contracts
//!   (`catalog_repo`).
//!
//! # Invariants
//! - Store reads are idempotent and side-effect free.
//! - A missing entry is `Ok(None)`, never an error.

pub mod catalog_repo;
pub mod store;
