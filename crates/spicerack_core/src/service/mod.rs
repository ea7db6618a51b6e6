//! Core use-case services.
//!
//! # Responsibility
//! - Resolve blend graphs into their spices (`blend_resolver`).
//! - Orchestrate catalog reads and writes (`catalog_service`).
//!
//! # See also
//! - `repo::store` for the lookup contracts resolution depends on.

pub mod blend_resolver;
pub mod catalog_service;
pub mod resolution;
