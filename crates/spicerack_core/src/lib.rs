//! Core catalog logic for spicerack.
//! Blends nest spices and other blends; this crate resolves a blend into the
//! full, deduplicated set of spices it contains.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use model::blend::{Blend, BlendId, BlendValidationError};
pub use model::spice::{Spice, SpiceAttributes, SpiceId, SpiceValidationError};
pub use repo::catalog_repo::{
    CatalogError, CatalogRepository, CatalogResult, CatalogSeed, NewBlend, SqliteCatalog,
    FIRST_CREATED_BLEND_ID,
};
pub use repo::store::{BlendStore, SpiceStore, StoreError, StoreResult};
pub use service::blend_resolver::{BlendResolver, ResolveError, ResolverConfig};
pub use service::catalog_service::CatalogService;
pub use service::resolution::{ResolutionResult, RootStatus};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
