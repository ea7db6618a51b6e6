//! Catalog use-case service.
//!
//! # Responsibility
//! - Provide list/get/create entry points over a catalog repository.
//! - Normalize caller input before it reaches storage.
//!
//! # Invariants
//! - Created blends get the next free id; callers never choose it.
//! - Service layer remains storage-agnostic.

use crate::model::blend::{Blend, BlendId};
use crate::model::spice::{Spice, SpiceId};
use crate::repo::catalog_repo::{CatalogRepository, CatalogResult, NewBlend};
use log::info;

/// Use-case wrapper around a [`CatalogRepository`].
pub struct CatalogService<R: CatalogRepository> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a blend under a freshly assigned id.
    ///
    /// # Contract
    /// - Name and description are trimmed; a blank description is dropped.
    /// - Child id lists are stored as given, including ids that do not exist.
    /// - Returns the stored blend with its assigned id.
    pub fn create_blend(&self, request: NewBlend) -> CatalogResult<Blend> {
        let request = NewBlend {
            name: request.name.trim().to_string(),
            description: request
                .description
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            ..request
        };

        let blend = self.repo.create_blend(request)?;
        info!(
            "event=blend_create module=catalog status=ok blend_id={} spices={} blends={}",
            blend.id,
            blend.spices.len(),
            blend.blends.len()
        );
        Ok(blend)
    }

    pub fn get_blend(&self, id: BlendId) -> CatalogResult<Option<Blend>> {
        self.repo.find_blend(id)
    }

    /// Lists all blends ordered by id.
    pub fn list_blends(&self) -> CatalogResult<Vec<Blend>> {
        self.repo.list_blends()
    }

    pub fn get_spice(&self, id: SpiceId) -> CatalogResult<Option<Spice>> {
        self.repo.find_spice(id)
    }

    /// Lists all spices ordered by id.
    pub fn list_spices(&self) -> CatalogResult<Vec<Spice>> {
        self.repo.list_spices()
    }
}
