//! Blend (composite catalog entry) model.
//!
//! # Responsibility
//! - Define the graph node that lists child spices and child blends.
//!
//! # Invariants
//! - Child id lists keep the order they were authored in.
//! - Child ids may reference entries that do not exist; resolution treats
//!   those as failed branches, not as invalid blends.
//! - A blend may reference itself or one of its ancestors.

use super::spice::SpiceId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of a blend.
pub type BlendId = i64;

/// Composite catalog entry: atomic spices plus nested blends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blend {
    pub id: BlendId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Child spice ids, in authored order.
    #[serde(default)]
    pub spices: Vec<SpiceId>,
    /// Child blend ids, in authored order.
    #[serde(default)]
    pub blends: Vec<BlendId>,
}

/// Validation failures for blend records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlendValidationError {
    BlankName(BlendId),
    DuplicateSpice { blend: BlendId, spice: SpiceId },
    DuplicateChild { blend: BlendId, child: BlendId },
}

impl Display for BlendValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName(id) => write!(f, "blend {id} must have a non-blank name"),
            Self::DuplicateSpice { blend, spice } => {
                write!(f, "blend {blend} lists spice {spice} more than once")
            }
            Self::DuplicateChild { blend, child } => {
                write!(f, "blend {blend} lists child blend {child} more than once")
            }
        }
    }
}

impl Error for BlendValidationError {}

impl Blend {
    /// Creates an empty blend.
    pub fn new(id: BlendId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            spices: Vec::new(),
            blends: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_spices(mut self, spices: impl IntoIterator<Item = SpiceId>) -> Self {
        self.spices = spices.into_iter().collect();
        self
    }

    pub fn with_blends(mut self, blends: impl IntoIterator<Item = BlendId>) -> Self {
        self.blends = blends.into_iter().collect();
        self
    }

    /// Returns whether this blend lists itself as a child.
    pub fn is_self_referencing(&self) -> bool {
        self.blends.contains(&self.id)
    }

    /// Checks write-side invariants.
    ///
    /// Self references and dangling ids are allowed; only the record shape is
    /// checked here.
    pub fn validate(&self) -> Result<(), BlendValidationError> {
        if self.name.trim().is_empty() {
            return Err(BlendValidationError::BlankName(self.id));
        }
        if let Some(spice) = first_duplicate(&self.spices) {
            return Err(BlendValidationError::DuplicateSpice {
                blend: self.id,
                spice,
            });
        }
        if let Some(child) = first_duplicate(&self.blends) {
            return Err(BlendValidationError::DuplicateChild {
                blend: self.id,
                child,
            });
        }
        Ok(())
    }
}

fn first_duplicate(ids: &[i64]) -> Option<i64> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().find(|id| !seen.insert(*id))
}
