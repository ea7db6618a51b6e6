//! Spice (atomic catalog item) model.
//!
//! # Responsibility
//! - Define the atomic catalog record reachable from blends.
//! - Carry consumer-specific attributes through core untouched.
//!
//! # Invariants
//! - `id` is unique within one catalog.
//! - `name` is non-blank after trim for records written by core.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of a spice.
pub type SpiceId = i64;

/// Opaque attribute payload (color, price, heat, ...).
///
/// Core stores and returns it verbatim; resolution never reads it.
pub type SpiceAttributes = Map<String, Value>;

/// Atomic catalog entry with no further children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spice {
    pub id: SpiceId,
    pub name: String,
    /// Flattened so `{"id":1,"name":"Cumin","color":"#a0522d"}` round-trips.
    #[serde(flatten)]
    pub attributes: SpiceAttributes,
}

/// Validation failures for spice records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpiceValidationError {
    BlankName(SpiceId),
}

impl Display for SpiceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName(id) => write!(f, "spice {id} must have a non-blank name"),
        }
    }
}

impl Error for SpiceValidationError {}

impl Spice {
    /// Creates a spice with no attributes.
    pub fn new(id: SpiceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: SpiceAttributes::new(),
        }
    }

    /// Adds one opaque attribute, replacing any previous value under `key`.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), SpiceValidationError> {
        if self.name.trim().is_empty() {
            return Err(SpiceValidationError::BlankName(self.id));
        }
        Ok(())
    }
}
