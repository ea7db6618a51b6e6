//! Remote lookup contracts consumed by blend resolution.
//!
//! # Responsibility
//! - Describe the Blend Store and Spice Store as async, id-keyed reads.
//! - Separate "entry does not exist" (`Ok(None)`) from transport failures.

use crate::db::DbError;
use crate::model::blend::{Blend, BlendId};
use crate::model::spice::{Spice, SpiceId};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of one store lookup.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying catalog database error.
    Db(DbError),
    /// Store cannot serve requests right now (connection lost, lock poisoned).
    Unavailable(String),
    /// Lookup did not complete within the configured fetch timeout.
    Timeout(Duration),
    /// Stored data cannot be decoded into a valid record.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::Timeout(limit) => write!(f, "store lookup timed out after {limit:?}"),
            Self::InvalidData(message) => write!(f, "invalid catalog data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Blend lookup by id.
#[async_trait]
pub trait BlendStore: Send + Sync {
    async fn get_blend(&self, id: BlendId) -> StoreResult<Option<Blend>>;
}

/// Spice lookup by id.
#[async_trait]
pub trait SpiceStore: Send + Sync {
    async fn get_spice(&self, id: SpiceId) -> StoreResult<Option<Spice>>;
}
