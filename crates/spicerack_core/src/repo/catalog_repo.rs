//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Store spices and blends in the in-memory catalog database.
//! - Serve the async `BlendStore`/`SpiceStore` reads used by resolution.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Child id order is preserved through `position` columns.
//! - Child ids are stored as-is, even when they reference missing entries.
//!
//! One connection sits behind a blocking mutex, so concurrent store lookups
//! are serialized rather than run in parallel.

use crate::db::{open_db_in_memory, DbError};
use crate::model::blend::{Blend, BlendId, BlendValidationError};
use crate::model::spice::{Spice, SpiceAttributes, SpiceId, SpiceValidationError};
use crate::repo::store::{BlendStore, SpiceStore, StoreError, StoreResult};
use async_trait::async_trait;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};

/// Blend id assigned when the catalog holds no blends yet.
pub const FIRST_CREATED_BLEND_ID: BlendId = 1000;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors from catalog write and listing operations.
#[derive(Debug)]
pub enum CatalogError {
    InvalidBlend(BlendValidationError),
    InvalidSpice(SpiceValidationError),
    BlendExists(BlendId),
    SpiceExists(SpiceId),
    /// The highest blend id is `BlendId::MAX`; no next id can be assigned.
    IdSpaceExhausted,
    Store(StoreError),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBlend(err) => write!(f, "{err}"),
            Self::InvalidSpice(err) => write!(f, "{err}"),
            Self::BlendExists(id) => write!(f, "blend already exists: {id}"),
            Self::SpiceExists(id) => write!(f, "spice already exists: {id}"),
            Self::IdSpaceExhausted => write!(f, "no blend id left to assign"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBlend(err) => Some(err),
            Self::InvalidSpice(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::BlendExists(_) | Self::SpiceExists(_) | Self::IdSpaceExhausted => None,
        }
    }
}

impl From<BlendValidationError> for CatalogError {
    fn from(value: BlendValidationError) -> Self {
        Self::InvalidBlend(value)
    }
}

impl From<SpiceValidationError> for CatalogError {
    fn from(value: SpiceValidationError) -> Self {
        Self::InvalidSpice(value)
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DbError> for CatalogError {
    fn from(value: DbError) -> Self {
        Self::Store(value.into())
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(value.into())
    }
}

/// Blend fields supplied by a caller before an id is assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlend {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub spices: Vec<SpiceId>,
    #[serde(default)]
    pub blends: Vec<BlendId>,
}

impl NewBlend {
    fn into_blend(self, id: BlendId) -> Blend {
        Blend {
            id,
            name: self.name,
            description: self.description,
            spices: self.spices,
            blends: self.blends,
        }
    }
}

/// Bulk catalog content, e.g. loaded from a JSON fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub spices: Vec<Spice>,
    #[serde(default)]
    pub blends: Vec<Blend>,
}

/// Synchronous catalog write/list contract.
pub trait CatalogRepository {
    fn insert_spice(&self, spice: &Spice) -> CatalogResult<()>;
    fn insert_blend(&self, blend: &Blend) -> CatalogResult<()>;
    /// Inserts a blend under the next free id (`max + 1`, or
    /// [`FIRST_CREATED_BLEND_ID`] on an empty catalog).
    ///
    /// Fails with [`CatalogError::IdSpaceExhausted`] once `BlendId::MAX` is taken.
    fn create_blend(&self, blend: NewBlend) -> CatalogResult<Blend>;
    fn find_blend(&self, id: BlendId) -> CatalogResult<Option<Blend>>;
    fn find_spice(&self, id: SpiceId) -> CatalogResult<Option<Spice>>;
    fn list_blends(&self) -> CatalogResult<Vec<Blend>>;
    fn list_spices(&self) -> CatalogResult<Vec<Spice>>;
}

/// SQLite-backed catalog shared across resolver tasks.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens a fresh, empty in-memory catalog.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Opens an in-memory catalog and loads `seed` into it.
    pub fn from_seed(seed: &CatalogSeed) -> CatalogResult<Self> {
        let catalog = Self::open_in_memory()?;
        catalog.import_seed(seed)?;
        Ok(catalog)
    }

    /// Imports all spices and blends in one transaction.
    ///
    /// Nothing is written when any record is invalid or already present.
    pub fn import_seed(&self, seed: &CatalogSeed) -> CatalogResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for spice in &seed.spices {
            write_spice(&tx, spice)?;
        }
        for blend in &seed.blends {
            write_blend(&tx, blend)?;
        }
        tx.commit()?;

        info!(
            "event=catalog_import module=repo status=ok spices={} blends={}",
            seed.spices.len(),
            seed.blends.len()
        );
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("catalog connection lock poisoned".to_string()))
    }
}

impl CatalogRepository for SqliteCatalog {
    fn insert_spice(&self, spice: &Spice) -> CatalogResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        write_spice(&tx, spice)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_blend(&self, blend: &Blend) -> CatalogResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        write_blend(&tx, blend)?;
        tx.commit()?;
        Ok(())
    }

    fn create_blend(&self, blend: NewBlend) -> CatalogResult<Blend> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let max_id: Option<BlendId> = tx.query_row("SELECT MAX(id) FROM blends;", [], |row| {
            row.get(0)
        })?;
        let id = match max_id {
            Some(max) => max.checked_add(1).ok_or(CatalogError::IdSpaceExhausted)?,
            None => FIRST_CREATED_BLEND_ID,
        };
        let blend = blend.into_blend(id);
        write_blend(&tx, &blend)?;
        tx.commit()?;
        Ok(blend)
    }

    fn find_blend(&self, id: BlendId) -> CatalogResult<Option<Blend>> {
        let conn = self.lock()?;
        Ok(load_blend(&conn, id)?)
    }

    fn find_spice(&self, id: SpiceId) -> CatalogResult<Option<Spice>> {
        let conn = self.lock()?;
        Ok(load_spice(&conn, id)?)
    }

    fn list_blends(&self) -> CatalogResult<Vec<Blend>> {
        let conn = self.lock()?;
        let ids = {
            let mut stmt = conn.prepare("SELECT id FROM blends ORDER BY id ASC;")?;
            let rows = stmt.query_map([], |row| row.get::<_, BlendId>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut blends = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(blend) = load_blend(&conn, id)? {
                blends.push(blend);
            }
        }
        Ok(blends)
    }

    fn list_spices(&self) -> CatalogResult<Vec<Spice>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name, attributes FROM spices ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut spices = Vec::new();
        while let Some(row) = rows.next()? {
            spices.push(parse_spice_row(
                row.get(0)?,
                row.get(1)?,
                row.get::<_, String>(2)?,
            )?);
        }
        Ok(spices)
    }
}

#[async_trait]
impl BlendStore for SqliteCatalog {
    async fn get_blend(&self, id: BlendId) -> StoreResult<Option<Blend>> {
        let conn = self.lock()?;
        load_blend(&conn, id)
    }
}

#[async_trait]
impl SpiceStore for SqliteCatalog {
    async fn get_spice(&self, id: SpiceId) -> StoreResult<Option<Spice>> {
        let conn = self.lock()?;
        load_spice(&conn, id)
    }
}

fn write_spice(tx: &Transaction<'_>, spice: &Spice) -> CatalogResult<()> {
    spice.validate()?;
    if exists(tx, "SELECT 1 FROM spices WHERE id = ?1;", spice.id)? {
        return Err(CatalogError::SpiceExists(spice.id));
    }

    let attributes = serde_json::to_string(&spice.attributes).map_err(|err| {
        StoreError::InvalidData(format!("spice {} attributes: {err}", spice.id))
    })?;
    tx.execute(
        "INSERT INTO spices (id, name, attributes) VALUES (?1, ?2, ?3);",
        params![spice.id, spice.name.as_str(), attributes],
    )?;
    Ok(())
}

fn write_blend(tx: &Transaction<'_>, blend: &Blend) -> CatalogResult<()> {
    blend.validate()?;
    if exists(tx, "SELECT 1 FROM blends WHERE id = ?1;", blend.id)? {
        return Err(CatalogError::BlendExists(blend.id));
    }

    tx.execute(
        "INSERT INTO blends (id, name, description) VALUES (?1, ?2, ?3);",
        params![blend.id, blend.name.as_str(), blend.description.as_deref()],
    )?;
    for (position, spice_id) in blend.spices.iter().enumerate() {
        tx.execute(
            "INSERT INTO blend_spices (blend_id, position, spice_id) VALUES (?1, ?2, ?3);",
            params![blend.id, position as i64, spice_id],
        )?;
    }
    for (position, child_id) in blend.blends.iter().enumerate() {
        tx.execute(
            "INSERT INTO blend_children (blend_id, position, child_id) VALUES (?1, ?2, ?3);",
            params![blend.id, position as i64, child_id],
        )?;
    }
    Ok(())
}

fn exists(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<bool> {
    Ok(conn
        .query_row(sql, [id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn load_blend(conn: &Connection, id: BlendId) -> StoreResult<Option<Blend>> {
    let header = conn
        .query_row(
            "SELECT name, description FROM blends WHERE id = ?1;",
            [id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
        )
        .optional()?;
    let Some((name, description)) = header else {
        return Ok(None);
    };

    let spices = child_ids(
        conn,
        "SELECT spice_id FROM blend_spices WHERE blend_id = ?1 ORDER BY position ASC;",
        id,
    )?;
    let blends = child_ids(
        conn,
        "SELECT child_id FROM blend_children WHERE blend_id = ?1 ORDER BY position ASC;",
        id,
    )?;

    Ok(Some(Blend {
        id,
        name,
        description,
        spices,
        blends,
    }))
}

fn child_ids(conn: &Connection, sql: &str, blend_id: BlendId) -> StoreResult<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([blend_id], |row| row.get::<_, i64>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn load_spice(conn: &Connection, id: SpiceId) -> StoreResult<Option<Spice>> {
    let row = conn
        .query_row(
            "SELECT name, attributes FROM spices WHERE id = ?1;",
            [id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    row.map(|(name, attributes)| parse_spice_row(id, name, attributes))
        .transpose()
}

fn parse_spice_row(id: SpiceId, name: String, attributes: String) -> StoreResult<Spice> {
    let attributes: SpiceAttributes = serde_json::from_str(&attributes).map_err(|err| {
        StoreError::InvalidData(format!("invalid attributes for spice {id}: {err}"))
    })?;
    Ok(Spice {
        id,
        name,
        attributes,
    })
}
