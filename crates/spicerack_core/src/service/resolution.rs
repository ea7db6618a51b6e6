//! Per-call resolution state and the result handed back to callers.
//!
//! # Invariants
//! - State is created by one `resolve` call and dropped when it returns.
//! - The visited set only grows; check-and-insert is one critical section.
//! - The first spice record stored for an id is kept; later copies are
//!   discarded.

use crate::model::blend::BlendId;
use crate::model::spice::{Spice, SpiceId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How the root blend lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootStatus {
    /// Root blend was fetched and traversed.
    Resolved,
    /// Blend Store reported that the root id does not exist.
    NotFound,
    /// Root lookup failed (transport error, timeout, panic).
    Unavailable,
}

impl RootStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::NotFound => "not_found",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Deduplicated spices reachable from one root blend.
///
/// Spice order is unspecified; use [`ResolutionResult::sorted_by_name`] when a
/// stable order is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub root: BlendId,
    pub root_status: RootStatus,
    pub spices: Vec<Spice>,
}

impl ResolutionResult {
    pub fn len(&self) -> usize {
        self.spices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spices.is_empty()
    }

    /// Returns whether the root itself could not be expanded (not found or
    /// unavailable), as opposed to an existing blend with no reachable spices.
    pub fn root_unresolved(&self) -> bool {
        self.root_status != RootStatus::Resolved
    }

    /// Returns spice ids, ascending.
    pub fn spice_ids(&self) -> Vec<SpiceId> {
        let mut ids: Vec<SpiceId> = self.spices.iter().map(|spice| spice.id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, id: SpiceId) -> bool {
        self.spices.iter().any(|spice| spice.id == id)
    }

    /// Consumes the result and returns spices ordered by name, then id.
    pub fn sorted_by_name(mut self) -> Vec<Spice> {
        self.spices
            .sort_by(|left, right| left.name.cmp(&right.name).then(left.id.cmp(&right.id)));
        self.spices
    }
}

/// Shared traversal state for one resolution call.
#[derive(Debug, Default)]
pub(crate) struct ResolutionState {
    visited: Mutex<HashSet<BlendId>>,
    spices: Mutex<HashMap<SpiceId, Spice>>,
    failed_blends: AtomicUsize,
    failed_spices: AtomicUsize,
}

impl ResolutionState {
    /// Marks `id` visited. Returns `false` when it already was.
    pub(crate) fn mark_visited(&self, id: BlendId) -> bool {
        relock(&self.visited).insert(id)
    }

    pub(crate) fn is_visited(&self, id: BlendId) -> bool {
        relock(&self.visited).contains(&id)
    }

    /// Stores `spice` unless a record for its id is already present.
    /// Returns `true` when this call stored it.
    pub(crate) fn record_spice(&self, spice: Spice) -> bool {
        let mut spices = relock(&self.spices);
        if spices.contains_key(&spice.id) {
            return false;
        }
        spices.insert(spice.id, spice);
        true
    }

    pub(crate) fn has_spice(&self, id: SpiceId) -> bool {
        relock(&self.spices).contains_key(&id)
    }

    pub(crate) fn note_blend_failure(&self) {
        self.failed_blends.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_spice_failure(&self) {
        self.failed_spices.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn summary(&self) -> ResolutionSummary {
        ResolutionSummary {
            visited: relock(&self.visited).len(),
            spices: relock(&self.spices).len(),
            failed_blends: self.failed_blends.load(Ordering::Relaxed),
            failed_spices: self.failed_spices.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn take_spices(&self) -> Vec<Spice> {
        relock(&self.spices).drain().map(|(_, spice)| spice).collect()
    }
}

/// Counters logged when a resolution completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolutionSummary {
    pub visited: usize,
    pub spices: usize,
    pub failed_blends: usize,
    pub failed_spices: usize,
}

// Poison is ignored: every critical section is a single insert or lookup.
fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
