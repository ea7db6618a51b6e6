#![allow(dead_code)]

use async_trait::async_trait;
use spicerack_core::{Blend, BlendId, BlendStore, Spice, SpiceId, SpiceStore, StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scriptable in-memory store with failure, latency and hang injection.
#[derive(Default)]
pub struct FakeCatalog {
    blends: HashMap<BlendId, Blend>,
    spices: HashMap<SpiceId, Spice>,
    failing_blends: HashSet<BlendId>,
    failing_spices: HashSet<SpiceId>,
    panicking_blends: HashSet<BlendId>,
    hanging_blends: HashSet<BlendId>,
    hanging_spices: HashSet<SpiceId>,
    delay: Option<Duration>,
    blend_calls: Mutex<HashMap<BlendId, usize>>,
    spice_calls: Mutex<HashMap<SpiceId, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blend(mut self, id: BlendId, spices: &[SpiceId], blends: &[BlendId]) -> Self {
        let blend = Blend::new(id, format!("Blend {id}"))
            .with_spices(spices.iter().copied())
            .with_blends(blends.iter().copied());
        self.blends.insert(id, blend);
        self
    }

    pub fn spice(mut self, id: SpiceId) -> Self {
        self.spices.insert(id, Spice::new(id, format!("Spice {id}")));
        self
    }

    pub fn spices(mut self, ids: &[SpiceId]) -> Self {
        for id in ids {
            self.spices.insert(*id, Spice::new(*id, format!("Spice {id}")));
        }
        self
    }

    pub fn spice_record(mut self, spice: Spice) -> Self {
        self.spices.insert(spice.id, spice);
        self
    }

    pub fn failing_blend(mut self, id: BlendId) -> Self {
        self.failing_blends.insert(id);
        self
    }

    pub fn failing_spice(mut self, id: SpiceId) -> Self {
        self.failing_spices.insert(id);
        self
    }

    pub fn panicking_blend(mut self, id: BlendId) -> Self {
        self.panicking_blends.insert(id);
        self
    }

    pub fn hanging_blend(mut self, id: BlendId) -> Self {
        self.hanging_blends.insert(id);
        self
    }

    pub fn hanging_spice(mut self, id: SpiceId) -> Self {
        self.hanging_spices.insert(id);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn blend_fetches(&self, id: BlendId) -> usize {
        self.blend_calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn total_blend_fetches(&self) -> usize {
        self.blend_calls.lock().unwrap().values().sum()
    }

    pub fn spice_fetches(&self, id: SpiceId) -> usize {
        self.spice_calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            counter: &self.in_flight,
        }
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlendStore for FakeCatalog {
    async fn get_blend(&self, id: BlendId) -> StoreResult<Option<Blend>> {
        *self.blend_calls.lock().unwrap().entry(id).or_insert(0) += 1;
        let _guard = self.enter();
        self.simulate_latency().await;

        if self.hanging_blends.contains(&id) {
            futures::future::pending::<()>().await;
        }
        if self.panicking_blends.contains(&id) {
            panic!("injected panic while fetching blend {id}");
        }
        if self.failing_blends.contains(&id) {
            return Err(StoreError::Unavailable(format!("injected failure for blend {id}")));
        }
        Ok(self.blends.get(&id).cloned())
    }
}

#[async_trait]
impl SpiceStore for FakeCatalog {
    async fn get_spice(&self, id: SpiceId) -> StoreResult<Option<Spice>> {
        *self.spice_calls.lock().unwrap().entry(id).or_insert(0) += 1;
        let _guard = self.enter();
        self.simulate_latency().await;

        if self.hanging_spices.contains(&id) {
            futures::future::pending::<()>().await;
        }
        if self.failing_spices.contains(&id) {
            return Err(StoreError::Unavailable(format!("injected failure for spice {id}")));
        }
        Ok(self.spices.get(&id).cloned())
    }
}
