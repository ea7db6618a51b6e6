//! Recursive blend-graph resolver.
//!
//! # Responsibility
//! - Walk every blend reachable from a root id, fetching nodes on demand.
//! - Collect the deduplicated set of spices referenced along the way.
//!
//! # Invariants
//! - A blend id is marked visited before its children are dispatched, so
//!   cycles and shared sub-blends are expanded at most once per call.
//! - Every node joins all tasks it spawned before it completes; no task
//!   outlives the `resolve` call that created it.
//! - A failed blend or spice lookup only drops that branch or that spice.
//!   Sibling work keeps running and nothing is surfaced to the caller.
//!
//! Resolution spawns tasks and therefore must run inside a Tokio runtime.

use crate::model::blend::BlendId;
use crate::model::spice::SpiceId;
use crate::repo::store::{BlendStore, SpiceStore, StoreError, StoreResult};
use crate::service::resolution::{ResolutionResult, ResolutionState, RootStatus};
use futures::future::BoxFuture;
use log::{debug, error, info, trace, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Tuning knobs for one resolver instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound on concurrent store lookups. `None` means unbounded.
    ///
    /// Permits are held only for the duration of one fetch, never while a
    /// node waits on its children. Values are clamped to
    /// `1..=Semaphore::MAX_PERMITS`.
    pub max_in_flight_fetches: Option<usize>,
    /// Per-lookup timeout. An elapsed lookup counts as a failed fetch.
    pub fetch_timeout: Option<Duration>,
}

impl ResolverConfig {
    pub fn with_max_in_flight_fetches(mut self, limit: usize) -> Self {
        self.max_in_flight_fetches = Some(limit);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}

/// Errors from deadline-bounded resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Whole resolution did not finish in time; all in-flight work was aborted.
    DeadlineExceeded { root: BlendId, deadline: Duration },
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeadlineExceeded { root, deadline } => write!(
                f,
                "resolution of blend {root} did not finish within {deadline:?}"
            ),
        }
    }
}

impl Error for ResolveError {}

/// Resolves blends into the spices they (transitively) contain.
pub struct BlendResolver<B, S> {
    blends: Arc<B>,
    spices: Arc<S>,
    config: ResolverConfig,
}

impl<B, S> BlendResolver<B, S>
where
    B: BlendStore + 'static,
    S: SpiceStore + 'static,
{
    /// Creates a resolver with default (unbounded, no timeout) configuration.
    pub fn new(blends: Arc<B>, spices: Arc<S>) -> Self {
        Self::with_config(blends, spices, ResolverConfig::default())
    }

    pub fn with_config(blends: Arc<B>, spices: Arc<S>, config: ResolverConfig) -> Self {
        Self {
            blends,
            spices,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns every unique spice reachable from `root`.
    ///
    /// # Contract
    /// - Never fails; missing or failing nodes are logged and skipped.
    /// - A missing root yields an empty result whose `root_status` is not
    ///   `Resolved`.
    /// - Result order is unspecified.
    pub async fn resolve(&self, root: BlendId) -> ResolutionResult {
        let started_at = Instant::now();
        info!("event=resolve module=resolver status=start root={root}");

        let traversal = Arc::new(Traversal {
            blends: Arc::clone(&self.blends),
            spices: Arc::clone(&self.spices),
            state: ResolutionState::default(),
            limiter: self
                .config
                .max_in_flight_fetches
                .map(|limit| Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS))),
            fetch_timeout: self.config.fetch_timeout,
        });

        // Spawned so a panicking store cannot unwind through the caller;
        // dropping this set aborts the whole traversal.
        let mut root_task = JoinSet::new();
        root_task.spawn(Arc::clone(&traversal).visit(root));
        let outcome = match root_task.join_next().await {
            Some(Ok(outcome)) => outcome,
            Some(Err(err)) => {
                error!("event=resolve module=resolver status=error root={root} error={err}");
                NodeOutcome::Failed
            }
            None => NodeOutcome::Failed,
        };

        let root_status = match outcome {
            NodeOutcome::Expanded | NodeOutcome::Skipped => RootStatus::Resolved,
            NodeOutcome::Missing => RootStatus::NotFound,
            NodeOutcome::Failed => RootStatus::Unavailable,
        };

        let summary = traversal.state.summary();
        info!(
            "event=resolve module=resolver status=ok root={root} root_status={} visited={} spices={} failed_blends={} failed_spices={} duration_ms={}",
            root_status.as_str(),
            summary.visited,
            summary.spices,
            summary.failed_blends,
            summary.failed_spices,
            started_at.elapsed().as_millis()
        );

        ResolutionResult {
            root,
            root_status,
            spices: traversal.state.take_spices(),
        }
    }

    /// Like [`BlendResolver::resolve`], bounded by an overall deadline.
    ///
    /// When the deadline passes, abort is requested for every in-flight
    /// fetch and child task; they stop at their next yield point, possibly
    /// after this returns.
    pub async fn resolve_within(
        &self,
        root: BlendId,
        deadline: Duration,
    ) -> Result<ResolutionResult, ResolveError> {
        match tokio::time::timeout(deadline, self.resolve(root)).await {
            Ok(result) => Ok(result),
            Err(_) => {
                warn!(
                    "event=resolve module=resolver status=deadline_exceeded root={root} deadline_ms={}",
                    deadline.as_millis()
                );
                Err(ResolveError::DeadlineExceeded { root, deadline })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeOutcome {
    /// Already visited by this resolution.
    Skipped,
    /// Fetched and all children joined.
    Expanded,
    /// Blend Store has no such blend.
    Missing,
    /// Blend lookup failed.
    Failed,
}

/// State shared by every task of one resolution.
struct Traversal<B, S> {
    blends: Arc<B>,
    spices: Arc<S>,
    state: ResolutionState,
    limiter: Option<Semaphore>,
    fetch_timeout: Option<Duration>,
}

impl<B, S> Traversal<B, S>
where
    B: BlendStore + 'static,
    S: SpiceStore + 'static,
{
    fn visit(self: Arc<Self>, id: BlendId) -> BoxFuture<'static, NodeOutcome> {
        Box::pin(async move {
            if !self.state.mark_visited(id) {
                trace!("event=blend_visit module=resolver status=skipped blend_id={id}");
                return NodeOutcome::Skipped;
            }

            let blend = match self.fetch(self.blends.get_blend(id)).await {
                Ok(Some(blend)) => blend,
                Ok(None) => {
                    self.state.note_blend_failure();
                    warn!("event=blend_fetch module=resolver status=missing blend_id={id}");
                    return NodeOutcome::Missing;
                }
                Err(err) => {
                    self.state.note_blend_failure();
                    warn!(
                        "event=blend_fetch module=resolver status=error blend_id={id} error={err}"
                    );
                    return NodeOutcome::Failed;
                }
            };
            debug!(
                "event=blend_fetch module=resolver status=ok blend_id={id} spices={} blends={}",
                blend.spices.len(),
                blend.blends.len()
            );

            let mut children = JoinSet::new();
            for spice_id in blend.spices.iter().copied() {
                let traversal = Arc::clone(&self);
                children.spawn(async move { traversal.collect_spice(spice_id).await });
            }
            for child_id in blend.blends.iter().copied() {
                // Cheap pre-check; `visit` repeats it atomically.
                if self.state.is_visited(child_id) {
                    continue;
                }
                let traversal = Arc::clone(&self);
                children.spawn(async move {
                    traversal.visit(child_id).await;
                });
            }

            while let Some(joined) = children.join_next().await {
                if let Err(err) = joined {
                    error!(
                        "event=blend_children module=resolver status=error blend_id={id} error={err}"
                    );
                }
            }

            NodeOutcome::Expanded
        })
    }

    async fn collect_spice(self: Arc<Self>, id: SpiceId) {
        if self.state.has_spice(id) {
            return;
        }

        match self.fetch(self.spices.get_spice(id)).await {
            Ok(Some(spice)) => {
                if self.state.record_spice(spice) {
                    trace!("event=spice_fetch module=resolver status=ok spice_id={id}");
                }
            }
            Ok(None) => {
                self.state.note_spice_failure();
                warn!("event=spice_fetch module=resolver status=missing spice_id={id}");
            }
            Err(err) => {
                self.state.note_spice_failure();
                warn!("event=spice_fetch module=resolver status=error spice_id={id} error={err}");
            }
        }
    }

    /// Runs one store lookup under the configured limiter and timeout.
    async fn fetch<T, F>(&self, lookup: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await.map_err(|_| {
                StoreError::Unavailable("fetch limiter closed".to_string())
            })?),
            None => None,
        };

        match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .unwrap_or_else(|_| Err(StoreError::Timeout(limit))),
            None => lookup.await,
        }
    }
}
