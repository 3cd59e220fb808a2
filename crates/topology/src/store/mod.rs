//! Topology store: polled acquisition with graceful degradation.
//!
//! The store owns the single [`TopologySnapshot`] the rest of the system reads.
//! It is the only writer; every replacement bumps the snapshot version and is
//! published through a `watch` channel. Whatever happens on the wire, the
//! published node list is never empty: it is live data, cached data or the
//! configured static fallback set, in that order of preference.

pub mod cache;
pub mod source;
pub mod validate;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use api_types::StatusNode;
use api_types::TopologyState;
use chrono::Utc;
use error_stack::Report;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub use self::cache::CacheBackend;
pub use self::cache::FileCache;
pub use self::cache::MemoryCache;
pub use self::cache::NodeCache;
pub use self::source::HttpStatusSource;
pub use self::source::StatusSource;
pub use self::validate::parse_status_payload;
pub use self::validate::StatusPayload;
use crate::config::StoreConfig;
use crate::error::SourceError;

/// Advisory used when the endpoint serves its own fallback without saying why.
pub const BACKEND_FALLBACK_ADVISORY: &str = "Status backend unavailable: using local fallback";

/// One immutable published state.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySnapshot {
    /// Incremented on every replacement
    pub version: u64,
    pub state: TopologyState,
}

/// What a fetch cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Fresh nodes from the primary backend
    Live,
    /// Fresh nodes, but the endpoint served its own fallback
    BackendFallback,
    /// The fetch failed; the store kept showing the best nodes it had
    Degraded,
    /// Another cycle was already in flight
    Skipped,
}

/// Clears the in-flight flag even if the cycle future is dropped midway.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct TopologyStore {
    source: Arc<dyn StatusSource>,
    cache: NodeCache,
    config: StoreConfig,
    snapshot_tx: watch::Sender<Arc<TopologySnapshot>>,
    in_flight: AtomicBool,
    is_loading: AtomicBool,
}

impl TopologyStore {
    /// Create the store and seed its first snapshot from the cache, or from the
    /// static fallback set when nothing is cached. The seed is never live.
    pub fn initialize(
        source: Arc<dyn StatusSource>,
        cache: NodeCache,
        config: StoreConfig,
    ) -> Self {
        let (nodes, origin) = match cache.load() {
            Some(nodes) => (nodes, "cache"),
            None => (config.fallback_nodes.clone(), "static fallback"),
        };
        info!(node_count = nodes.len(), origin, "Topology store initialized");

        let initial = TopologySnapshot {
            version: 0,
            state: TopologyState {
                nodes,
                is_live: false,
                last_updated: None,
                error: None,
            },
        };
        let (snapshot_tx, _) = watch::channel(Arc::new(initial));

        Self {
            source,
            cache,
            config,
            snapshot_tx,
            in_flight: AtomicBool::new(false),
            is_loading: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<TopologySnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver notified on every snapshot replacement.
    pub fn subscribe(&self) -> watch::Receiver<Arc<TopologySnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// True until the first cycle completes, and while a refresh is running.
    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::Acquire)
    }

    /// Run one fetch cycle outside the schedule.
    pub async fn refresh(&self) -> CycleOutcome {
        self.is_loading.store(true, Ordering::Release);
        self.fetch_cycle().await
    }

    /// Fetch, validate and publish. Failures degrade the snapshot and are never
    /// returned to the caller. A cycle started while another is in flight is
    /// skipped.
    pub async fn fetch_cycle(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Fetch cycle already in flight, skipping");
            return CycleOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let result = self
            .source
            .fetch()
            .await
            .and_then(|body| parse_status_payload(&body));

        let outcome = match result {
            Ok(payload) => self.apply_success(payload),
            Err(report) => self.apply_failure(&report),
        };
        self.is_loading.store(false, Ordering::Release);
        outcome
    }

    fn apply_success(&self, payload: StatusPayload) -> CycleOutcome {
        let is_fallback = payload.is_fallback();
        let error = if is_fallback {
            warn!(
                advisory = payload.advisory.as_deref().unwrap_or_default(),
                "Status endpoint served its local fallback"
            );
            Some(
                payload
                    .advisory
                    .unwrap_or_else(|| BACKEND_FALLBACK_ADVISORY.to_string()),
            )
        } else {
            payload.advisory
        };

        self.cache.save(&payload.nodes);
        debug!(node_count = payload.nodes.len(), is_fallback, "Received status nodes");

        self.publish(TopologyState {
            nodes: payload.nodes,
            is_live: !is_fallback,
            last_updated: Some(Utc::now()),
            error,
        });

        if is_fallback {
            CycleOutcome::BackendFallback
        } else {
            CycleOutcome::Live
        }
    }

    fn apply_failure(&self, report: &Report<SourceError>) -> CycleOutcome {
        let reason = report.current_context();
        warn!(error = %reason, "Status fetch failed, keeping last known nodes");

        let previous = self.snapshot();
        let nodes = self
            .cache
            .load()
            .or_else(|| Some(previous.state.nodes.clone()).filter(|n| !n.is_empty()))
            .unwrap_or_else(|| self.fallback_nodes());

        self.publish(TopologyState {
            nodes,
            is_live: false,
            last_updated: previous.state.last_updated,
            error: Some(format!("Status feed unavailable: {reason}")),
        });
        CycleOutcome::Degraded
    }

    fn fallback_nodes(&self) -> Vec<StatusNode> {
        debug!("Using static fallback nodes");
        self.config.fallback_nodes.clone()
    }

    fn publish(&self, state: TopologyState) {
        self.snapshot_tx.send_modify(|current| {
            *current = Arc::new(TopologySnapshot {
                version: current.version + 1,
                state,
            });
        });
    }

    /// Run the polling loop until `token` is cancelled. The first cycle starts
    /// immediately.
    pub async fn run(&self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.effective_poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Topology polling stopped");
                    break;
                }
                _ = interval.tick() => {
                    let outcome = self.fetch_cycle().await;
                    debug!(?outcome, "Scheduled fetch cycle finished");
                }
            }
        }
    }

    /// Spawn [`TopologyStore::run`] on the current runtime.
    pub fn spawn_polling(self: &Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                interval_ms = store.config.effective_poll_interval().as_millis() as u64,
                "Starting topology polling"
            );
            store.run(token).await;
        })
    }
}
