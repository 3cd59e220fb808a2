//! Live graph view.
//!
//! Follows the store's snapshots and keeps exactly one layout loop running for
//! the current node set. A new node list tears the old loop down and starts a
//! fresh one; a snapshot that only changes metadata (advisory, liveness) leaves
//! the running layout alone.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use api_types::StatusNode;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use topology::graph::GraphView;
use topology::layout::driver;
use topology::layout::DragCommand;
use topology::layout::LayoutConfig;
use topology::layout::LayoutFrame;
use topology::layout::LayoutHandle;
use topology::layout::Viewport;
use topology::LayoutEngine;
use topology::TopologyStore;
use tracing::debug;
use tracing::info;

struct ActiveView {
    nodes: Vec<StatusNode>,
    view: GraphView,
    layout: LayoutHandle,
}

/// Viewer settings.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub reduced_motion: bool,
    pub viewport: Viewport,
    pub layout: LayoutConfig,
    pub frame_period: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            viewport: Viewport::default(),
            layout: LayoutConfig::default(),
            frame_period: driver::DEFAULT_FRAME_PERIOD,
        }
    }
}

pub struct GraphViewer {
    config: ViewerConfig,
    active: RwLock<Option<ActiveView>>,
    /// name of the most recently activated node
    selected: Arc<Mutex<Option<String>>>,
}

impl GraphViewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            active: RwLock::new(None),
            selected: Arc::new(Mutex::new(None)),
        }
    }

    /// Name of the last node activated through [`GraphViewer::select`].
    pub fn last_selected(&self) -> Option<String> {
        self.selected.lock().ok().and_then(|s| s.clone())
    }

    /// Rebuild the graph for `nodes` unless it is the node set already shown.
    /// Returns whether a new layout loop was started.
    pub async fn show(&self, nodes: &[StatusNode], token: &CancellationToken) -> bool {
        let mut active = self.active.write().await;
        if active.as_ref().is_some_and(|a| a.nodes == nodes) {
            debug!("Node set unchanged, keeping current layout");
            return false;
        }

        let selected = Arc::clone(&self.selected);
        let view = GraphView::from_status(nodes.to_vec(), self.config.reduced_motion)
            .with_status_selection(move |node| {
                info!(
                    node = %node.name,
                    role = %node.role,
                    online = node.online,
                    "Node selected"
                );
                if let Ok(mut selected) = selected.lock() {
                    *selected = Some(node.name.clone());
                }
            });
        let engine = LayoutEngine::new(
            view.model().clone(),
            self.config.viewport,
            self.config.layout.clone(),
        );
        let layout = driver::spawn(engine, self.config.frame_period, token);
        info!(
            node_count = nodes.len(),
            hub = view.model().hub.as_deref().unwrap_or_default(),
            "Graph rebuilt"
        );

        // dropping the previous handle cancels its loop
        *active = Some(ActiveView {
            nodes: nodes.to_vec(),
            view,
            layout,
        });
        true
    }

    /// Latest layout frame, `None` before the first graph is built.
    pub async fn frame(&self) -> Option<Arc<LayoutFrame>> {
        self.active.read().await.as_ref().map(|a| a.layout.latest())
    }

    /// Forward a drag command to the running layout. Returns false when no
    /// layout is running.
    pub async fn drag(&self, command: DragCommand) -> bool {
        // a full command queue must not hold up a rebuild
        let commands = match self.active.read().await.as_ref() {
            Some(a) => a.layout.commands(),
            None => return false,
        };
        commands.send(command).await.is_ok()
    }

    /// Backing record of a rendered node, without activating it.
    pub async fn lookup(&self, id: &str) -> Option<Value> {
        let active = self.active.read().await;
        let record = active.as_ref()?.view.resolve(id)?;
        serde_json::to_value(record).ok()
    }

    /// Activate a rendered node and return its backing record.
    pub async fn select(&self, id: &str) -> Option<Value> {
        let active = self.active.read().await;
        let active = active.as_ref()?;
        let record = serde_json::to_value(active.view.resolve(id)?).ok()?;
        active.view.activate(id);
        Some(record)
    }

    /// Follow store snapshots until `token` is cancelled.
    pub async fn run(&self, store: Arc<TopologyStore>, token: CancellationToken) {
        let mut updates = store.subscribe();
        let initial = updates.borrow_and_update().state.nodes.clone();
        self.show(&initial, &token).await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        info!("Topology store closed");
                        break;
                    }
                    let nodes = updates.borrow_and_update().state.nodes.clone();
                    self.show(&nodes, &token).await;
                }
            }
        }

        if let Some(active) = self.active.write().await.take() {
            active.layout.shutdown().await;
        }
        info!("Graph view stopped");
    }
}
