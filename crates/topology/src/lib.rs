//! Mesh topology pipeline.
//!
//! - [`store`]: polls the status endpoint and publishes a never-empty, versioned
//!   topology snapshot, degrading to cached or static nodes on failure
//! - [`graph`]: turns a node list into a star-shaped node/link model
//! - [`visual`]: maps `(status, role, reduced_motion)` to render parameters
//! - [`layout`]: force-directed positions, auto-fit and the per-frame driver
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use topology::config::SourceConfig;
//! use topology::config::StoreConfig;
//! use topology::store::FileCache;
//! use topology::store::HttpStatusSource;
//! use topology::store::NodeCache;
//! use topology::store::TopologyStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::new();
//! let source = HttpStatusSource::new(&SourceConfig::new("http://127.0.0.1:8000"))
//!     .map_err(|e| e.to_string())?;
//! let cache = NodeCache::new(FileCache::new("/tmp/nebula"), config.cache_key.clone());
//! let store = Arc::new(TopologyStore::initialize(Arc::new(source), cache, config));
//!
//! let token = CancellationToken::new();
//! let polling = store.spawn_polling(token.clone());
//! let nodes = store.snapshot().state.nodes.clone();
//! token.cancel();
//! polling.await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod store;
pub mod visual;

pub use graph::build_from_peers;
pub use graph::build_from_status;
pub use graph::GraphModel;
pub use graph::GraphView;
pub use layout::LayoutEngine;
pub use store::CycleOutcome;
pub use store::TopologySnapshot;
pub use store::TopologyStore;
pub use visual::VisualState;
