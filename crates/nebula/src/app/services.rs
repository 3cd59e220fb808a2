use std::sync::Arc;

use anyhow::Result;
use topology::store::FileCache;
use topology::store::HttpStatusSource;
use topology::store::NodeCache;
use topology::TopologyStore;

use crate::config::DaemonArgs;
use crate::config::TopologyArgs;
use crate::view::GraphViewer;
use crate::view::ViewerConfig;

/// Application dependencies
pub struct ApplicationServices {
    pub store: Arc<TopologyStore>,
    pub viewer: Arc<GraphViewer>,
}

impl ApplicationServices {
    pub fn new(store: Arc<TopologyStore>, viewer: Arc<GraphViewer>) -> Self {
        Self { store, viewer }
    }

    pub fn from_args(args: &DaemonArgs) -> Result<Self> {
        let store = build_store(&args.topology)?;
        let viewer = GraphViewer::new(ViewerConfig {
            reduced_motion: args.topology.reduced_motion,
            viewport: args.topology.viewport(),
            layout: args.topology.layout_config(),
            frame_period: args.frame_period(),
        });
        Ok(Self::new(Arc::new(store), Arc::new(viewer)))
    }
}

/// HTTP source plus file cache, seeded from whatever the cache holds.
pub fn build_store(args: &TopologyArgs) -> Result<TopologyStore> {
    let source = HttpStatusSource::new(&args.source_config())
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;
    let config = args.store_config();
    let cache = NodeCache::new(FileCache::new(args.cache_dir()), config.cache_key.clone());
    Ok(TopologyStore::initialize(Arc::new(source), cache, config))
}
