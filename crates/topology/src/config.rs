//! store and source config
//!
//! Everything that used to be a process-wide constant (cache key, poll interval,
//! fallback node set, endpoint origin) is passed in explicitly so that separate
//! store instances never share state.

use std::time::Duration;

use api_types::StatusNode;
use api_types::StatusRole;
use error_stack::Report;
use error_stack::ResultExt;
use url::Url;

use crate::error::SourceError;
use crate::error::SourceResult;

/// Key the node list is persisted under.
pub const DEFAULT_CACHE_KEY: &str = "astra_topology_cache";
/// Interval between scheduled fetch cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Shortest interval the polling loop will run at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_STATUS_PATH: &str = "/api/status";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Node set shown when neither the endpoint nor the cache has anything.
pub fn default_fallback_nodes() -> Vec<StatusNode> {
    vec![
        StatusNode::new("minibeast", StatusRole::Gateway, true),
        StatusNode::new("hermes", StatusRole::Storage, false),
        StatusNode::new("kratos", StatusRole::Ai, false),
        StatusNode::new("hades", StatusRole::Gpu, false),
    ]
}

/// Topology store config.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// cache record key
    pub cache_key: String,
    /// scheduled fetch interval
    pub poll_interval: Duration,
    /// static node set of last resort, never empty
    pub fallback_nodes: Vec<StatusNode>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreConfig {
    /// create new store config with default parameters.
    pub fn new() -> Self {
        Self {
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fallback_nodes: default_fallback_nodes(),
        }
    }

    /// set cache key.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    /// set poll interval, raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Interval the polling loop actually uses, even if the field was set directly.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }

    /// set fallback nodes. An empty list keeps the current set.
    pub fn with_fallback_nodes(mut self, nodes: Vec<StatusNode>) -> Self {
        if !nodes.is_empty() {
            self.fallback_nodes = nodes;
        }
        self
    }
}

/// Status endpoint config.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// scheme and authority of the API, no trailing slash
    pub api_origin: String,
    pub status_path: String,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl SourceConfig {
    /// create new source config with default parameters.
    pub fn new(api_origin: impl Into<String>) -> Self {
        let api_origin: String = api_origin.into();
        Self {
            api_origin: api_origin.trim().trim_end_matches('/').to_string(),
            status_path: DEFAULT_STATUS_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// set status path.
    pub fn with_status_path(mut self, path: impl Into<String>) -> Self {
        self.status_path = path.into();
        self
    }

    /// set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL of the status endpoint.
    pub fn status_url(&self) -> SourceResult<Url> {
        if self.api_origin.is_empty() {
            return Err(Report::new(SourceError::Configuration {
                message: "API origin is empty".into(),
            }));
        }
        let path = if self.status_path.starts_with('/') {
            self.status_path.clone()
        } else {
            format!("/{}", self.status_path)
        };
        Url::parse(&format!("{}{}", self.api_origin, path))
            .change_context(SourceError::Configuration {
                message: "Invalid status endpoint URL".into(),
            })
            .attach_printable_lazy(|| format!("origin: {}", self.api_origin))
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn store_config_builder() {
        let config = StoreConfig::new()
            .with_cache_key("test_cache")
            .with_poll_interval(Duration::from_millis(250))
            .with_fallback_nodes(vec![StatusNode::new("solo", StatusRole::Gateway, true)]);

        assert_eq!(config.cache_key, "test_cache");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.fallback_nodes.len(), 1);
    }

    #[test]
    fn zero_poll_interval_is_raised() {
        let config = StoreConfig::new().with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);

        let mut config = StoreConfig::new();
        config.poll_interval = Duration::ZERO;
        assert_eq!(config.effective_poll_interval(), MIN_POLL_INTERVAL);
    }

    #[test]
    fn empty_fallback_set_is_ignored() {
        let config = StoreConfig::new().with_fallback_nodes(Vec::new());
        assert_eq!(config.fallback_nodes, default_fallback_nodes());
    }

    #[test]
    fn source_config_trims_trailing_slash() {
        let config = SourceConfig::new("https://mesh.example.com/")
            .with_request_timeout(Duration::from_secs(2));

        assert_eq!(config.api_origin, "https://mesh.example.com");
        assert_eq!(
            config.status_url().expect("should build url").as_str(),
            "https://mesh.example.com/api/status"
        );
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn status_path_without_leading_slash() {
        let config = SourceConfig::new("http://127.0.0.1:8000").with_status_path("v2/status");
        assert_eq!(
            config.status_url().expect("should build url").as_str(),
            "http://127.0.0.1:8000/v2/status"
        );
    }

    #[test]
    fn invalid_origin_is_a_configuration_error() {
        let err = SourceConfig::new("not a url")
            .status_url()
            .expect_err("should reject origin");
        assert!(matches!(
            err.current_context(),
            SourceError::Configuration { .. }
        ));

        let err = SourceConfig::new("").status_url().expect_err("should reject empty");
        assert!(matches!(
            err.current_context(),
            SourceError::Configuration { .. }
        ));
    }
}
