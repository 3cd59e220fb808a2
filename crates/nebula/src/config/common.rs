use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use topology::config::SourceConfig;
use topology::config::StoreConfig;
use topology::layout::LayoutConfig;
use topology::layout::Viewport;

/// Options shared by every command that builds a topology store.
#[derive(Args, Clone, Debug)]
pub struct TopologyArgs {
    #[arg(
        long,
        env = "NEBULA_API_ORIGIN",
        default_value = "http://127.0.0.1:8000",
        help = "Origin of the status API, e.g. https://mesh.example.com"
    )]
    pub api_origin: String,

    #[arg(
        long,
        env = "NEBULA_CACHE_DIR",
        value_hint = clap::ValueHint::DirPath,
        help = "Directory for the persisted node cache (defaults to <tmp>/nebula)"
    )]
    pub cache_dir: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between scheduled status fetches"
    )]
    pub poll_interval_secs: u64,

    #[arg(
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Status request timeout in seconds"
    )]
    pub request_timeout_secs: u64,

    #[arg(
        long,
        help = "Strip all animation parameters from node visuals",
        default_value_t = false
    )]
    pub reduced_motion: bool,

    #[arg(
        long,
        default_value_t = 1280.0,
        value_parser = parse_dimension,
        help = "Viewport width used for auto-fit"
    )]
    pub viewport_width: f64,

    #[arg(
        long,
        default_value_t = 720.0,
        value_parser = parse_dimension,
        help = "Viewport height used for auto-fit"
    )]
    pub viewport_height: f64,

    #[arg(
        long,
        env = "NEBULA_LOG_DIR",
        value_hint = clap::ValueHint::DirPath,
        help = "Also write daily rotated log files into this directory"
    )]
    pub log_dir: Option<PathBuf>,
}

/// Viewport sizes must be finite and positive.
fn parse_dimension(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid number {raw:?}: {e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{raw} is not a positive finite size"))
    }
}

impl TopologyArgs {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new().with_poll_interval(Duration::from_secs(self.poll_interval_secs))
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig::new(&self.api_origin)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("nebula"))
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig::default()
    }
}
