use std::time::Duration;

use clap::Parser;

use crate::config::common::TopologyArgs;

#[derive(Parser, Clone, Debug)]
pub struct DaemonArgs {
    #[command(flatten)]
    pub topology: TopologyArgs,

    #[arg(
        long,
        env = "NEBULA_LISTEN_ADDR",
        default_value = "127.0.0.1:8090",
        help = "HTTP API server listen address"
    )]
    pub listen_addr: String,

    #[arg(
        long,
        default_value_t = 16,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Layout frame period in milliseconds"
    )]
    pub frame_period_ms: u64,
}

impl DaemonArgs {
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_period_ms)
    }
}
