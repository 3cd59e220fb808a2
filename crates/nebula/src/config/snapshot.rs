use std::path::PathBuf;

use clap::Parser;

use crate::config::common::TopologyArgs;

#[derive(Parser, Clone, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub topology: TopologyArgs,

    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Lay out a legacy peer list (JSON array) instead of fetching status nodes"
    )]
    pub peers_file: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = 5_000,
        help = "Upper bound on simulation ticks before giving up on settling"
    )]
    pub max_ticks: usize,

    #[arg(long, default_value_t = false, help = "Pretty-print the JSON frame")]
    pub pretty: bool,
}
