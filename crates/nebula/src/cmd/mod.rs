//! Command layer - entry points for the nebula subcommands

pub mod daemon;
pub mod snapshot;

pub use daemon::run_daemon;
pub use snapshot::run_snapshot;
