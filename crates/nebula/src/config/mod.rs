pub mod cli;
pub mod common;
pub mod daemon;
pub mod snapshot;

pub use cli::*;
pub use common::*;
pub use daemon::*;
pub use snapshot::*;
