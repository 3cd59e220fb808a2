use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::config::daemon::DaemonArgs;
use crate::config::snapshot::SnapshotArgs;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the status API and serve the live topology graph
    Daemon(Box<DaemonArgs>),
    /// Fetch once, settle the layout and print the final frame as JSON
    Snapshot(SnapshotArgs),
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn daemon_defaults() {
        let cli = Cli::try_parse_from(["nebula", "daemon"]).expect("should parse");
        let Commands::Daemon(args) = cli.command else {
            panic!("expected daemon command");
        };
        assert_eq!(args.listen_addr, "127.0.0.1:8090");
        assert_eq!(args.frame_period_ms, 16);
        assert_eq!(args.topology.poll_interval_secs, 30);
        assert_eq!(args.topology.request_timeout_secs, 5);
        assert!(!args.topology.reduced_motion);
    }

    #[test]
    fn snapshot_flags() {
        let cli = Cli::try_parse_from([
            "nebula",
            "snapshot",
            "--api-origin",
            "https://mesh.example.com/",
            "--peers-file",
            "/tmp/peers.json",
            "--reduced-motion",
            "--viewport-width",
            "800",
        ])
        .expect("should parse");
        let Commands::Snapshot(args) = cli.command else {
            panic!("expected snapshot command");
        };
        assert!(args.topology.reduced_motion);
        assert_eq!(args.topology.viewport().width, 800.0);
        assert_eq!(
            args.topology.source_config().api_origin,
            "https://mesh.example.com"
        );
        assert_eq!(
            args.peers_file.as_deref().and_then(|p| p.to_str()),
            Some("/tmp/peers.json")
        );
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(Cli::try_parse_from(["nebula", "daemon", "--poll-interval-secs", "0"]).is_err());
    }

    #[test]
    fn unusable_viewport_sizes_are_rejected() {
        for flag in [
            "--viewport-width=NaN",
            "--viewport-width=inf",
            "--viewport-width=-5",
            "--viewport-width=0",
            "--viewport-height=-720",
            "--viewport-height=wide",
        ] {
            assert!(
                Cli::try_parse_from(["nebula", "snapshot", flag]).is_err(),
                "{flag} should be rejected"
            );
        }

        let cli = Cli::try_parse_from(["nebula", "snapshot", "--viewport-height=480.5"])
            .expect("should parse");
        let Commands::Snapshot(args) = cli.command else {
            panic!("expected snapshot command");
        };
        assert_eq!(args.topology.viewport().height, 480.5);
    }
}
