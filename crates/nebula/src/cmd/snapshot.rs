use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use api_types::TailscalePeer;
use topology::build_from_peers;
use topology::build_from_status;
use topology::layout::LayoutFrame;
use topology::GraphModel;
use topology::LayoutEngine;
use utils::logging;
use utils::version;

use crate::app::services::build_store;
use crate::config::SnapshotArgs;

pub async fn run_snapshot(args: SnapshotArgs) -> Result<()> {
    let _guard = logging::init(args.topology.log_dir.as_deref());

    tracing::info!("Starting nebula snapshot {}", &**version::VERSION);

    let model = match &args.peers_file {
        Some(path) => {
            let peers = load_peers(path)?;
            build_from_peers(&peers, args.topology.reduced_motion)
        }
        None => {
            let store = build_store(&args.topology)?;
            let outcome = store.fetch_cycle().await;
            let snapshot = store.snapshot();
            tracing::info!(
                ?outcome,
                node_count = snapshot.state.nodes.len(),
                error = snapshot.state.error.as_deref().unwrap_or_default(),
                "Status fetched"
            );
            build_from_status(&snapshot.state.nodes, args.topology.reduced_motion)
        }
    };

    let frame = settle(model, &args);
    let json = if args.pretty {
        serde_json::to_string_pretty(&frame)?
    } else {
        serde_json::to_string(&frame)?
    };
    println!("{json}");
    Ok(())
}

/// Legacy peer list, a JSON array of peer records.
pub fn load_peers(path: &Path) -> Result<Vec<TailscalePeer>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read peers file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse peers file {}", path.display()))
}

/// Run the layout to rest and capture the final frame.
pub fn settle(model: GraphModel, args: &SnapshotArgs) -> LayoutFrame {
    let mut engine = LayoutEngine::new(
        model,
        args.topology.viewport(),
        args.topology.layout_config(),
    );
    if !engine.run_until_settled(args.max_ticks) {
        tracing::warn!(
            max_ticks = args.max_ticks,
            alpha = engine.alpha(),
            "Layout did not settle, emitting last positions"
        );
    }
    LayoutFrame::capture(&engine, 0)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use similar_asserts::assert_eq;

    use super::*;

    fn args(extra: &[&str]) -> SnapshotArgs {
        let mut argv = vec!["snapshot"];
        argv.extend_from_slice(extra);
        SnapshotArgs::try_parse_from(argv).expect("should parse")
    }

    #[test]
    fn peers_file_settles_into_fitted_frame() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[
                {{"ID": "self", "HostName": "minibeast", "TailscaleIPs": ["100.64.0.1"], "Online": true}},
                {{"ID": "n2", "HostName": "", "DNSName": "hermes.tail.ts.net.", "Online": false}},
                {{"ID": "n3", "HostName": "kratos", "Online": true, "status": "degraded", "role": "ai"}}
            ]"#
        )
        .expect("write peers");

        let peers = load_peers(file.path()).expect("peers should load");
        assert_eq!(peers.len(), 3);

        let args = args(&[]);
        let frame = settle(build_from_peers(&peers, false), &args);
        assert!(frame.settled);
        assert_eq!(frame.hub.as_deref(), Some("self"));
        assert_eq!(frame.links.len(), 2);
        let names: Vec<_> = frame.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["minibeast", "hermes", "kratos"]);

        let fit = frame.transform.expect("settled frame carries a fit");
        assert!(fit.scale <= 1.8);
    }

    #[test]
    fn missing_peers_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_peers(&dir.path().join("absent.json")).expect_err("should fail");
        assert!(err.to_string().contains("read peers file"));
    }

    #[test]
    fn tick_cap_still_emits_frame() {
        let peers: Vec<TailscalePeer> =
            serde_json::from_str(r#"[{"ID": "self", "HostName": "a"}, {"ID": "b", "HostName": "b"}]"#)
                .expect("peers parse");
        let frame = settle(build_from_peers(&peers, true), &args(&["--max-ticks", "3"]));
        assert!(!frame.settled);
        assert_eq!(frame.nodes.len(), 2);
    }
}
