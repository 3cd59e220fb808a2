//! Per-frame layout loop.
//!
//! The engine is moved into a tokio task that ticks it on a fixed frame period
//! and publishes every frame through a `watch` channel. Once settled the loop
//! stops ticking and only wakes for drag commands or cancellation, so a resting
//! graph costs nothing. Dropping the [`LayoutHandle`] cancels the task.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use super::FitTransform;
use super::LayoutEngine;
use super::Step;
use crate::graph::GraphLink;
use crate::graph::GraphNode;

/// ~60 frames per second
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(16);
/// Shortest frame period; shorter requests are raised to this.
pub const MIN_FRAME_PERIOD: Duration = Duration::from_millis(1);

const COMMAND_BUFFER: usize = 64;

/// Pointer interaction forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DragCommand {
    Begin { id: String },
    Move { id: String, x: f64, y: f64 },
    End { id: String },
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutFrame {
    /// incremented per published frame
    pub sequence: u64,
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub hub: Option<String>,
    pub transform: Option<FitTransform>,
    pub settled: bool,
}

impl LayoutFrame {
    pub fn capture(engine: &LayoutEngine, sequence: u64) -> Self {
        Self {
            sequence,
            nodes: engine.nodes().to_vec(),
            links: engine.links().to_vec(),
            hub: engine.hub().map(str::to_string),
            transform: engine.transform(),
            settled: engine.is_settled(),
        }
    }
}

/// Owner side of a running layout loop.
pub struct LayoutHandle {
    frames: watch::Receiver<Arc<LayoutFrame>>,
    commands: mpsc::Sender<DragCommand>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LayoutHandle {
    /// Latest published frame.
    pub fn latest(&self) -> Arc<LayoutFrame> {
        self.frames.borrow().clone()
    }

    pub fn frames(&self) -> watch::Receiver<Arc<LayoutFrame>> {
        self.frames.clone()
    }

    /// Sender for queueing drag commands without borrowing the handle.
    pub fn commands(&self) -> mpsc::Sender<DragCommand> {
        self.commands.clone()
    }

    /// Queue a drag command. Returns false once the loop has stopped.
    pub async fn send(&self, command: DragCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Cancel the loop and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LayoutHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Start the frame loop for `engine` on the current runtime. The loop stops
/// when `parent` is cancelled or the handle is dropped.
pub fn spawn(engine: LayoutEngine, frame_period: Duration, parent: &CancellationToken) -> LayoutHandle {
    let token = parent.child_token();
    let (frames_tx, frames_rx) = watch::channel(Arc::new(LayoutFrame::capture(&engine, 0)));
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);

    let task = tokio::spawn(run(
        engine,
        frame_period.max(MIN_FRAME_PERIOD),
        frames_tx,
        commands_rx,
        token.clone(),
    ));

    LayoutHandle {
        frames: frames_rx,
        commands: commands_tx,
        token,
        task: Some(task),
    }
}

async fn run(
    mut engine: LayoutEngine,
    frame_period: Duration,
    frames: watch::Sender<Arc<LayoutFrame>>,
    mut commands: mpsc::Receiver<DragCommand>,
    token: CancellationToken,
) {
    info!(node_count = engine.nodes().len(), "Layout loop started");
    let mut interval = tokio::time::interval(frame_period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sequence = 0u64;
    let mut commands_open = true;

    loop {
        let hot = !engine.is_settled();
        tokio::select! {
            _ = token.cancelled() => break,
            command = commands.recv(), if commands_open => match command {
                Some(command) => {
                    let was_settled = engine.is_settled();
                    if engine.apply(&command) {
                        if was_settled && !engine.is_settled() {
                            interval.reset();
                        }
                        sequence += 1;
                        frames.send_replace(Arc::new(LayoutFrame::capture(&engine, sequence)));
                    } else {
                        debug!(?command, "Drag command ignored");
                    }
                }
                None => commands_open = false,
            },
            _ = interval.tick(), if hot => {
                let step = engine.tick();
                sequence += 1;
                frames.send_replace(Arc::new(LayoutFrame::capture(&engine, sequence)));
                if let Step::Settled(fit) = step {
                    debug!(sequence, scale = ?fit.map(|t| t.scale), "Layout loop at rest");
                }
            }
        }
    }
    info!("Layout loop stopped");
}

#[cfg(test)]
mod tests {
    use api_types::StatusNode;
    use api_types::StatusRole;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::graph::build_from_status;
    use crate::layout::LayoutConfig;
    use crate::layout::Viewport;

    fn engine() -> LayoutEngine {
        let model = build_from_status(
            &[
                StatusNode::new("minibeast", StatusRole::Gateway, true),
                StatusNode::new("hermes", StatusRole::Storage, false),
                StatusNode::new("kratos", StatusRole::Ai, true),
            ],
            false,
        );
        LayoutEngine::new(model, Viewport::new(1280.0, 720.0), LayoutConfig::default())
    }

    #[test]
    fn drag_command_wire_format() {
        let command: DragCommand =
            serde_json::from_str(r#"{"phase": "move", "id": "hermes", "x": 1.5, "y": -2}"#)
                .expect("should parse drag command");
        assert_eq!(command, DragCommand::Move {
            id: "hermes".into(),
            x: 1.5,
            y: -2.0,
        });
        assert!(serde_json::from_str::<DragCommand>(r#"{"phase": "fling", "id": "x"}"#).is_err());
    }

    #[test(tokio::test(start_paused = true))]
    async fn loop_settles_and_reheats_on_drag() {
        let token = CancellationToken::new();
        let handle = spawn(engine(), DEFAULT_FRAME_PERIOD, &token);
        let mut frames = handle.frames();

        let settled = frames
            .wait_for(|f| f.settled)
            .await
            .expect("loop should publish")
            .clone();
        assert!(settled.transform.is_some());
        assert_eq!(settled.nodes.len(), 3);
        assert_eq!(settled.hub.as_deref(), Some("minibeast"));

        assert!(handle.send(DragCommand::Begin { id: "hermes".into() }).await);
        frames
            .wait_for(|f| !f.settled)
            .await
            .expect("drag should reheat");

        assert!(handle
            .send(DragCommand::Move {
                id: "hermes".into(),
                x: 50.0,
                y: 50.0,
            })
            .await);
        assert!(handle.send(DragCommand::End { id: "hermes".into() }).await);

        let resettled = frames
            .wait_for(|f| f.settled)
            .await
            .expect("loop should settle again")
            .clone();
        assert!(resettled.sequence > settled.sequence);
        assert!(resettled.nodes.iter().all(|n| n.pinned.is_none()));

        handle.shutdown().await;
    }

    #[test(tokio::test(start_paused = true))]
    async fn zero_frame_period_still_settles() {
        let token = CancellationToken::new();
        let handle = spawn(engine(), Duration::ZERO, &token);
        let mut frames = handle.frames();

        let settled = frames
            .wait_for(|f| f.settled)
            .await
            .expect("loop should publish")
            .clone();
        assert_eq!(settled.nodes.len(), 3);
        assert!(handle.is_running());

        handle.shutdown().await;
    }

    #[test(tokio::test(start_paused = true))]
    async fn parent_cancellation_stops_loop() {
        let token = CancellationToken::new();
        let handle = spawn(engine(), DEFAULT_FRAME_PERIOD, &token);

        token.cancel();
        assert!(!handle.is_running());
        handle.shutdown().await;
    }

    #[test(tokio::test(start_paused = true))]
    async fn dropping_handle_cancels_task() {
        let parent = CancellationToken::new();
        let handle = spawn(engine(), DEFAULT_FRAME_PERIOD, &parent);
        let mut frames = handle.frames();
        drop(handle);

        // sender side goes away once the task exits
        while frames.changed().await.is_ok() {}
        assert!(!parent.is_cancelled());
    }
}
