//! Graph model construction.
//!
//! A node list (status nodes, or legacy mesh peers) becomes a node set plus a
//! star-shaped link set anchored at a single hub. Every input node is kept;
//! offline and non-hub nodes are dimmed by their visual state, never dropped.
//!
//! Hub selection: the first node carrying the hub marker (`role == gateway` for
//! status nodes, `ID == "self"` for peers). Without a marker the first input
//! element is the hub, which makes the result order dependent in that case only.

use std::collections::HashMap;

use api_types::NodeRole;
use api_types::NodeStatus;
use api_types::StatusNode;
use api_types::StatusRole;
use api_types::TailscalePeer;
use serde::Serialize;

use crate::visual;
use crate::visual::LinkStyle;
use crate::visual::VisualState;

/// Peer ID the peers endpoint gives the local device.
pub const SELF_PEER_ID: &str = "self";

/// 2D position in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    /// empty when the input carries no address
    pub ip: String,
    pub status: NodeStatus,
    pub role: NodeRole,
    pub visual: VisualState,
    /// owned by the layout engine
    pub position: Point,
    /// set while the node is held by a drag
    pub pinned: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub link_style: LinkStyle,
    pub surge_speed: f64,
    pub particle_density: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    /// `None` only for an empty input
    pub hub: Option<String>,
}

impl GraphModel {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Build from status endpoint nodes.
pub fn build_from_status(nodes: &[StatusNode], reduced_motion: bool) -> GraphModel {
    let graph_nodes = nodes
        .iter()
        .map(|n| {
            let status = if n.online {
                NodeStatus::Online
            } else {
                NodeStatus::Offline
            };
            let role = NodeRole::from(n.role);
            GraphNode {
                id: n.name.clone(),
                name: n.name.clone(),
                ip: String::new(),
                status,
                role,
                visual: visual::map(status, role, reduced_motion),
                position: Point::ORIGIN,
                pinned: None,
            }
        })
        .collect();
    let marker = nodes.iter().position(|n| n.role == StatusRole::Gateway);
    assemble(graph_nodes, marker)
}

/// Build from legacy mesh peers.
pub fn build_from_peers(peers: &[TailscalePeer], reduced_motion: bool) -> GraphModel {
    let graph_nodes = peers
        .iter()
        .map(|p| {
            let status = p.status.unwrap_or(if p.online {
                NodeStatus::Online
            } else {
                NodeStatus::Offline
            });
            let role = p.role.unwrap_or(NodeRole::Host);
            GraphNode {
                id: p.id.clone(),
                name: peer_display_name(p),
                ip: p.tailscale_ips.first().cloned().unwrap_or_default(),
                status,
                role,
                visual: visual::map(status, role, reduced_motion),
                position: Point::ORIGIN,
                pinned: None,
            }
        })
        .collect();
    let marker = peers.iter().position(|p| p.id == SELF_PEER_ID);
    assemble(graph_nodes, marker)
}

fn peer_display_name(peer: &TailscalePeer) -> String {
    if !peer.host_name.is_empty() {
        return peer.host_name.clone();
    }
    peer.dns_name
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn assemble(nodes: Vec<GraphNode>, marker: Option<usize>) -> GraphModel {
    let Some(hub) = marker.or(if nodes.is_empty() { None } else { Some(0) }) else {
        return GraphModel::default();
    };
    let hub_id = nodes[hub].id.clone();

    // skip by position so a node repeating the hub id still gets its link
    let links = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != hub)
        .map(|(_, n)| GraphLink {
            source: hub_id.clone(),
            target: n.id.clone(),
            link_style: n.visual.link_style,
            surge_speed: n.visual.surge_speed,
            particle_density: n.visual.particle_density,
        })
        .collect();

    GraphModel {
        nodes,
        links,
        hub: Some(hub_id),
    }
}

/// Backing record a rendered node resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Selection<'a> {
    Status(&'a StatusNode),
    Peer(&'a TailscalePeer),
}

enum Backing {
    Status(Vec<StatusNode>),
    Peers(Vec<TailscalePeer>),
}

type StatusCallback = Box<dyn Fn(&StatusNode) + Send + Sync>;
type PeerCallback = Box<dyn Fn(&TailscalePeer) + Send + Sync>;

/// A built graph together with the records it was built from and the optional
/// selection callbacks.
pub struct GraphView {
    model: GraphModel,
    backing: Backing,
    index: HashMap<String, usize>,
    on_select_status_node: Option<StatusCallback>,
    on_select_peer: Option<PeerCallback>,
}

impl GraphView {
    pub fn from_status(nodes: Vec<StatusNode>, reduced_motion: bool) -> Self {
        let model = build_from_status(&nodes, reduced_motion);
        let index = first_index(nodes.iter().map(|n| n.name.as_str()));
        Self {
            model,
            backing: Backing::Status(nodes),
            index,
            on_select_status_node: None,
            on_select_peer: None,
        }
    }

    pub fn from_peers(peers: Vec<TailscalePeer>, reduced_motion: bool) -> Self {
        let model = build_from_peers(&peers, reduced_motion);
        let index = first_index(peers.iter().map(|p| p.id.as_str()));
        Self {
            model,
            backing: Backing::Peers(peers),
            index,
            on_select_status_node: None,
            on_select_peer: None,
        }
    }

    pub fn with_status_selection(
        mut self,
        callback: impl Fn(&StatusNode) + Send + Sync + 'static,
    ) -> Self {
        self.on_select_status_node = Some(Box::new(callback));
        self
    }

    pub fn with_peer_selection(
        mut self,
        callback: impl Fn(&TailscalePeer) + Send + Sync + 'static,
    ) -> Self {
        self.on_select_peer = Some(Box::new(callback));
        self
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn into_model(self) -> GraphModel {
        self.model
    }

    /// Backing record of a rendered node.
    pub fn resolve(&self, id: &str) -> Option<Selection<'_>> {
        let idx = *self.index.get(id)?;
        match &self.backing {
            Backing::Status(nodes) => nodes.get(idx).map(Selection::Status),
            Backing::Peers(peers) => peers.get(idx).map(Selection::Peer),
        }
    }

    /// Activate a rendered node: the matching callback gets the backing record.
    /// Returns whether a callback ran; an unknown id is a silent no-op.
    pub fn activate(&self, id: &str) -> bool {
        match self.resolve(id) {
            Some(Selection::Status(node)) => match &self.on_select_status_node {
                Some(callback) => {
                    callback(node);
                    true
                }
                None => false,
            },
            Some(Selection::Peer(peer)) => match &self.on_select_peer {
                Some(callback) => {
                    callback(peer);
                    true
                }
                None => false,
            },
            None => false,
        }
    }
}

fn first_index<'a>(ids: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, id) in ids.enumerate() {
        index.entry(id.to_string()).or_insert(i);
    }
    index
}
