//! Shared API type definitions
//!
//! This crate contains the wire types exchanged between the status endpoint, the
//! topology store and the rendering front end: status nodes, the legacy mesh peer
//! record, the persisted cache record and the published topology state.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Role reported by the status endpoint for a mesh node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusRole {
    Gateway,
    Storage,
    Ai,
    Gpu,
}

impl StatusRole {
    /// Parse a role name, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gateway" => Some(Self::Gateway),
            "storage" => Some(Self::Storage),
            "ai" => Some(Self::Ai),
            "gpu" => Some(Self::Gpu),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatusRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(NodeRole::from(*self).as_str())
    }
}

/// One node as delivered by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNode {
    /// Unique node name, also used as graph identity
    pub name: String,
    pub role: StatusRole,
    pub online: bool,
}

impl StatusNode {
    pub fn new(name: impl Into<String>, role: StatusRole, online: bool) -> Self {
        Self {
            name: name.into(),
            role,
            online,
        }
    }
}

/// Where the status endpoint got its node list from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSourceKind {
    /// The authoritative status backend
    #[default]
    #[serde(alias = "astra-core")]
    Primary,
    /// The endpoint's own local fallback
    #[serde(alias = "nebula-fallback")]
    Fallback,
}

/// Connectivity state used by the visual mapper.
///
/// Unrecognized values deserialize to [`NodeStatus::Offline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Idle,
    Busy,
    Degraded,
    #[serde(other)]
    Offline,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 5] = [
        NodeStatus::Online,
        NodeStatus::Idle,
        NodeStatus::Busy,
        NodeStatus::Degraded,
        NodeStatus::Offline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Idle => "idle",
            NodeStatus::Busy => "busy",
            NodeStatus::Degraded => "degraded",
            NodeStatus::Offline => "offline",
        }
    }

    /// Resolve a status name. Anything unrecognized is offline.
    pub fn from_name(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => NodeStatus::Online,
            "idle" => NodeStatus::Idle,
            "busy" => NodeStatus::Busy,
            "degraded" => NodeStatus::Degraded,
            _ => NodeStatus::Offline,
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role classification of a rendered node.
///
/// Covers both status-endpoint roles and the legacy peer roles. Unrecognized values
/// deserialize to [`NodeRole::Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    AiHost,
    Gpu,
    Exit,
    Ephemeral,
    Gateway,
    Storage,
    Ai,
    #[serde(other)]
    Host,
}

impl NodeRole {
    pub const ALL: [NodeRole; 8] = [
        NodeRole::AiHost,
        NodeRole::Gpu,
        NodeRole::Exit,
        NodeRole::Ephemeral,
        NodeRole::Gateway,
        NodeRole::Storage,
        NodeRole::Ai,
        NodeRole::Host,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Host => "host",
            NodeRole::AiHost => "ai_host",
            NodeRole::Gpu => "gpu",
            NodeRole::Exit => "exit",
            NodeRole::Ephemeral => "ephemeral",
            NodeRole::Gateway => "gateway",
            NodeRole::Storage => "storage",
            NodeRole::Ai => "ai",
        }
    }
}

impl From<StatusRole> for NodeRole {
    fn from(role: StatusRole) -> Self {
        match role {
            StatusRole::Gateway => NodeRole::Gateway,
            StatusRole::Storage => NodeRole::Storage,
            StatusRole::Ai => NodeRole::Ai,
            StatusRole::Gpu => NodeRole::Gpu,
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service discovered on a peer port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerService {
    pub name: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MemoryStats {
    pub percent: f64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DiskStats {
    pub percent: f64,
}

/// Host statistics attached to a peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HardwareStats {
    pub cpu_usage: f64,
    pub memory: MemoryStats,
    pub disk: DiskStats,
    #[serde(default)]
    pub platform: String,
}

/// Legacy mesh peer record, as normalized by the peers endpoint.
///
/// The peer whose `ID` is `"self"` is the local device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailscalePeer {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "HostName", default)]
    pub host_name: String,
    #[serde(rename = "DNSName", default)]
    pub dns_name: String,
    #[serde(rename = "TailscaleIPs", default)]
    pub tailscale_ips: Vec<String>,
    #[serde(rename = "Online", default)]
    pub online: bool,
    #[serde(rename = "OS", default)]
    pub os: String,
    #[serde(rename = "Active", default)]
    pub active: bool,
    #[serde(rename = "Services", default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<PeerService>>,
    #[serde(rename = "Hardware", default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,
}

/// Persisted node list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub nodes: Vec<StatusNode>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Topology state with metadata for UI feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyState {
    /// Never empty once initialized
    pub nodes: Vec<StatusNode>,
    /// True only when `nodes` came from the latest successful primary fetch
    pub is_live: bool,
    /// Time of the last successful fetch
    pub last_updated: Option<DateTime<Utc>>,
    /// Non-blocking advisory for a warning badge
    pub error: Option<String>,
}
