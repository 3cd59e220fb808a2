//! Deterministic visual state for a node.
//!
//! [`map`] turns `(status, role, reduced_motion)` into the render parameters a
//! front end animates. It is a total pure function: the status tier sets the base
//! values, the role specializes them, and the reduced-motion preference strips
//! every animated parameter last while leaving opacity, color and styles intact.

use api_types::NodeRole;
use api_types::NodeStatus;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingState {
    Stable,
    Dashed,
    Collapsing,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    Flow,
    Thin,
    Dashed,
    None,
}

/// Continuous render parameters of one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualState {
    /// 0..=1
    pub opacity: f64,
    /// 0..=1
    pub glow_intensity: f64,
    /// multiplier on the base node radius
    pub glow_radius: f64,
    /// -1 cold .. +1 warm
    pub color_shift: f64,
    /// Hz, 0 = no pulse
    pub pulse_rate: f64,
    /// 0..=1
    pub flicker: f64,
    /// 0..=1
    pub distortion: f64,
    pub ring_state: RingState,
    pub link_style: LinkStyle,
    /// particle velocity multiplier
    pub surge_speed: f64,
    /// particles per link
    pub particle_density: u32,
}

const fn base(status: NodeStatus) -> VisualState {
    match status {
        NodeStatus::Online => VisualState {
            opacity: 1.0,
            glow_intensity: 0.7,
            glow_radius: 1.0,
            color_shift: 0.0,
            pulse_rate: 0.2,
            flicker: 0.0,
            distortion: 0.0,
            ring_state: RingState::Stable,
            link_style: LinkStyle::Flow,
            surge_speed: 1.0,
            particle_density: 1,
        },
        NodeStatus::Idle => VisualState {
            opacity: 0.6,
            glow_intensity: 0.3,
            glow_radius: 0.8,
            color_shift: -0.4,
            pulse_rate: 0.08,
            flicker: 0.0,
            distortion: 0.0,
            ring_state: RingState::Stable,
            link_style: LinkStyle::Thin,
            surge_speed: 0.4,
            particle_density: 1,
        },
        NodeStatus::Busy => VisualState {
            opacity: 1.0,
            glow_intensity: 1.0,
            glow_radius: 1.4,
            color_shift: 0.5,
            pulse_rate: 1.8,
            flicker: 0.0,
            distortion: 0.0,
            ring_state: RingState::Stable,
            link_style: LinkStyle::Flow,
            surge_speed: 3.0,
            particle_density: 3,
        },
        NodeStatus::Degraded => VisualState {
            opacity: 0.8,
            glow_intensity: 0.5,
            glow_radius: 0.9,
            color_shift: -0.1,
            pulse_rate: 0.0,
            flicker: 1.0,
            distortion: 0.4,
            ring_state: RingState::Stable,
            link_style: LinkStyle::Dashed,
            surge_speed: 0.6,
            particle_density: 2,
        },
        // dimmed with a dashed ring, never hidden
        NodeStatus::Offline => VisualState {
            opacity: 0.4,
            glow_intensity: 0.1,
            glow_radius: 0.6,
            color_shift: -0.5,
            pulse_rate: 0.0,
            flicker: 0.0,
            distortion: 0.0,
            ring_state: RingState::Dashed,
            link_style: LinkStyle::Dashed,
            surge_speed: 0.0,
            particle_density: 0,
        },
    }
}

/// Map a node's status and role to its visual state.
pub fn map(status: NodeStatus, role: NodeRole, reduced_motion: bool) -> VisualState {
    let mut state = base(status);

    match role {
        NodeRole::Gateway => {
            state.glow_radius *= 1.5;
            state.glow_intensity += 0.2;
        }
        NodeRole::Gpu => {
            state.glow_radius *= 1.2;
            if status == NodeStatus::Busy {
                state.color_shift += 0.2;
            }
        }
        _ => {}
    }
    state.glow_intensity = state.glow_intensity.clamp(0.0, 1.0);
    state.color_shift = state.color_shift.clamp(-1.0, 1.0);

    if reduced_motion {
        state.pulse_rate = 0.0;
        state.flicker = 0.0;
        state.distortion = 0.0;
        state.surge_speed = 0.0;
        state.particle_density = state.particle_density.min(1);
    }

    state
}
