//! Force-directed layout.
//!
//! Iterative relaxation over the graph model: a link spring pulling
//! each linked pair toward a fixed distance, all-pairs repulsion, and a centering
//! shift toward the viewport center. Every tick multiplies the forces by `alpha`,
//! which decays geometrically toward `alpha_target`; the simulation settles when
//! alpha falls below `alpha_min`, at which point the auto-fit transform is
//! recomputed.
//!
//! The engine is a plain value with no clock or display attached. [`driver`]
//! runs it per frame on a tokio task.
//!
//! # Usage
//! ```ignore
//! let mut engine = LayoutEngine::new(model, Viewport::new(1280.0, 720.0), LayoutConfig::default());
//! while let Step::Running = engine.tick() {}
//! let fit = engine.transform();
//! ```

pub mod driver;
pub mod fit;

use std::collections::HashMap;
use std::collections::HashSet;
use std::f64::consts::PI;

use tracing::debug;

pub use self::driver::DragCommand;
pub use self::driver::LayoutFrame;
pub use self::driver::LayoutHandle;
pub use self::fit::auto_fit;
pub use self::fit::FitConfig;
pub use self::fit::FitTransform;
pub use self::fit::Viewport;
use crate::graph::GraphLink;
use crate::graph::GraphModel;
use crate::graph::GraphNode;
use crate::graph::Point;

const INITIAL_RADIUS: f64 = 10.0;

/// Simulation constants.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// rest length of every link
    pub link_distance: f64,
    /// negative values repel
    pub charge_strength: f64,
    /// lower bound on the pair distance used by the charge force
    pub distance_min: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    /// fraction of velocity lost per tick
    pub velocity_decay: f64,
    /// alpha target held while any node is dragged
    pub drag_alpha_target: f64,
    pub fit: FitConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            link_distance: 220.0,
            charge_strength: -800.0,
            distance_min: 1.0,
            alpha_min,
            // reach alpha_min from 1 in 300 ticks
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            fit: FitConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn with_link_distance(mut self, distance: f64) -> Self {
        self.link_distance = distance;
        self
    }

    pub fn with_charge_strength(mut self, strength: f64) -> Self {
        self.charge_strength = strength;
        self
    }

    pub fn with_alpha_decay(mut self, decay: f64) -> Self {
        self.alpha_decay = decay;
        self
    }

    pub fn with_fit(mut self, fit: FitConfig) -> Self {
        self.fit = fit;
        self
    }
}

/// Result of one [`LayoutEngine::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Positions moved, the simulation is still hot
    Running,
    /// This tick cooled the simulation below `alpha_min`; carries the new fit
    Settled(Option<FitTransform>),
    /// Already at rest, nothing moved
    Idle,
}

/// Linear congruential generator for the tie-breaking jiggle, seeded so that a
/// given model always relaxes to the same positions.
#[derive(Debug, Clone)]
struct Lcg(u64);

impl Lcg {
    const A: u64 = 1_664_525;
    const C: u64 = 1_013_904_223;
    const M: u64 = 1 << 32;

    fn next(&mut self) -> f64 {
        self.0 = (Self::A * self.0 + Self::C) % Self::M;
        self.0 as f64 / Self::M as f64
    }

    fn jiggle(&mut self) -> f64 {
        (self.next() - 0.5) * 1e-6
    }
}

#[derive(Debug, Clone)]
struct Spring {
    source: usize,
    target: usize,
    strength: f64,
    /// share of the correction applied to the target
    bias: f64,
}

pub struct LayoutEngine {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    hub: Option<String>,
    springs: Vec<Spring>,
    velocities: Vec<Point>,
    index: HashMap<String, usize>,
    dragging: HashSet<usize>,
    viewport: Viewport,
    config: LayoutConfig,
    alpha: f64,
    alpha_target: f64,
    settled: bool,
    transform: Option<FitTransform>,
    rng: Lcg,
}

impl LayoutEngine {
    /// Take ownership of a freshly built model and place its nodes on a
    /// phyllotaxis spiral around the origin.
    pub fn new(model: GraphModel, viewport: Viewport, config: LayoutConfig) -> Self {
        let GraphModel { mut nodes, links, hub } = model;

        let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
        for (i, node) in nodes.iter_mut().enumerate() {
            node.position = match node.pinned {
                Some(p) => p,
                None => {
                    let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
                    let angle = i as f64 * golden_angle;
                    Point::new(radius * angle.cos(), radius * angle.sin())
                }
            };
        }

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id.clone()).or_insert(i);
        }

        let springs = resolve_springs(&links, &index, nodes.len());
        debug!(
            node_count = nodes.len(),
            link_count = springs.len(),
            "Layout engine created"
        );

        Self {
            velocities: vec![Point::ORIGIN; nodes.len()],
            nodes,
            links,
            hub,
            springs,
            index,
            dragging: HashSet::new(),
            viewport,
            config,
            alpha: 1.0,
            alpha_target: 0.0,
            settled: false,
            transform: None,
            rng: Lcg(1),
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    pub fn hub(&self) -> Option<&str> {
        self.hub.as_deref()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Fit computed on the most recent settle.
    pub fn transform(&self) -> Option<FitTransform> {
        self.transform
    }

    /// Advance one tick unless already at rest.
    pub fn tick(&mut self) -> Step {
        if self.settled {
            return Step::Idle;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        self.apply_links();
        self.apply_charge();
        self.apply_center();
        self.integrate();

        if self.alpha < self.config.alpha_min {
            self.settled = true;
            self.transform = auto_fit(
                self.nodes.iter().map(|n| n.position),
                self.viewport,
                &self.config.fit,
            );
            debug!(scale = ?self.transform.map(|t| t.scale), "Layout settled");
            return Step::Settled(self.transform);
        }
        Step::Running
    }

    /// Tick until settled or `max_ticks` ticks have run; returns whether the
    /// engine is at rest.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> bool {
        for _ in 0..max_ticks {
            if self.tick() != Step::Running {
                break;
            }
        }
        self.settled
    }

    /// Grab a node: pin it where it is and reheat the simulation if this is the
    /// first active drag.
    pub fn begin_drag(&mut self, id: &str) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        if self.dragging.is_empty() {
            self.alpha_target = self.config.drag_alpha_target;
            self.settled = false;
        }
        self.dragging.insert(idx);
        self.nodes[idx].pinned = Some(self.nodes[idx].position);
        true
    }

    /// Move a grabbed node. Ignored for nodes that are not being dragged.
    pub fn drag_to(&mut self, id: &str, position: Point) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        if !self.dragging.contains(&idx) || !position.is_finite() {
            return false;
        }
        self.nodes[idx].pinned = Some(position);
        true
    }

    /// Release a grabbed node; the simulation cools down once nothing is held.
    pub fn end_drag(&mut self, id: &str) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        if !self.dragging.remove(&idx) {
            return false;
        }
        self.nodes[idx].pinned = None;
        if self.dragging.is_empty() {
            self.alpha_target = 0.0;
        }
        true
    }

    pub fn apply(&mut self, command: &DragCommand) -> bool {
        match command {
            DragCommand::Begin { id } => self.begin_drag(id),
            DragCommand::Move { id, x, y } => self.drag_to(id, Point::new(*x, *y)),
            DragCommand::End { id } => self.end_drag(id),
        }
    }

    fn apply_links(&mut self) {
        let Self {
            nodes,
            springs,
            velocities,
            rng,
            config,
            alpha,
            ..
        } = self;

        for spring in springs.iter() {
            let (s, t) = (spring.source, spring.target);
            let mut x = nodes[t].position.x + velocities[t].x - nodes[s].position.x - velocities[s].x;
            let mut y = nodes[t].position.y + velocities[t].y - nodes[s].position.y - velocities[s].y;
            if x == 0.0 {
                x = rng.jiggle();
            }
            if y == 0.0 {
                y = rng.jiggle();
            }
            let l = (x * x + y * y).sqrt();
            let k = (l - config.link_distance) / l * *alpha * spring.strength;
            x *= k;
            y *= k;

            velocities[t].x -= x * spring.bias;
            velocities[t].y -= y * spring.bias;
            velocities[s].x += x * (1.0 - spring.bias);
            velocities[s].y += y * (1.0 - spring.bias);
        }
    }

    fn apply_charge(&mut self) {
        let Self {
            nodes,
            velocities,
            rng,
            config,
            alpha,
            ..
        } = self;
        let distance_min2 = config.distance_min * config.distance_min;

        for i in 0..nodes.len() {
            for j in 0..nodes.len() {
                if i == j {
                    continue;
                }
                let mut x = nodes[j].position.x - nodes[i].position.x;
                let mut y = nodes[j].position.y - nodes[i].position.y;
                let mut l = x * x + y * y;
                if x == 0.0 {
                    x = rng.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = rng.jiggle();
                    l += y * y;
                }
                if l < distance_min2 {
                    l = (distance_min2 * l).sqrt();
                }
                velocities[i].x += x * config.charge_strength * *alpha / l;
                velocities[i].y += y * config.charge_strength * *alpha / l;
            }
        }
    }

    fn apply_center(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        let n = self.nodes.len() as f64;
        let center = self.viewport.center();
        let (sum_x, sum_y) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(x, y), node| (x + node.position.x, y + node.position.y));
        let shift_x = sum_x / n - center.x;
        let shift_y = sum_y / n - center.y;
        for node in &mut self.nodes {
            node.position.x -= shift_x;
            node.position.y -= shift_y;
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay;
        for (node, velocity) in self.nodes.iter_mut().zip(self.velocities.iter_mut()) {
            match node.pinned {
                Some(p) => {
                    node.position = p;
                    *velocity = Point::ORIGIN;
                }
                None => {
                    velocity.x *= keep;
                    velocity.y *= keep;
                    node.position.x += velocity.x;
                    node.position.y += velocity.y;
                }
            }
        }
    }
}

/// Spring strength is `1 / min(degree)` of its endpoints and the bias shifts the
/// correction toward the less connected end.
fn resolve_springs(links: &[GraphLink], index: &HashMap<String, usize>, node_count: usize) -> Vec<Spring> {
    let endpoints: Vec<(usize, usize)> = links
        .iter()
        .filter_map(|link| Some((*index.get(&link.source)?, *index.get(&link.target)?)))
        .filter(|(s, t)| s != t)
        .collect();

    let mut degree = vec![0usize; node_count];
    for &(s, t) in &endpoints {
        degree[s] += 1;
        degree[t] += 1;
    }

    endpoints
        .into_iter()
        .map(|(source, target)| {
            let (ds, dt) = (degree[source] as f64, degree[target] as f64);
            Spring {
                source,
                target,
                strength: 1.0 / ds.min(dt),
                bias: ds / (ds + dt),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use api_types::StatusNode;
    use api_types::StatusRole;
    use similar_asserts::assert_eq;

    use super::*;
    use crate::graph::build_from_status;

    fn model(names: &[(&str, StatusRole)]) -> GraphModel {
        let nodes: Vec<_> = names
            .iter()
            .map(|(name, role)| StatusNode::new(*name, *role, true))
            .collect();
        build_from_status(&nodes, false)
    }

    fn engine(names: &[(&str, StatusRole)]) -> LayoutEngine {
        LayoutEngine::new(model(names), Viewport::new(1280.0, 720.0), LayoutConfig::default())
    }

    fn mean(engine: &LayoutEngine) -> Point {
        let n = engine.nodes().len() as f64;
        let (x, y) = engine
            .nodes()
            .iter()
            .fold((0.0, 0.0), |(x, y), node| (x + node.position.x, y + node.position.y));
        Point::new(x / n, y / n)
    }

    #[test]
    fn alpha_decay_reaches_min_in_three_hundred_ticks() {
        let mut engine = engine(&[("a", StatusRole::Gateway), ("b", StatusRole::Storage)]);
        let mut ticks = 0;
        while engine.tick() == Step::Running {
            ticks += 1;
        }
        assert!((299..=301).contains(&ticks), "settled after {ticks} ticks");
        assert!(engine.alpha() < 0.001);
        assert_eq!(engine.tick(), Step::Idle);
    }

    #[test]
    fn isolated_nodes_still_get_positions() {
        let model = GraphModel {
            links: Vec::new(),
            ..model(&[
                ("hermes", StatusRole::Storage),
                ("kratos", StatusRole::Ai),
                ("hades", StatusRole::Gpu),
            ])
        };
        let mut isolated =
            LayoutEngine::new(model, Viewport::new(1280.0, 720.0), LayoutConfig::default());
        assert!(isolated.run_until_settled(1_000));

        let nodes = isolated.nodes();
        assert!(nodes.iter().all(|n| n.position.is_finite()));
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                assert!(a.position.distance(b.position) > 50.0);
            }
        }
        let center = mean(&isolated);
        assert!((center.x - 640.0).abs() < 1e-3 && (center.y - 360.0).abs() < 1e-3);
    }

    #[test]
    fn linked_pair_relaxes_near_link_distance() {
        let mut engine = engine(&[("minibeast", StatusRole::Gateway), ("hermes", StatusRole::Storage)]);
        assert!(engine.run_until_settled(1_000));

        let a = engine.node("minibeast").expect("hub").position;
        let b = engine.node("hermes").expect("leaf").position;
        let d = a.distance(b);
        // spring rest length plus the repulsion at equilibrium
        assert!((210.0..250.0).contains(&d), "distance {d}");
    }

    #[test]
    fn settle_produces_fit_within_ceiling() {
        let mut engine = engine(&[
            ("minibeast", StatusRole::Gateway),
            ("hermes", StatusRole::Storage),
            ("kratos", StatusRole::Ai),
            ("hades", StatusRole::Gpu),
        ]);
        let mut last = Step::Running;
        for _ in 0..1_000 {
            last = engine.tick();
            if last != Step::Running {
                break;
            }
        }
        let Step::Settled(Some(fit)) = last else {
            panic!("expected a settle with a fit, got {last:?}");
        };
        assert!(fit.scale <= 1.8);
        assert_eq!(engine.transform(), Some(fit));
    }

    #[test]
    fn single_node_settles_at_center() {
        let mut engine = engine(&[("solo", StatusRole::Storage)]);
        assert!(engine.run_until_settled(1_000));
        let p = engine.nodes()[0].position;
        assert!((p.x - 640.0).abs() < 1e-6 && (p.y - 360.0).abs() < 1e-6);
        assert_eq!(engine.transform().map(|t| t.scale), Some(1.8));
    }

    #[test]
    fn empty_model_settles_without_fit() {
        let mut engine = LayoutEngine::new(GraphModel::default(), Viewport::default(), LayoutConfig::default());
        assert!(engine.run_until_settled(1_000));
        assert_eq!(engine.transform(), None);
    }

    #[test]
    fn relaxation_is_deterministic() {
        let names = [
            ("minibeast", StatusRole::Gateway),
            ("hermes", StatusRole::Storage),
            ("kratos", StatusRole::Ai),
        ];
        let mut first = engine(&names);
        let mut second = engine(&names);
        first.run_until_settled(1_000);
        second.run_until_settled(1_000);
        assert_eq!(first.nodes(), second.nodes());
    }

    #[test]
    fn drag_pins_reheats_and_releases() {
        let mut engine = engine(&[
            ("minibeast", StatusRole::Gateway),
            ("hermes", StatusRole::Storage),
            ("kratos", StatusRole::Ai),
        ]);
        assert!(engine.run_until_settled(1_000));
        let first_fit = engine.transform();

        assert!(engine.begin_drag("hermes"));
        assert!(!engine.is_settled());
        let grabbed = engine.node("hermes").expect("hermes").pinned;
        assert_eq!(grabbed, Some(engine.node("hermes").expect("hermes").position));

        let target = Point::new(1100.0, 100.0);
        assert!(engine.drag_to("hermes", target));
        for _ in 0..60 {
            assert_eq!(engine.tick(), Step::Running);
        }
        assert_eq!(engine.node("hermes").expect("hermes").position, target);
        assert!(engine.alpha() > 0.2);

        assert!(engine.end_drag("hermes"));
        assert_eq!(engine.node("hermes").expect("hermes").pinned, None);
        assert!(engine.run_until_settled(1_000));
        assert!(engine.transform().is_some());
        assert!(engine.transform() != first_fit);
    }

    #[test]
    fn drag_of_unknown_or_ungrabbed_node_is_ignored() {
        let mut engine = engine(&[("minibeast", StatusRole::Gateway), ("hermes", StatusRole::Storage)]);
        assert!(!engine.begin_drag("ghost"));
        assert!(!engine.drag_to("hermes", Point::new(1.0, 1.0)));
        assert!(!engine.end_drag("hermes"));

        assert!(engine.begin_drag("hermes"));
        assert!(!engine.drag_to("hermes", Point::new(f64::NAN, 0.0)));
    }

    #[test]
    fn second_drag_keeps_simulation_hot() {
        let mut engine = engine(&[
            ("minibeast", StatusRole::Gateway),
            ("hermes", StatusRole::Storage),
            ("kratos", StatusRole::Ai),
        ]);
        engine.begin_drag("hermes");
        engine.begin_drag("kratos");
        engine.end_drag("hermes");
        for _ in 0..400 {
            engine.tick();
        }
        assert!(!engine.is_settled());

        engine.end_drag("kratos");
        assert!(engine.run_until_settled(1_000));
    }

    #[test]
    fn commands_dispatch_to_drag_methods() {
        let mut engine = engine(&[("minibeast", StatusRole::Gateway), ("hermes", StatusRole::Storage)]);
        assert!(engine.apply(&DragCommand::Begin { id: "hermes".into() }));
        assert!(engine.apply(&DragCommand::Move {
            id: "hermes".into(),
            x: 5.0,
            y: 6.0,
        }));
        assert_eq!(engine.node("hermes").expect("hermes").pinned, Some(Point::new(5.0, 6.0)));
        assert!(engine.apply(&DragCommand::End { id: "hermes".into() }));
    }

    #[test]
    fn star_springs_split_by_degree() {
        let engine = engine(&[
            ("minibeast", StatusRole::Gateway),
            ("hermes", StatusRole::Storage),
            ("kratos", StatusRole::Ai),
        ]);
        assert_eq!(engine.springs.len(), 2);
        for spring in &engine.springs {
            assert_eq!(spring.strength, 1.0);
            assert!((spring.bias - 2.0 / 3.0).abs() < 1e-12);
        }
    }
}
