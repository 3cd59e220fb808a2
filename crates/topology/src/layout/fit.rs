//! One-shot auto-fit of a settled layout into the viewport.

use serde::Serialize;

use crate::graph::Point;

/// Drawing surface size in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// allowance added around every node position
    pub node_radius: f64,
    /// margin added on each side of the padded box
    pub margin: f64,
    /// zoom ceiling for sparse graphs
    pub max_scale: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            node_radius: 24.0,
            margin: 60.0,
            max_scale: 1.8,
        }
    }
}

impl FitConfig {
    pub fn with_node_radius(mut self, radius: f64) -> Self {
        self.node_radius = radius;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_max_scale(mut self, scale: f64) -> Self {
        self.max_scale = scale;
        self
    }
}

/// `translate(viewport/2) scale(s) translate(-center)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitTransform {
    pub scale: f64,
    /// center of the fitted box in layout space
    pub center: Point,
    pub viewport: Viewport,
}

impl FitTransform {
    /// Map a layout-space point to screen space.
    pub fn apply(&self, point: Point) -> Point {
        let origin = self.viewport.center();
        Point::new(
            origin.x + (point.x - self.center.x) * self.scale,
            origin.y + (point.y - self.center.y) * self.scale,
        )
    }

    /// SVG `transform` attribute value.
    pub fn to_svg(&self) -> String {
        format!(
            "translate({},{}) scale({}) translate({},{})",
            self.viewport.width / 2.0,
            self.viewport.height / 2.0,
            self.scale,
            -self.center.x,
            -self.center.y
        )
    }
}

/// Fit `points` into `viewport`. Points with a non-finite coordinate are ignored;
/// returns `None` when nothing is left to fit or the viewport is unusable.
pub fn auto_fit(
    points: impl IntoIterator<Item = Point>,
    viewport: Viewport,
    config: &FitConfig,
) -> Option<FitTransform> {
    if !viewport.is_usable() {
        return None;
    }

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points.into_iter().filter(Point::is_finite) {
        min_x = min_x.min(p.x - config.node_radius);
        max_x = max_x.max(p.x + config.node_radius);
        min_y = min_y.min(p.y - config.node_radius);
        max_y = max_y.max(p.y + config.node_radius);
    }
    if min_x == f64::INFINITY {
        return None;
    }

    let box_width = max_x - min_x + config.margin * 2.0;
    let box_height = max_y - min_y + config.margin * 2.0;
    let scale = (viewport.width / box_width)
        .min(viewport.height / box_height)
        .min(config.max_scale);

    Some(FitTransform {
        scale,
        center: Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
        viewport,
    })
}
