use serde::{Deserialize, Serialize};
use tilelane_protocol::Rect;
use tracing::trace;

use crate::config::TimelineConfig;
use crate::model::{ReferenceMarker, ReferenceSide, Timestamp};
use crate::scale::TimeScale;
use crate::viewport::{ChangeOrigin, Viewport, ViewportChange};

/// Selection window on the minimap, in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub min: Timestamp,
    pub max: Timestamp,
    /// The last snap should be animated by the renderer.
    pub transition: bool,
}

impl Brush {
    pub fn is_empty(&self) -> bool {
        self.max <= self.min
    }
}

/// Pixel geometry of the brush and the shaded regions around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushGeometry {
    pub left: f64,
    pub right: f64,
    /// Shaded region before the brush, `(x, width)`.
    pub inverse_before: (f64, f64),
    pub inverse_after: (f64, f64),
    pub west_handle: Rect,
    pub east_handle: Rect,
}

/// Pixel geometry of a reference marker: its line and the shaded region on
/// its side, both clamped to the minimap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGeometry {
    pub side: ReferenceSide,
    /// Unclamped position of the marker line.
    pub x: f64,
    /// Shaded region, `(x, width)`.
    pub area: (f64, f64),
}

impl ReferenceGeometry {
    /// The line falls on the minimap.
    pub fn line_visible(&self, width: f64) -> bool {
        (0.0..=width).contains(&self.x)
    }
}

/// Keeps the minimap brush and the main viewport consistent.
///
/// Viewport changes that originated from the brush are not mirrored back,
/// and brush drags report a time extent for the caller to apply with origin
/// [`ChangeOrigin::Brush`].
#[derive(Debug, Clone)]
pub struct MinimapSynchronizer {
    scale: TimeScale,
    brush: Brush,
    dragging: bool,
    height: f64,
    border_size: f64,
    handle_size: f64,
    references: Vec<ReferenceMarker>,
    today: Option<Timestamp>,
}

impl MinimapSynchronizer {
    /// `outer_range` is the full reachable window; `viewport` seeds the brush.
    pub fn new(config: &TimelineConfig, outer_range: (Timestamp, Timestamp), viewport: Viewport) -> Self {
        Self {
            scale: TimeScale::new(outer_range, (0.0, 0.0)),
            brush: Brush {
                min: viewport.min,
                max: viewport.max,
                transition: false,
            },
            dragging: false,
            height: 0.0,
            border_size: config.minimap_border_size,
            handle_size: config.minimap_handle_size,
            references: Vec::new(),
            today: None,
        }
    }

    pub fn scale(&self) -> &TimeScale {
        &self.scale
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn width(&self) -> f64 {
        self.scale.width()
    }

    pub fn set_width(&mut self, width: f64) {
        self.scale.set_range(0.0, width.max(0.0));
    }

    /// Height of the brush and shaded regions; one row per visible lane.
    pub fn set_height(&mut self, height: f64) {
        self.height = height.max(0.0);
    }

    pub fn set_domain(&mut self, outer_range: (Timestamp, Timestamp)) {
        self.scale.set_domain(outer_range.0, outer_range.1);
    }

    /// Mirror a viewport change onto the brush. Returns `false` for changes
    /// that came from the brush itself.
    pub fn on_viewport_changed(&mut self, change: &ViewportChange) -> bool {
        if change.origin == ChangeOrigin::Brush {
            return false;
        }
        self.brush = Brush {
            min: change.current.min,
            max: change.current.max,
            transition: false,
        };
        true
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// Move the brush to pixel extent `[x0, x1]` (either order, clamped to
    /// the minimap). Returns the time extent to apply to the viewport, or
    /// `None` while the brush is empty.
    pub fn drag_to(&mut self, x0: f64, x1: f64) -> Option<(Timestamp, Timestamp)> {
        if !(x0.is_finite() && x1.is_finite()) {
            return None;
        }
        self.dragging = true;
        let width = self.width();
        let left = x0.min(x1).clamp(0.0, width);
        let right = x0.max(x1).clamp(0.0, width);
        self.brush = Brush {
            min: self.scale.invert(left),
            max: self.scale.invert(right),
            transition: false,
        };
        trace!(left, right, empty = self.brush.is_empty(), "brush dragged");
        (!self.brush.is_empty()).then_some((self.brush.min, self.brush.max))
    }

    /// Finish a drag by snapping the brush to the confirmed viewport. An
    /// empty brush snaps back without animation.
    pub fn end_drag(&mut self, viewport: Viewport) {
        let animate = !self.brush.is_empty();
        self.dragging = false;
        self.brush = Brush {
            min: viewport.min,
            max: viewport.max,
            transition: animate,
        };
    }

    pub fn references(&self) -> &[ReferenceMarker] {
        &self.references
    }

    /// Markers without a finite time are dropped.
    pub fn set_references(&mut self, references: Vec<ReferenceMarker>) {
        self.references = references.into_iter().filter(|r| r.time.is_finite()).collect();
    }

    pub fn today(&self) -> Option<Timestamp> {
        self.today
    }

    pub fn set_today(&mut self, today: Option<Timestamp>) {
        self.today = today.filter(|t| t.is_finite());
    }

    /// Position of the today line, present only while today lies strictly
    /// inside the minimap's time range.
    pub fn today_x(&self) -> Option<f64> {
        let (lo, hi) = self.scale.domain();
        self.today
            .filter(|&t| lo.min(hi) < t && t < lo.max(hi))
            .map(|t| self.scale.map(t))
    }

    pub fn reference_geometry(&self) -> Vec<ReferenceGeometry> {
        let width = self.width();
        self.references
            .iter()
            .map(|r| {
                let x = self.scale.map(r.time);
                let edge = x.clamp(0.0, width);
                let area = match r.side {
                    ReferenceSide::Before => (0.0, edge),
                    ReferenceSide::After => (edge, width - edge),
                };
                ReferenceGeometry { side: r.side, x, area }
            })
            .collect()
    }

    pub fn geometry(&self) -> BrushGeometry {
        let width = self.width();
        let left = self.scale.map(self.brush.min);
        let right = self.scale.map(self.brush.max);
        BrushGeometry {
            left,
            right,
            inverse_before: (0.0, left.max(0.0)),
            inverse_after: (right, (width - right).max(0.0)),
            west_handle: Rect::new(
                left - (self.border_size + self.handle_size),
                0.0,
                self.handle_size,
                self.height,
            ),
            east_handle: Rect::new(right + self.border_size, 0.0, self.handle_size, self.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::ChangeKind;

    const EPS: f64 = 1e-6;

    fn sync() -> MinimapSynchronizer {
        let mut s = MinimapSynchronizer::new(
            &TimelineConfig::default(),
            (0.0, 1000.0),
            Viewport { min: 200.0, max: 400.0 },
        );
        s.set_width(500.0);
        s.set_height(30.0);
        s
    }

    fn change(min: f64, max: f64, origin: ChangeOrigin) -> ViewportChange {
        ViewportChange {
            previous: Viewport { min: 200.0, max: 400.0 },
            current: Viewport { min, max },
            kind: ChangeKind::Reposition,
            origin,
        }
    }

    #[test]
    fn mirrors_non_brush_changes() {
        let mut s = sync();
        assert!(s.on_viewport_changed(&change(300.0, 500.0, ChangeOrigin::Zoom)));
        assert_eq!((s.brush().min, s.brush().max), (300.0, 500.0));

        assert!(!s.on_viewport_changed(&change(0.0, 100.0, ChangeOrigin::Brush)));
        assert_eq!((s.brush().min, s.brush().max), (300.0, 500.0));
    }

    #[test]
    fn drag_inverts_pixels() {
        let mut s = sync();
        s.begin_drag();
        let extent = s.drag_to(300.0, 100.0).unwrap();
        assert!((extent.0 - 200.0).abs() < EPS);
        assert!((extent.1 - 600.0).abs() < EPS);
        assert!(s.is_dragging());

        let clamped = s.drag_to(-50.0, 50.0).unwrap();
        assert!((clamped.0 - 0.0).abs() < EPS);
        assert!((clamped.1 - 100.0).abs() < EPS);
    }

    #[test]
    fn empty_brush_reports_nothing_and_snaps_back() {
        let mut s = sync();
        s.begin_drag();
        assert!(s.drag_to(120.0, 120.0).is_none());
        assert!(s.brush().is_empty());

        s.end_drag(Viewport { min: 200.0, max: 400.0 });
        assert!(!s.is_dragging());
        assert_eq!((s.brush().min, s.brush().max), (200.0, 400.0));
        assert!(!s.brush().transition);
    }

    #[test]
    fn committed_drag_animates_snap() {
        let mut s = sync();
        s.drag_to(100.0, 200.0).unwrap();
        s.end_drag(Viewport { min: 210.0, max: 400.0 });
        assert!(s.brush().transition);
        assert_eq!(s.brush().min, 210.0);
    }

    #[test]
    fn geometry_shades_outside_brush() {
        let s = sync();
        let g = s.geometry();
        assert!((g.left - 100.0).abs() < EPS);
        assert!((g.right - 200.0).abs() < EPS);
        assert_eq!(g.inverse_before, (0.0, 100.0));
        assert_eq!(g.inverse_after, (200.0, 300.0));
        assert_eq!(g.west_handle, Rect::new(96.0, 0.0, 3.0, 30.0));
        assert_eq!(g.east_handle, Rect::new(201.0, 0.0, 3.0, 30.0));
    }

    #[test]
    fn today_shows_only_inside_range() {
        let mut s = sync();
        assert_eq!(s.today_x(), None);
        s.set_today(Some(600.0));
        assert!(s.today_x().is_some_and(|x| (x - 300.0).abs() < EPS));
        s.set_today(Some(1000.0));
        assert_eq!(s.today_x(), None);
        s.set_today(Some(-5.0));
        assert_eq!(s.today_x(), None);
        s.set_today(Some(f64::NAN));
        assert_eq!(s.today(), None);
    }

    #[test]
    fn reference_areas_are_clamped_to_minimap() {
        let mut s = sync();
        s.set_references(vec![
            ReferenceMarker::before(100.0),
            ReferenceMarker::after(800.0),
            ReferenceMarker::after(f64::NAN),
            ReferenceMarker::before(-200.0),
        ]);
        let g = s.reference_geometry();
        assert_eq!(g.len(), 3);
        let close = |g: &ReferenceGeometry, x: f64, area: (f64, f64)| {
            (g.x - x).abs() < EPS && (g.area.0 - area.0).abs() < EPS && (g.area.1 - area.1).abs() < EPS
        };
        assert!(close(&g[0], 50.0, (0.0, 50.0)), "{:?}", g[0]);
        assert!(close(&g[1], 400.0, (400.0, 100.0)), "{:?}", g[1]);
        assert!(g[1].line_visible(s.width()));
        assert!(close(&g[2], -100.0, (0.0, 0.0)), "{:?}", g[2]);
        assert!(!g[2].line_visible(s.width()));
    }

    #[test]
    fn geometry_floors_widths_at_zero() {
        let mut s = sync();
        s.on_viewport_changed(&change(-100.0, 1200.0, ChangeOrigin::Api));
        let g = s.geometry();
        assert_eq!(g.inverse_before.1, 0.0);
        assert_eq!(g.inverse_after.1, 0.0);
    }
}
