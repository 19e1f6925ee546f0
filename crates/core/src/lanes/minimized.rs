use tilelane_protocol::{Point, RenderCommand, SharedStr};
use tracing::debug;

use super::{DEFAULT_LANE_HEIGHT, Pending, ScaleSlot};
use crate::config::TimelineConfig;
use crate::error::TimelineError;
use crate::model::{Lane, Tile};
use crate::points::{FocusMetric, PointLifecycleTracker, PointPhase};
use crate::render_context::RenderContext;
use crate::scale::TimeScale;
use crate::views::dot_strip::render_dot_strip;

/// Pixel tolerance of [`MinimizedLane::tiles_near`].
const PICK_TOLERANCE: f64 = 1.0;

/// A tile lane collapsed into a single row of dots, one per tile start.
#[derive(Debug, Clone)]
pub struct MinimizedLane {
    lane: Lane,
    slot: ScaleSlot,
    /// Pixel x of every tile; NaN for undated tiles.
    positions: Vec<f64>,
    /// Indices of tiles drawn by the bulk layer.
    bulk: Vec<usize>,
    tracker: PointLifecycleTracker,
    clipping_margin: f64,
    height: f64,
}

impl MinimizedLane {
    pub fn new(lane: Lane, config: &TimelineConfig) -> Self {
        Self {
            lane,
            slot: ScaleSlot::new(),
            positions: Vec::new(),
            bulk: Vec::new(),
            tracker: PointLifecycleTracker::new(FocusMetric::Horizontal, config),
            clipping_margin: config.clipping_margin(),
            height: DEFAULT_LANE_HEIGHT,
        }
    }

    pub fn lane(&self) -> &Lane {
        &self.lane
    }

    pub fn into_lane(self) -> Lane {
        self.lane
    }

    pub fn scale(&self) -> &TimeScale {
        self.slot.scale()
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_height(&mut self, height: f64) {
        self.height = height.max(0.0);
    }

    pub fn tracker(&self) -> &PointLifecycleTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut PointLifecycleTracker {
        &mut self.tracker
    }

    pub fn reposition(&mut self, scale: &TimeScale) {
        if self
            .slot
            .receive(scale, Pending::Reposition, self.lane.visible, &self.lane.id)
            .is_some()
        {
            self.refresh();
        }
    }

    pub fn rearrange(&mut self, scale: &TimeScale) {
        if self
            .slot
            .receive(scale, Pending::Rearrange, self.lane.visible, &self.lane.id)
            .is_some()
        {
            self.refresh();
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.lane.visible = visible;
        if visible {
            let scale = *self.slot.scale();
            self.reposition(&scale);
        } else {
            self.tracker.clear();
        }
    }

    /// Recompute tile positions and the bulk subset: dated tiles within the
    /// pixel range widened by the clipping margin, skipping a tile that
    /// lands on the same whole pixel as the one before it.
    fn refresh(&mut self) {
        let scale = *self.slot.scale();
        self.positions = self
            .lane
            .tiles
            .iter()
            .map(|t| if t.is_dated() { scale.map_opt(t.start) } else { f64::NAN })
            .collect();

        let (r0, r1) = scale.range();
        let (lo, hi) = (r0.min(r1) - self.clipping_margin, r0.max(r1) + self.clipping_margin);
        let mut last: Option<f64> = None;
        self.bulk.clear();
        for (index, &x) in self.positions.iter().enumerate() {
            if !x.is_finite() {
                continue;
            }
            let pixel = x.floor();
            if last == Some(pixel) {
                continue;
            }
            last = Some(pixel);
            if lo <= x && x <= hi {
                self.bulk.push(index);
            }
        }
        debug!(
            lane = %self.lane.id,
            tiles = self.lane.tiles.len(),
            dots = self.bulk.len(),
            "dot strip refreshed"
        );
    }

    /// Bulk-layer dot x positions, in tile order.
    pub fn bulk_positions(&self) -> Vec<f64> {
        self.bulk.iter().map(|&i| self.positions[i]).collect()
    }

    fn position_of(&self, id: &SharedStr) -> Option<f64> {
        self.lane
            .tiles
            .iter()
            .position(|t| t.id == *id)
            .and_then(|i| self.positions.get(i).copied())
            .filter(|x| x.is_finite())
    }

    /// Drop off-screen points and re-apply the stored cursor position.
    pub fn refresh_points(&mut self) {
        if !self.slot.is_current() {
            return;
        }
        let range = self.slot.scale().range();
        let positions: Vec<(SharedStr, f64)> = self
            .tracker
            .interactive_points()
            .into_iter()
            .filter_map(|p| self.position_of(&p.id).map(|x| (p.id, x)))
            .collect();
        self.tracker.prune(range, |id| {
            positions.iter().find(|(p, _)| p == id).map(|(_, x)| *x)
        });
        let position = self.tracker.focus_position();
        self.set_focus(position);
    }

    pub fn set_focus(&mut self, position: Option<Point>) -> Option<SharedStr> {
        let y = self.height / 2.0;
        let tiles = &self.lane.tiles;
        let positions = &self.positions;
        let candidates = self
            .bulk
            .iter()
            .map(|&i| (&tiles[i].id, Point::new(positions[i], y)));
        self.tracker.set_focus(position, candidates).cloned()
    }

    /// Tiles whose start lies within a pixel of `x`.
    pub fn tiles_near(&self, x: f64) -> Vec<&Tile> {
        self.lane.tiles_near(self.slot.scale(), x, PICK_TOLERANCE)
    }

    pub fn pick(&self, position: Point) -> Result<Option<SharedStr>, TimelineError> {
        if !self.slot.is_current() {
            return Err(TimelineError::ScaleNotEstablished(self.lane.id.to_string()));
        }
        let candidates = self
            .bulk
            .iter()
            .map(|&i| (&self.lane.tiles[i].id, Point::new(self.positions[i], self.height / 2.0)));
        Ok(self.tracker.closest(position, candidates).cloned())
    }

    pub fn render(&self, ctx: &RenderContext, top: f64) -> Vec<RenderCommand> {
        if !self.slot.is_current() {
            return Vec::new();
        }
        let y = top + self.height / 2.0;
        let bulk: Vec<Point> = self.bulk.iter().map(|&i| Point::new(self.positions[i], y)).collect();
        let interactive: Vec<(SharedStr, Point, bool, bool)> = self
            .tracker
            .interactive_points()
            .into_iter()
            .filter_map(|p| {
                let x = self.position_of(&p.id)?;
                let (focused, entering) = (p.is_focused(), p.phase == PointPhase::Entering);
                Some((p.id, Point::new(x, y), focused, entering))
            })
            .collect();
        render_dot_strip(&self.lane, ctx, top, self.height, &bulk, &interactive)
    }
}
