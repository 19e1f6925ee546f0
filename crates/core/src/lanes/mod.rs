//! Lane display variants.
//!
//! A lane is drawn either as clustered tiles, as a dot-density strip
//! (minimized), or as a numeric chart. All three receive the main scale
//! through `reposition` (span unchanged) or `rearrange` (span or width
//! changed) and emit render commands for their own strip.

mod chart;
mod minimized;
mod tile_lane;

pub use chart::{ChartLabel, ChartLane, LabelKind};
pub use minimized::MinimizedLane;
pub use tile_lane::TileLane;

use tilelane_protocol::{Point, RenderCommand, SharedStr};
use tracing::trace;

use crate::config::TimelineConfig;
use crate::error::TimelineError;
use crate::model::{ChartMode, Lane, LaneKind};
use crate::points::InteractivePoint;
use crate::render_context::RenderContext;
use crate::scale::TimeScale;

/// Strip height used until the host lays lanes out.
pub const DEFAULT_LANE_HEIGHT: f64 = 76.0;

/// Work a lane owes once it has a usable scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pending {
    Nothing,
    Reposition,
    Rearrange,
}

/// The scale a lane was last given, plus any work deferred because that
/// scale had no pixel range yet or the lane was hidden.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScaleSlot {
    scale: TimeScale,
    pending: Pending,
    arranged: bool,
}

impl ScaleSlot {
    pub(crate) fn new() -> Self {
        Self {
            scale: TimeScale::default(),
            pending: Pending::Nothing,
            arranged: false,
        }
    }

    pub(crate) fn scale(&self) -> &TimeScale {
        &self.scale
    }

    /// Geometry derived from the stored scale is current.
    pub(crate) fn is_current(&self) -> bool {
        self.arranged && self.pending == Pending::Nothing
    }

    /// Store `scale` and return the work to perform now. Work is deferred
    /// (and `None` returned) while the scale is unestablished or the lane is
    /// inactive. A lane that was never arranged always re-arranges.
    pub(crate) fn receive(&mut self, scale: &TimeScale, requested: Pending, active: bool, lane: &str) -> Option<Pending> {
        self.scale = *scale;
        let work = self.pending.max(requested);
        if !active || !scale.is_established() {
            trace!(lane, ?work, "deferring lane update");
            self.pending = work;
            return None;
        }
        self.pending = Pending::Nothing;
        let work = if self.arranged { work } else { Pending::Rearrange };
        self.arranged = true;
        Some(work)
    }
}

#[derive(Debug, Clone)]
pub enum LaneView {
    Tiles(TileLane),
    Minimized(MinimizedLane),
    Chart(ChartLane),
}

impl LaneView {
    pub fn new(lane: Lane, config: &TimelineConfig) -> Self {
        match (lane.kind, lane.minimized) {
            (LaneKind::Chart, _) => Self::Chart(ChartLane::new(lane, config)),
            (LaneKind::Tiles, true) => Self::Minimized(MinimizedLane::new(lane, config)),
            (LaneKind::Tiles, false) => Self::Tiles(TileLane::new(lane, config)),
        }
    }

    pub fn lane(&self) -> &Lane {
        match self {
            Self::Tiles(l) => l.lane(),
            Self::Minimized(l) => l.lane(),
            Self::Chart(l) => l.lane(),
        }
    }

    pub fn id(&self) -> &SharedStr {
        &self.lane().id
    }

    pub fn is_visible(&self) -> bool {
        self.lane().visible
    }

    pub fn height(&self) -> f64 {
        match self {
            Self::Tiles(l) => l.height(),
            Self::Minimized(l) => l.height(),
            Self::Chart(l) => l.height(),
        }
    }

    pub fn set_height(&mut self, height: f64) {
        match self {
            Self::Tiles(l) => l.set_height(height),
            Self::Minimized(l) => l.set_height(height),
            Self::Chart(l) => l.set_height(height),
        }
    }

    pub fn scale(&self) -> &TimeScale {
        match self {
            Self::Tiles(l) => l.scale(),
            Self::Minimized(l) => l.scale(),
            Self::Chart(l) => l.scale(),
        }
    }

    pub fn reposition(&mut self, scale: &TimeScale) {
        match self {
            Self::Tiles(l) => l.reposition(scale),
            Self::Minimized(l) => l.reposition(scale),
            Self::Chart(l) => l.reposition(scale),
        }
    }

    pub fn rearrange(&mut self, scale: &TimeScale) {
        match self {
            Self::Tiles(l) => l.rearrange(scale),
            Self::Minimized(l) => l.rearrange(scale),
            Self::Chart(l) => l.rearrange(scale),
        }
    }

    /// Render the lane's strip with its top edge at `top`.
    pub fn render(&self, ctx: &RenderContext, top: f64) -> Vec<RenderCommand> {
        if !self.is_visible() {
            return Vec::new();
        }
        match self {
            Self::Tiles(l) => l.render(ctx, top),
            Self::Minimized(l) => l.render(ctx, top),
            Self::Chart(l) => l.render(ctx, top),
        }
    }

    /// Show or hide the lane. A lane made visible catches up on deferred
    /// work with its last scale.
    pub fn set_visible(&mut self, visible: bool) {
        match self {
            Self::Tiles(l) => l.set_visible(visible),
            Self::Minimized(l) => l.set_visible(visible),
            Self::Chart(l) => l.set_visible(visible),
        }
    }

    /// Switch a tile lane between full tiles and the dot strip in place.
    /// Tile data is preserved and the new variant is re-arranged against the
    /// last scale. Returns `false` when nothing changed; chart lanes never
    /// minimize.
    pub fn set_minimized(&mut self, minimized: bool, config: &TimelineConfig) -> bool {
        let switch = match self {
            Self::Tiles(_) => minimized,
            Self::Minimized(_) => !minimized,
            Self::Chart(_) => false,
        };
        if !switch {
            return false;
        }
        let placeholder = Self::Chart(ChartLane::new(
            Lane::chart(self.id().clone(), "", ChartMode::Dot, Vec::new()),
            config,
        ));
        let (mut lane, scale, height) = match std::mem::replace(self, placeholder) {
            Self::Tiles(l) => {
                let (scale, height) = (*l.scale(), l.height());
                (l.into_lane(), scale, height)
            }
            Self::Minimized(l) => {
                let (scale, height) = (*l.scale(), l.height());
                (l.into_lane(), scale, height)
            }
            chart @ Self::Chart(_) => {
                *self = chart;
                return false;
            }
        };
        lane.minimized = minimized;
        let mut view = Self::new(lane, config);
        view.set_height(height);
        view.rearrange(&scale);
        *self = view;
        true
    }

    /// Move the cursor over this lane (`None` when it leaves). Returns the
    /// focused point, if any. Tile lanes have no focusable points.
    pub fn set_focus(&mut self, position: Option<Point>) -> Option<SharedStr> {
        match self {
            Self::Tiles(_) => None,
            Self::Minimized(l) => l.set_focus(position),
            Self::Chart(l) => l.set_focus(position),
        }
    }

    /// Re-evaluate pruning and focus after the scale moved.
    pub fn refresh_points(&mut self) {
        match self {
            Self::Tiles(_) => {}
            Self::Minimized(l) => l.refresh_points(),
            Self::Chart(l) => l.refresh_points(),
        }
    }

    pub fn transition_end(&mut self, id: &SharedStr) -> bool {
        match self {
            Self::Tiles(_) => false,
            Self::Minimized(l) => l.tracker_mut().transition_end(id),
            Self::Chart(l) => l.tracker_mut().transition_end(id),
        }
    }

    pub fn lock(&mut self, id: &SharedStr) -> bool {
        match self {
            Self::Tiles(_) => false,
            Self::Minimized(l) => l.tracker_mut().lock(id),
            Self::Chart(l) => l.tracker_mut().lock(id),
        }
    }

    pub fn unlock(&mut self, id: &SharedStr) -> bool {
        match self {
            Self::Tiles(_) => false,
            Self::Minimized(l) => l.tracker_mut().unlock(id),
            Self::Chart(l) => l.tracker_mut().unlock(id),
        }
    }

    pub fn interactive_points(&self) -> Vec<InteractivePoint> {
        match self {
            Self::Tiles(_) => Vec::new(),
            Self::Minimized(l) => l.tracker().interactive_points(),
            Self::Chart(l) => l.tracker().interactive_points(),
        }
    }

    /// Id of the tile mark or point under lane-local pixel `position`.
    pub fn pick(&self, position: Point) -> Result<Option<SharedStr>, TimelineError> {
        match self {
            Self::Tiles(l) => Ok(l.hit_test(position.x)?.map(|t| t.id.clone())),
            Self::Minimized(l) => l.pick(position),
            Self::Chart(l) => l.pick(position),
        }
    }
}
