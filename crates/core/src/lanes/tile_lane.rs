use tilelane_protocol::RenderCommand;
use tracing::debug;

use super::{DEFAULT_LANE_HEIGHT, Pending, ScaleSlot};
use crate::clustering::{ClusterConfig, LaneLayout, PresentationTile};
use crate::config::TimelineConfig;
use crate::error::TimelineError;
use crate::model::Lane;
use crate::render_context::RenderContext;
use crate::scale::TimeScale;
use crate::views::tile_lane::render_tile_lane;

/// A lane drawn as clustered tiles.
#[derive(Debug, Clone)]
pub struct TileLane {
    lane: Lane,
    slot: ScaleSlot,
    layout: LaneLayout,
    config: ClusterConfig,
    height: f64,
}

impl TileLane {
    pub fn new(lane: Lane, config: &TimelineConfig) -> Self {
        Self {
            lane,
            slot: ScaleSlot::new(),
            layout: LaneLayout::default(),
            config: ClusterConfig::from(config),
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

    /// Pan: shift marks without re-clustering.
    pub fn reposition(&mut self, scale: &TimeScale) {
        match self.slot.receive(scale, Pending::Reposition, self.lane.visible, &self.lane.id) {
            Some(Pending::Rearrange) => self.cluster(),
            Some(_) => self.layout.reposition(&self.lane.tiles, self.slot.scale(), &self.config),
            None => {}
        }
    }

    pub fn rearrange(&mut self, scale: &TimeScale) {
        if self
            .slot
            .receive(scale, Pending::Rearrange, self.lane.visible, &self.lane.id)
            .is_some()
        {
            self.cluster();
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.lane.visible = visible;
        if visible {
            let scale = *self.slot.scale();
            self.reposition(&scale);
        }
    }

    fn cluster(&mut self) {
        self.layout = LaneLayout::cluster(&self.lane.tiles, self.slot.scale(), &self.config);
        debug!(
            lane = %self.lane.id,
            tiles = self.lane.tiles.len(),
            marks = self.layout.visible_count(),
            "lane clustered"
        );
    }

    /// Current clustering. Fails while the lane has not seen an
    /// established scale, or has deferred work.
    pub fn layout(&self) -> Result<&LaneLayout, TimelineError> {
        if self.slot.is_current() {
            Ok(&self.layout)
        } else {
            Err(TimelineError::ScaleNotEstablished(self.lane.id.to_string()))
        }
    }

    pub fn hit_test(&self, x: f64) -> Result<Option<&PresentationTile>, TimelineError> {
        Ok(self.layout()?.hit_test(x))
    }

    pub fn render(&self, ctx: &RenderContext, top: f64) -> Vec<RenderCommand> {
        match self.layout() {
            Ok(layout) => render_tile_lane(&self.lane, layout, ctx.surface().width, top, self.height),
            Err(_) => Vec::new(),
        }
    }
}
