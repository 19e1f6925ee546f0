//! The timeline widget core: owns every stage and sequences them.

use chrono::{Months, Utc};
use serde::{Deserialize, Serialize};
use tilelane_protocol::{Point, RenderCommand, SharedStr, Surface};
use tracing::{debug, info};

use crate::config::TimelineConfig;
use crate::error::TimelineError;
use crate::lanes::LaneView;
use crate::minimap::MinimapSynchronizer;
use crate::model::{Lane, TimelineDocument, Timestamp};
use crate::points::InteractivePoint;
use crate::render_context::RenderContext;
use crate::scale::TimeScale;
use crate::viewport::{ChangeKind, ChangeOrigin, Viewport, ViewportChange, ViewportController};
use crate::views::minimap::{minimap_height, render_minimap};
use crate::views::time_axis::{AXIS_HEIGHT, render_time_axis};

/// Vertical gap between the last lane and the minimap.
const MINIMAP_GAP: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationKey {
    Left,
    Right,
    Up,
    Down,
    Plus,
    Minus,
}

/// Where a visible lane sits on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneSlot {
    pub index: usize,
    pub top: f64,
    pub height: f64,
}

/// Vertical arrangement: axis, visible lanes, minimap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineLayout {
    pub axis_height: f64,
    pub lanes: Vec<LaneSlot>,
    pub minimap_top: f64,
    pub minimap_height: f64,
}

impl TimelineLayout {
    pub fn lanes_height(&self) -> f64 {
        self.lanes.iter().map(|l| l.height).sum()
    }

    pub fn total_height(&self) -> f64 {
        self.minimap_top + self.minimap_height
    }

    /// Lane under surface y, with the y offset inside it.
    pub fn lane_at(&self, y: f64) -> Option<(usize, f64)> {
        self.lanes
            .iter()
            .find(|l| l.top <= y && y < l.top + l.height)
            .map(|l| (l.index, y - l.top))
    }

    pub fn in_minimap(&self, y: f64) -> bool {
        self.minimap_top <= y && y < self.total_height()
    }
}

/// A timeline of lanes over a shared, zoomable time window.
///
/// Every mutating call applies its effects in one fixed order: viewport
/// clamp and scale update, lane reposition or re-arrange, minimap sync,
/// then point focus re-evaluation. Calls that change nothing return
/// `false` (or `None`) rather than an error.
#[derive(Debug, Clone)]
pub struct Timeline {
    config: TimelineConfig,
    lanes: Vec<LaneView>,
    viewport: ViewportController,
    minimap: MinimapSynchronizer,
    ctx: RenderContext,
    hovered: Option<usize>,
}

impl Timeline {
    pub fn new(config: TimelineConfig, mut document: TimelineDocument) -> Result<Self, TimelineError> {
        config.validate()?;
        document.normalize()?;
        let (min, max) = document.data_range().unwrap_or_else(default_range);
        let viewport = ViewportController::new(&config, min, max);
        let mut minimap = MinimapSynchronizer::new(&config, viewport.outer_range(), viewport.viewport());
        minimap.set_references(std::mem::take(&mut document.references));
        minimap.set_today(Some(Utc::now().timestamp_millis() as f64));
        let ctx = RenderContext::new(&config, Surface::default());
        let lanes: Vec<LaneView> = document
            .lanes
            .into_iter()
            .map(|lane| LaneView::new(lane, &config))
            .collect();

        let mut timeline = Self {
            config,
            lanes,
            viewport,
            minimap,
            ctx,
            hovered: None,
        };
        let scale = *timeline.viewport.scale();
        for lane in &mut timeline.lanes {
            lane.rearrange(&scale);
        }
        timeline.sync_minimap_height();
        info!(lanes = timeline.lanes.len(), min, max, "timeline created");
        Ok(timeline)
    }

    pub fn from_json(config: TimelineConfig, data: &[u8]) -> Result<Self, TimelineError> {
        Self::new(config, TimelineDocument::from_json(data)?)
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn lanes(&self) -> &[LaneView] {
        &self.lanes
    }

    pub fn lane(&self, index: usize) -> Result<&LaneView, TimelineError> {
        self.lanes.get(index).ok_or(TimelineError::UnknownLane(index))
    }

    fn lane_mut(&mut self, index: usize) -> Result<&mut LaneView, TimelineError> {
        self.lanes.get_mut(index).ok_or(TimelineError::UnknownLane(index))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    pub fn viewport_controller(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn scale(&self) -> &TimeScale {
        self.viewport.scale()
    }

    pub fn minimap(&self) -> &MinimapSynchronizer {
        &self.minimap
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Override the instant the minimap marks as today.
    pub fn set_today(&mut self, today: Option<Timestamp>) {
        self.minimap.set_today(today);
    }

    /// Run the downstream stages for an accepted viewport change.
    fn propagate(&mut self, change: ViewportChange) {
        let scale = *self.viewport.scale();
        for lane in &mut self.lanes {
            match change.kind {
                ChangeKind::Reposition => lane.reposition(&scale),
                ChangeKind::Rearrange => lane.rearrange(&scale),
            }
        }
        self.minimap.on_viewport_changed(&change);
        for lane in &mut self.lanes {
            lane.refresh_points();
        }
    }

    fn commit(&mut self, change: Option<ViewportChange>) -> bool {
        match change {
            Some(change) => {
                self.propagate(change);
                true
            }
            None => false,
        }
    }

    fn sync_minimap_height(&mut self) {
        let rows = self.lanes.iter().filter(|l| l.is_visible()).count();
        self.minimap.set_height(minimap_height(&self.config, rows));
    }

    /// Adopt the host's measured surface. A new width re-arranges every
    /// lane; any change rebuilds the render context.
    pub fn set_surface(&mut self, surface: Surface) -> bool {
        let rebuilt = self.ctx.set_surface(surface);
        self.minimap.set_width(surface.width);
        self.minimap.set_domain(self.viewport.outer_range());
        let change = self.viewport.set_surface_width(surface.width);
        let changed = self.commit(change);
        rebuilt || changed
    }

    pub fn set_theme_generation(&mut self, generation: u64) -> bool {
        self.ctx.set_theme_generation(generation)
    }

    /// Replace the data range and show all of it.
    pub fn set_data_range(&mut self, min: Timestamp, max: Timestamp) -> bool {
        let change = self.viewport.set_data_range(min, max);
        self.minimap.set_domain(self.viewport.outer_range());
        self.commit(change)
    }

    pub fn set_viewport(&mut self, min: Timestamp, max: Timestamp, force: bool) -> bool {
        let change = self.viewport.set_viewport(min, max, force);
        self.commit(change)
    }

    pub fn reset_viewport(&mut self) -> bool {
        let change = self.viewport.reset_to_data_range();
        self.commit(change)
    }

    pub fn scroll_to(&mut self, center: Timestamp) -> bool {
        let change = self.viewport.scroll_to(center);
        self.commit(change)
    }

    /// Keyboard navigation. Horizontal keys follow reading direction.
    pub fn key(&mut self, key: NavigationKey) -> bool {
        let rtl = self.config.right_to_left;
        let change = match key {
            NavigationKey::Left if rtl => self.viewport.pan_right(),
            NavigationKey::Left => self.viewport.pan_left(),
            NavigationKey::Right if rtl => self.viewport.pan_left(),
            NavigationKey::Right => self.viewport.pan_right(),
            NavigationKey::Up | NavigationKey::Plus => self.viewport.zoom_in(),
            NavigationKey::Down | NavigationKey::Minus => self.viewport.zoom_out(),
        };
        self.commit(change)
    }

    pub fn zoom_gesture(&mut self, anchor: f64, factor: f64) -> bool {
        let change = self.viewport.zoom_gesture(anchor, factor);
        self.commit(change)
    }

    pub fn pan_gesture(&mut self, dx: f64) -> bool {
        let change = self.viewport.pan_gesture(dx);
        self.commit(change)
    }

    pub fn end_gesture(&mut self) {
        self.viewport.end_gesture();
    }

    pub fn begin_brush(&mut self) {
        self.minimap.begin_drag();
    }

    /// Drag the minimap brush to pixel extent `[x0, x1]`. The viewport
    /// follows a non-empty brush; the brush itself is not overwritten by
    /// the resulting change.
    pub fn drag_brush(&mut self, x0: f64, x1: f64) -> bool {
        let Some((min, max)) = self.minimap.drag_to(x0, x1) else {
            return false;
        };
        let change = self
            .viewport
            .set_viewport_from(min, max, false, ChangeOrigin::Brush);
        self.commit(change)
    }

    /// Release the brush. It snaps to the viewport actually in effect,
    /// which an empty brush never changed.
    pub fn end_brush(&mut self) {
        self.minimap.end_drag(self.viewport.viewport());
    }

    pub fn set_lane_minimized(&mut self, index: usize, minimized: bool) -> Result<(), TimelineError> {
        let view = self.lanes.get_mut(index).ok_or(TimelineError::UnknownLane(index))?;
        if view.set_minimized(minimized, &self.config) {
            view.refresh_points();
            debug!(lane = %view.id(), minimized, "lane display mode changed");
        }
        Ok(())
    }

    pub fn set_lane_visible(&mut self, index: usize, visible: bool) -> Result<(), TimelineError> {
        let lane = self.lane_mut(index)?;
        lane.set_visible(visible);
        lane.refresh_points();
        if !visible && self.hovered == Some(index) {
            self.hovered = None;
        }
        self.sync_minimap_height();
        Ok(())
    }

    pub fn set_lane_height(&mut self, index: usize, height: f64) -> Result<(), TimelineError> {
        self.lane_mut(index)?.set_height(height);
        Ok(())
    }

    pub fn layout(&self) -> TimelineLayout {
        let mut top = AXIS_HEIGHT;
        let mut lanes = Vec::with_capacity(self.lanes.len());
        for (index, lane) in self.lanes.iter().enumerate().filter(|(_, l)| l.is_visible()) {
            lanes.push(LaneSlot {
                index,
                top,
                height: lane.height(),
            });
            top += lane.height();
        }
        TimelineLayout {
            axis_height: AXIS_HEIGHT,
            minimap_top: top + MINIMAP_GAP,
            minimap_height: minimap_height(&self.config, lanes.len()),
            lanes,
        }
    }

    /// Move the cursor over lane `index` in lane-local pixels, or take it
    /// away with `None`. Returns the focused point.
    pub fn set_focus(&mut self, index: usize, position: Option<Point>) -> Result<Option<SharedStr>, TimelineError> {
        Ok(self.lane_mut(index)?.set_focus(position))
    }

    /// Route a cursor position in surface pixels to the lane below it.
    pub fn pointer_moved(&mut self, position: Point) -> Option<SharedStr> {
        let target = self.layout().lane_at(position.y);
        let previous = self.hovered;
        if let Some(prev) = previous.filter(|&p| Some(p) != target.map(|(i, _)| i)) {
            if let Some(lane) = self.lanes.get_mut(prev) {
                lane.set_focus(None);
            }
        }
        self.hovered = target.map(|(i, _)| i);
        let (index, y) = target?;
        self.lanes
            .get_mut(index)
            .and_then(|lane| lane.set_focus(Some(Point::new(position.x, y))))
    }

    pub fn pointer_left(&mut self) {
        if let Some(lane) = self.hovered.take().and_then(|i| self.lanes.get_mut(i)) {
            lane.set_focus(None);
        }
    }

    /// The lane and mark or point under surface pixel `position`.
    pub fn pick(&self, position: Point) -> Result<Option<(usize, SharedStr)>, TimelineError> {
        let Some((index, y)) = self.layout().lane_at(position.y) else {
            return Ok(None);
        };
        let hit = self.lane(index)?.pick(Point::new(position.x, y))?;
        Ok(hit.map(|id| (index, id)))
    }

    /// Anchor a popover on a point. Returns `true` if the point has to be
    /// materialized in the interactive layer.
    pub fn lock_point(&mut self, index: usize, id: &SharedStr) -> Result<bool, TimelineError> {
        Ok(self.lane_mut(index)?.lock(id))
    }

    pub fn unlock_point(&mut self, index: usize, id: &SharedStr) -> Result<bool, TimelineError> {
        Ok(self.lane_mut(index)?.unlock(id))
    }

    /// The renderer finished animating a point. Returns `true` when its
    /// interactive element can be removed.
    pub fn transition_end(&mut self, index: usize, id: &SharedStr) -> Result<bool, TimelineError> {
        Ok(self.lane_mut(index)?.transition_end(id))
    }

    pub fn interactive_points(&self, index: usize) -> Result<Vec<InteractivePoint>, TimelineError> {
        Ok(self.lane(index)?.interactive_points())
    }

    /// Visible lane data, in display order.
    pub fn visible_lanes(&self) -> Vec<&Lane> {
        self.lanes
            .iter()
            .filter(|l| l.is_visible())
            .map(LaneView::lane)
            .collect()
    }

    /// Emit one full frame: axis with gridlines, lanes, minimap.
    pub fn render(&self) -> Vec<RenderCommand> {
        let layout = self.layout();
        let mut commands = render_time_axis(self.viewport.scale(), layout.lanes_height());
        for slot in &layout.lanes {
            if let Some(lane) = self.lanes.get(slot.index) {
                commands.extend(lane.render(&self.ctx, slot.top));
            }
        }
        commands.extend(render_minimap(
            &self.visible_lanes(),
            &self.minimap,
            &self.config,
            layout.minimap_top,
        ));
        commands
    }
}

/// One year either side of now, for documents without any dated content.
fn default_range() -> (Timestamp, Timestamp) {
    let now = Utc::now();
    let min = now.checked_sub_months(Months::new(12)).unwrap_or(now);
    let max = now.checked_add_months(Months::new(12)).unwrap_or(now);
    (min.timestamp_millis() as f64, max.timestamp_millis() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DAY_MS;
    use crate::error::ConfigError;
    use crate::model::tile::tests::ms;
    use crate::model::{ChartMode, ChartPoint, ReferenceMarker, Tile};
    use crate::points::PointPhase;
    use tilelane_protocol::ThemeToken;

    fn document() -> TimelineDocument {
        TimelineDocument::new(vec![
            Lane::tiles(
                "visits",
                "Visits",
                vec![
                    Tile::point("v1", "checkup", ms(2024, 1, 11)),
                    Tile::point("v2", "checkup", ms(2024, 1, 12)),
                    Tile::point("v3", "surgery", ms(2024, 1, 14)),
                    Tile::point("v4", "checkup", ms(2024, 1, 15)),
                ],
            ),
            Lane::tiles(
                "labs",
                "Labs",
                vec![
                    Tile::point("l1", "blood", ms(2024, 1, 5)),
                    Tile::point("l2", "blood", ms(2024, 1, 25)),
                ],
            )
            .minimized(true),
            Lane::chart(
                "weight",
                "Weight",
                ChartMode::Line,
                vec![
                    ChartPoint::new("w1", ms(2024, 1, 2), Some(80.0)),
                    ChartPoint::new("w2", ms(2024, 1, 20), Some(78.5)),
                ],
            ),
        ])
    }

    fn timeline() -> Timeline {
        let mut t = Timeline::new(TimelineConfig::default(), document()).unwrap();
        t.set_surface(Surface::new(1000.0, 400.0));
        t.set_viewport(ms(2024, 1, 10), ms(2024, 1, 18), false);
        t
    }

    fn visibility(t: &Timeline) -> Vec<bool> {
        let LaneView::Tiles(lane) = &t.lanes()[0] else {
            panic!("first lane is a tile lane");
        };
        lane.layout().unwrap().tiles.iter().map(|p| p.visible).collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = TimelineConfig {
            range_padding: 1.5,
            ..TimelineConfig::default()
        };
        let err = Timeline::new(config, document()).unwrap_err();
        assert!(matches!(err, TimelineError::Config(ConfigError::OutOfRange { field: "range_padding", .. })));
    }

    #[test]
    fn rejects_duplicate_lanes() {
        let mut doc = document();
        doc.lanes.push(Lane::tiles("visits", "Again", vec![]));
        assert!(matches!(Timeline::new(TimelineConfig::default(), doc), Err(TimelineError::Document(_))));
    }

    #[test]
    fn nothing_renders_before_surface_is_measured() {
        let t = Timeline::new(TimelineConfig::default(), document()).unwrap();
        assert!(t.render().is_empty());
        let LaneView::Tiles(lane) = &t.lanes()[0] else {
            panic!("first lane is a tile lane");
        };
        assert!(matches!(lane.layout(), Err(TimelineError::ScaleNotEstablished(_))));
    }

    #[test]
    fn initial_window_is_padded_data_range() {
        let t = Timeline::new(TimelineConfig::default(), document()).unwrap();
        let (lo, hi) = (ms(2024, 1, 2), ms(2024, 1, 25));
        let pad = (hi - lo) * 0.1;
        assert!((t.viewport().min - (lo - pad)).abs() < 1.0);
        assert!((t.viewport().max - (hi + pad)).abs() < 1.0);
    }

    #[test]
    fn clusters_once_surface_is_set() {
        let t = timeline();
        assert_eq!(visibility(&t), vec![true, false, true, false]);
    }

    #[test]
    fn pan_keeps_membership_and_zoom_reclusters() {
        let mut t = timeline();
        let before = visibility(&t);
        assert!(t.key(NavigationKey::Right));
        assert_eq!(visibility(&t), before);
        assert!((t.viewport().min - (ms(2024, 1, 10) + 0.8 * DAY_MS)).abs() < 1.0);

        // One zoom-out step still leaves a gap before v3; the second closes it.
        assert!(t.key(NavigationKey::Minus));
        assert_eq!(visibility(&t), vec![true, false, true, false]);
        assert!(t.key(NavigationKey::Minus));
        assert_eq!(visibility(&t), vec![true, false, false, false]);
    }

    #[test]
    fn right_to_left_swaps_horizontal_keys() {
        let config = TimelineConfig {
            right_to_left: true,
            ..TimelineConfig::default()
        };
        let mut t = Timeline::new(config, document()).unwrap();
        t.set_surface(Surface::new(1000.0, 400.0));
        t.set_viewport(ms(2024, 1, 10), ms(2024, 1, 18), false);
        assert!(t.key(NavigationKey::Right));
        assert!(t.viewport().min < ms(2024, 1, 10));
    }

    #[test]
    fn brush_drives_viewport_without_echo() {
        let mut t = timeline();
        let width = t.minimap().width();
        t.begin_brush();
        assert!(t.drag_brush(width * 0.25, width * 0.75));
        let brush = t.minimap().brush();
        assert_eq!((brush.min, brush.max), (t.viewport().min, t.viewport().max));
        t.end_brush();
        assert!(t.minimap().brush().transition);
    }

    #[test]
    fn empty_brush_leaves_viewport_alone() {
        let mut t = timeline();
        let before = t.viewport();
        t.begin_brush();
        assert!(!t.drag_brush(300.0, 300.0));
        t.end_brush();
        assert_eq!(t.viewport(), before);
        let brush = t.minimap().brush();
        assert_eq!((brush.min, brush.max), (before.min, before.max));
        assert!(!brush.transition);
    }

    #[test]
    fn keyboard_changes_are_mirrored_on_brush() {
        let mut t = timeline();
        t.key(NavigationKey::Plus);
        let brush = t.minimap().brush();
        assert_eq!((brush.min, brush.max), (t.viewport().min, t.viewport().max));
    }

    #[test]
    fn toggling_minimized_keeps_tiles() {
        let mut t = timeline();
        t.set_lane_minimized(0, true).unwrap();
        assert!(matches!(t.lanes()[0], LaneView::Minimized(_)));
        assert_eq!(t.lanes()[0].lane().tiles.len(), 4);
        t.set_lane_minimized(0, false).unwrap();
        assert_eq!(visibility(&t), vec![true, false, true, false]);
        assert!(matches!(t.set_lane_minimized(7, true), Err(TimelineError::UnknownLane(7))));
    }

    #[test]
    fn pointer_focus_is_reevaluated_after_pan() {
        let mut t = timeline();
        let layout = t.layout();
        let labs = layout.lanes[1];
        assert_eq!(labs.index, 1);

        // Jan 10..18 over 1000 px: 125 px per day. l1 (Jan 5) is off-screen.
        let focus = t.pointer_moved(Point::new(130.0, labs.top + 5.0));
        assert_eq!(focus, None);

        // Same span, l1 now sits at 125 px under the resting cursor.
        t.set_viewport(ms(2024, 1, 4), ms(2024, 1, 12), false);
        let points = t.interactive_points(1).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, "l1");
        assert_eq!(points[0].phase, PointPhase::Entering);

        t.pointer_left();
        let points = t.interactive_points(1).unwrap();
        assert_eq!(points[0].phase, PointPhase::Exiting);
        assert!(t.transition_end(1, &"l1".into()).unwrap());
        assert!(t.interactive_points(1).unwrap().is_empty());
    }

    #[test]
    fn layout_stacks_axis_lanes_and_minimap() {
        let mut t = timeline();
        let layout = t.layout();
        assert_eq!(layout.lanes.len(), 3);
        assert_eq!(layout.lanes[0].top, AXIS_HEIGHT);
        assert_eq!(layout.lane_at(AXIS_HEIGHT + 1.0), Some((0, 1.0)));
        assert_eq!(layout.minimap_height, 30.0);

        t.set_lane_visible(2, false).unwrap();
        let layout = t.layout();
        assert_eq!(layout.lanes.len(), 2);
        assert_eq!(layout.minimap_height, 20.0);
        assert!(layout.in_minimap(layout.minimap_top + 1.0));
    }

    #[test]
    fn pick_finds_tile_mark() {
        let t = timeline();
        let top = t.layout().lanes[0].top;
        // v1 opens its mark at 125 px.
        let hit = t.pick(Point::new(130.0, top + 30.0)).unwrap();
        assert_eq!(hit, Some((0, SharedStr::from("v1"))));
        assert_eq!(t.pick(Point::new(130.0, 1.0)).unwrap(), None);
    }

    #[test]
    fn render_orders_axis_lanes_minimap() {
        let t = timeline();
        let groups: Vec<String> = t
            .render()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::BeginGroup { id, .. } => Some(id.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(groups, vec!["axis", "visits", "labs", "weight", "minimap"]);
    }

    #[test]
    fn minimap_marks_references_and_today() {
        let doc = document().with_references(vec![ReferenceMarker::before(ms(2024, 1, 3))]);
        let mut t = Timeline::new(TimelineConfig::default(), doc).unwrap();
        t.set_surface(Surface::new(1000.0, 400.0));
        t.set_today(Some(ms(2024, 1, 15)));

        let lines: Vec<ThemeToken> = t
            .render()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawLine {
                    color: color @ (ThemeToken::MinimapReferenceLine | ThemeToken::MinimapToday),
                    ..
                } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec![ThemeToken::MinimapReferenceLine, ThemeToken::MinimapToday]);

        // Far outside the overview range: no today line.
        t.set_today(Some(ms(2030, 1, 1)));
        assert_eq!(t.minimap().today_x(), None);
    }

    #[test]
    fn surface_resize_rebuilds_render_context() {
        let mut t = timeline();
        let generation = t.render_context().generation();
        assert!(!t.set_surface(Surface::new(1000.0, 400.0)));
        assert!(t.set_surface(Surface::new(1200.0, 400.0)));
        assert_eq!(t.render_context().generation(), generation + 1);
        assert_eq!(t.scale().range(), (0.0, 1200.0));
    }
}
