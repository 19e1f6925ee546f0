use serde::{Deserialize, Serialize};
use tilelane_protocol::{Point, RenderCommand, SharedStr};
use tracing::debug;

use super::{DEFAULT_LANE_HEIGHT, Pending, ScaleSlot};
use crate::config::TimelineConfig;
use crate::error::TimelineError;
use crate::model::{ChartMode, ChartPoint, Lane};
use crate::points::{FocusMetric, PointLifecycleTracker, PointPhase};
use crate::render_context::RenderContext;
use crate::scale::TimeScale;
use crate::views::chart::{ChartFrame, render_chart};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelKind {
    /// Value of the newest point in the series.
    Last,
    Max,
    Min,
    Focus,
}

/// A value label anchored on a drawn point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLabel {
    pub key: SharedStr,
    pub kind: LabelKind,
    pub position: Point,
    pub text: String,
}

/// A numeric series drawn as dots or a polyline.
#[derive(Debug, Clone)]
pub struct ChartLane {
    lane: Lane,
    slot: ScaleSlot,
    height: f64,
    padding: f64,
    clipping_margin: f64,
    /// Numeric extent over the whole series.
    extent: Option<(f64, f64)>,
    /// Indices of the points drawn this pass.
    drawn: Vec<usize>,
    min_index: Option<usize>,
    max_index: Option<usize>,
    tracker: PointLifecycleTracker,
}

impl ChartLane {
    pub fn new(mut lane: Lane, config: &TimelineConfig) -> Self {
        lane.sort();
        let extent = value_extent(&lane.points);
        Self {
            lane,
            slot: ScaleSlot::new(),
            height: DEFAULT_LANE_HEIGHT,
            padding: config.chart_padding,
            clipping_margin: config.clipping_margin(),
            extent,
            drawn: Vec::new(),
            min_index: None,
            max_index: None,
            tracker: PointLifecycleTracker::new(FocusMetric::Euclidean, config),
        }
    }

    pub fn lane(&self) -> &Lane {
        &self.lane
    }

    pub fn scale(&self) -> &TimeScale {
        self.slot.scale()
    }

    pub fn mode(&self) -> ChartMode {
        self.lane.chart_mode
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Changing the height moves every point vertically, so focus is
    /// re-evaluated.
    pub fn set_height(&mut self, height: f64) {
        self.height = height.max(0.0);
        self.refresh_points();
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

    /// Vertical pixel of `value`: the series extent maps onto
    /// `[height - padding, padding]`. A flat series sits on the bottom edge.
    pub fn y_of(&self, value: f64) -> f64 {
        let bottom = self.height - self.padding;
        let top = self.padding;
        match self.extent {
            Some((lo, hi)) if hi > lo => bottom + (value - lo) / (hi - lo) * (top - bottom),
            _ => bottom,
        }
    }

    fn point_position(&self, point: &ChartPoint) -> Option<Point> {
        let value = point.numeric()?;
        Some(Point::new(self.slot.scale().map(point.time), self.y_of(value)))
    }

    /// Index range `[first, last)` of points inside the pixel range widened
    /// by the clipping margin.
    fn visible_range(&self) -> (usize, usize) {
        let scale = self.slot.scale();
        let (r0, r1) = scale.range();
        let t0 = scale.invert(r0.min(r1) - self.clipping_margin);
        let t1 = scale.invert(r0.max(r1) + self.clipping_margin);
        let (t_lo, t_hi) = (t0.min(t1), t0.max(t1));
        let points = &self.lane.points;
        let first = points.partition_point(|p| p.time < t_lo);
        let last = first + points[first..].partition_point(|p| p.time <= t_hi);
        (first, last)
    }

    fn refresh(&mut self) {
        let (first, last) = self.visible_range();
        let len = self.lane.points.len();

        // Extremes over the visible subset; ties resolve to the later point.
        self.min_index = None;
        self.max_index = None;
        if let Some((lo, hi)) = self.extent {
            let (mut min, mut max) = (hi, lo);
            for (i, p) in self.lane.points[first..last].iter().enumerate() {
                let Some(v) = p.numeric() else { continue };
                if v <= min {
                    min = v;
                    self.min_index = Some(first + i);
                }
                if v >= max {
                    max = v;
                    self.max_index = Some(first + i);
                }
            }
        }

        // A polyline needs the neighbors just outside the range to reach
        // the edges.
        let (from, to) = match self.lane.chart_mode {
            ChartMode::Line => (first.saturating_sub(1), (last + 1).min(len)),
            ChartMode::Dot => (first, last),
        };
        self.drawn = (from..to).filter(|&i| self.lane.points[i].numeric().is_some()).collect();
        debug!(
            lane = %self.lane.id,
            points = len,
            drawn = self.drawn.len(),
            "chart refreshed"
        );
    }

    /// Pixel positions of the points drawn this pass, in time order.
    pub fn drawn_positions(&self) -> Vec<Point> {
        self.drawn
            .iter()
            .filter_map(|&i| self.point_position(&self.lane.points[i]))
            .collect()
    }

    /// Labels for the newest value, the visible extremes and the focus.
    ///
    /// Extremes that fall on the newest point are not repeated, and the
    /// minimum is dropped when it is the same point as the maximum.
    pub fn labels(&self) -> Vec<ChartLabel> {
        let mut labels = Vec::new();
        if !self.slot.is_current() {
            return labels;
        }
        let points = &self.lane.points;
        let last = points.len().checked_sub(1);
        let mut push = |index: usize, kind: LabelKind| {
            let point = &points[index];
            if let (Some(position), Some(value)) = (self.point_position(point), point.numeric()) {
                labels.push(ChartLabel {
                    key: point.key.clone(),
                    kind,
                    position,
                    text: format_value(value),
                });
            }
        };
        if let Some(last) = last {
            push(last, LabelKind::Last);
        }
        if let Some(max) = self.max_index.filter(|&i| Some(i) != last) {
            push(max, LabelKind::Max);
        }
        if let Some(min) = self
            .min_index
            .filter(|&i| Some(i) != last && Some(i) != self.max_index)
        {
            push(min, LabelKind::Min);
        }
        if let Some(focus) = self.tracker.focus() {
            if let Some(index) = points.iter().position(|p| p.key == *focus) {
                push(index, LabelKind::Focus);
            }
        }
        labels
    }

    fn position_of(&self, key: &SharedStr) -> Option<f64> {
        self.lane
            .points
            .iter()
            .find(|p| p.key == *key)
            .filter(|p| p.numeric().is_some())
            .map(|p| self.slot.scale().map(p.time))
    }

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

    fn candidates(&self) -> Vec<(SharedStr, Point)> {
        self.drawn
            .iter()
            .filter_map(|&i| {
                let point = &self.lane.points[i];
                Some((point.key.clone(), self.point_position(point)?))
            })
            .collect()
    }

    pub fn set_focus(&mut self, position: Option<Point>) -> Option<SharedStr> {
        let candidates = self.candidates();
        self.tracker
            .set_focus(position, candidates.iter().map(|(k, p)| (k, *p)))
            .cloned()
    }

    pub fn pick(&self, position: Point) -> Result<Option<SharedStr>, TimelineError> {
        if !self.slot.is_current() {
            return Err(TimelineError::ScaleNotEstablished(self.lane.id.to_string()));
        }
        let candidates = self.candidates();
        Ok(self
            .tracker
            .closest(position, candidates.iter().map(|(k, p)| (k, *p)))
            .cloned())
    }

    pub fn render(&self, ctx: &RenderContext, top: f64) -> Vec<RenderCommand> {
        if !self.slot.is_current() {
            return Vec::new();
        }
        let interactive: Vec<(SharedStr, Point, bool, bool)> = self
            .tracker
            .interactive_points()
            .into_iter()
            .filter_map(|p| {
                let point = self.lane.points.iter().find(|c| c.key == p.id)?;
                let position = self.point_position(point)?;
                let (focused, entering) = (p.is_focused(), p.phase == PointPhase::Entering);
                Some((p.id, position, focused, entering))
            })
            .collect();
        let frame = ChartFrame {
            lane: &self.lane,
            top,
            height: self.height,
            points: self.drawn_positions(),
            labels: self.labels(),
            interactive,
        };
        render_chart(&frame, ctx)
    }
}

fn value_extent(points: &[ChartPoint]) -> Option<(f64, f64)> {
    points
        .iter()
        .filter_map(ChartPoint::numeric)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

/// Shortest decimal form, at most two fractional digits.
pub(crate) fn format_value(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}
