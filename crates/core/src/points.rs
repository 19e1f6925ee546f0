//! Which data points are materialized as addressable interactive elements.
//!
//! Everything visible is drawn by the bulk layer. A point additionally gets
//! an interactive element while it is *tracked* (focused, or fading out after
//! losing focus) or *anchored* (backing an open detail popover). Fade-out
//! completion is an event delivered by the renderer through
//! [`PointLifecycleTracker::transition_end`]; nothing is removed eagerly.

use serde::{Deserialize, Serialize};
use tilelane_protocol::{Point, SharedStr};
use tracing::trace;

use crate::config::TimelineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointPhase {
    /// First pass after gaining focus; the renderer starts the focus-in
    /// animation.
    Entering,
    Focused,
    /// Lost focus; removed once its exit transition ends.
    Exiting,
    /// Not tracked, kept only because a popover is anchored on it.
    Anchored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusMetric {
    /// Dot strips: only the x distance counts.
    Horizontal,
    /// Charts: distance in both axes.
    Euclidean,
}

impl FocusMetric {
    pub fn distance(self, a: Point, b: Point) -> f64 {
        match self {
            Self::Horizontal => (a.x - b.x).abs(),
            Self::Euclidean => a.distance(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractivePoint {
    pub id: SharedStr,
    pub phase: PointPhase,
}

impl InteractivePoint {
    pub fn is_focused(&self) -> bool {
        matches!(self.phase, PointPhase::Entering | PointPhase::Focused)
    }
}

#[derive(Debug, Clone)]
pub struct PointLifecycleTracker {
    metric: FocusMetric,
    focus_distance: f64,
    clipping_margin: f64,
    tracked: Vec<(SharedStr, PointPhase)>,
    anchored: Vec<SharedStr>,
    focus: Option<SharedStr>,
    focus_position: Option<Point>,
}

impl PointLifecycleTracker {
    pub fn new(metric: FocusMetric, config: &TimelineConfig) -> Self {
        Self {
            metric,
            focus_distance: config.focus_distance,
            clipping_margin: config.clipping_margin(),
            tracked: Vec::new(),
            anchored: Vec::new(),
            focus: None,
            focus_position: None,
        }
    }

    pub fn metric(&self) -> FocusMetric {
        self.metric
    }

    pub fn focus(&self) -> Option<&SharedStr> {
        self.focus.as_ref()
    }

    /// Last cursor position, re-applied after every viewport change.
    pub fn focus_position(&self) -> Option<Point> {
        self.focus_position
    }

    pub fn clipping_margin(&self) -> f64 {
        self.clipping_margin
    }

    /// The candidate closest to `position`, strictly nearer than the focus
    /// distance. Ties keep the earlier candidate.
    pub fn closest<'a, I>(&self, position: Point, candidates: I) -> Option<&'a SharedStr>
    where
        I: IntoIterator<Item = (&'a SharedStr, Point)>,
    {
        let mut best: Option<&'a SharedStr> = None;
        let mut best_distance = self.focus_distance;
        for (id, at) in candidates {
            let d = self.metric.distance(position, at);
            if d < best_distance {
                best_distance = d;
                best = Some(id);
            }
        }
        best
    }

    /// Move the cursor (or clear it with `None`) and re-evaluate focus over
    /// the visible candidates.
    pub fn set_focus<'a, I>(&mut self, position: Option<Point>, candidates: I) -> Option<&SharedStr>
    where
        I: IntoIterator<Item = (&'a SharedStr, Point)>,
    {
        self.focus_position = position;
        self.focus = position.and_then(|p| self.closest(p, candidates)).cloned();

        for (id, phase) in &mut self.tracked {
            let next = if self.focus.as_ref() == Some(id) {
                PointPhase::Focused
            } else {
                PointPhase::Exiting
            };
            if *phase != next {
                trace!(point = %id, from = ?phase, to = ?next, "point phase");
                *phase = next;
            }
        }
        match &self.focus {
            Some(focus) if !self.tracked.iter().any(|(id, _)| id == focus) => {
                trace!(point = %focus, "point entering");
                self.tracked.push((focus.clone(), PointPhase::Entering));
            }
            _ => {}
        }
        self.focus.as_ref()
    }

    /// Anchor a popover on `id`. Returns `true` if the point was not yet
    /// interactive and must be materialized.
    pub fn lock(&mut self, id: &SharedStr) -> bool {
        let was_interactive = self.is_interactive(id);
        if !self.anchored.contains(id) {
            self.anchored.push(id.clone());
        }
        !was_interactive
    }

    /// Release a popover anchor. Returns `true` if the point left the
    /// interactive layer.
    pub fn unlock(&mut self, id: &SharedStr) -> bool {
        let before = self.anchored.len();
        self.anchored.retain(|a| a != id);
        before != self.anchored.len() && !self.is_tracked(id)
    }

    /// The renderer finished a point's focus transition. A point that is no
    /// longer the focus stops being tracked. Returns `true` when its
    /// interactive element can be removed.
    pub fn transition_end(&mut self, id: &SharedStr) -> bool {
        if self.focus.as_ref() == Some(id) {
            return false;
        }
        let Some(index) = self.tracked.iter().position(|(t, _)| t == id) else {
            return false;
        };
        self.tracked.remove(index);
        trace!(point = %id, "point exit complete");
        !self.anchored.contains(id)
    }

    /// Drop points whose pixel position falls outside `range` widened by the
    /// clipping margin, or that no longer exist. No exit animation is needed
    /// for points that are already off-screen.
    pub fn prune<F>(&mut self, range: (f64, f64), position_of: F)
    where
        F: Fn(&SharedStr) -> Option<f64>,
    {
        let lo = range.0 - self.clipping_margin;
        let hi = range.1 + self.clipping_margin;
        let keep = |id: &SharedStr| position_of(id).is_some_and(|x| lo <= x && x <= hi);
        self.tracked.retain(|(id, _)| keep(id));
        self.anchored.retain(|id| keep(id));
        if self.focus.as_ref().is_some_and(|f| !keep(f)) {
            self.focus = None;
        }
    }

    /// Forget everything, e.g. when a lane switches display mode.
    pub fn clear(&mut self) {
        self.tracked.clear();
        self.anchored.clear();
        self.focus = None;
        self.focus_position = None;
    }

    pub fn is_tracked(&self, id: &SharedStr) -> bool {
        self.tracked.iter().any(|(t, _)| t == id)
    }

    pub fn is_anchored(&self, id: &SharedStr) -> bool {
        self.anchored.contains(id)
    }

    pub fn is_interactive(&self, id: &SharedStr) -> bool {
        self.is_tracked(id) || self.is_anchored(id)
    }

    /// Tracked points in order of entry, then anchored points not already
    /// tracked.
    pub fn interactive_points(&self) -> Vec<InteractivePoint> {
        self.tracked
            .iter()
            .map(|(id, phase)| InteractivePoint {
                id: id.clone(),
                phase: *phase,
            })
            .chain(
                self.anchored
                    .iter()
                    .filter(|id| !self.is_tracked(id))
                    .map(|id| InteractivePoint {
                        id: id.clone(),
                        phase: PointPhase::Anchored,
                    }),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<SharedStr> {
        names.iter().map(|&n| SharedStr::from(n)).collect()
    }

    fn strip<'a>(ids: &'a [SharedStr], xs: &[f64]) -> Vec<(&'a SharedStr, Point)> {
        ids.iter().zip(xs).map(|(id, &x)| (id, Point::new(x, 20.0))).collect()
    }

    fn phases(t: &PointLifecycleTracker) -> Vec<(String, PointPhase)> {
        t.interactive_points()
            .into_iter()
            .map(|p| (p.id.to_string(), p.phase))
            .collect()
    }

    fn tracker(metric: FocusMetric) -> PointLifecycleTracker {
        PointLifecycleTracker::new(metric, &TimelineConfig::default())
    }

    #[test]
    fn focuses_nearest_within_distance() {
        let points = ids(&["a", "b", "c"]);
        let mut t = tracker(FocusMetric::Horizontal);
        let candidates = strip(&points, &[100.0, 160.0, 400.0]);

        assert_eq!(t.set_focus(Some(Point::new(140.0, 0.0)), candidates.clone()).map(SharedStr::as_str), Some("b"));
        assert!(t.set_focus(Some(Point::new(300.0, 0.0)), candidates.clone()).is_none());
        // Exactly at the focus distance is not close enough.
        assert!(t.set_focus(Some(Point::new(450.0, 0.0)), candidates).is_none());
    }

    #[test]
    fn ties_keep_first_candidate() {
        let points = ids(&["a", "b"]);
        let t = tracker(FocusMetric::Horizontal);
        let found = t.closest(Point::new(150.0, 0.0), strip(&points, &[140.0, 160.0]));
        assert_eq!(found.map(SharedStr::as_str), Some("a"));
    }

    #[test]
    fn euclidean_metric_uses_both_axes() {
        let points = ids(&["low", "high"]);
        let candidates = vec![(&points[0], Point::new(100.0, 100.0)), (&points[1], Point::new(110.0, 10.0))];
        let chart = tracker(FocusMetric::Euclidean);
        let strip = tracker(FocusMetric::Horizontal);
        let cursor = Point::new(100.0, 12.0);
        assert_eq!(chart.closest(cursor, candidates.clone()).map(SharedStr::as_str), Some("high"));
        assert_eq!(strip.closest(cursor, candidates).map(SharedStr::as_str), Some("low"));
    }

    #[test]
    fn focus_lifecycle() {
        let points = ids(&["a", "b"]);
        let candidates = strip(&points, &[100.0, 300.0]);
        let mut t = tracker(FocusMetric::Horizontal);

        t.set_focus(Some(Point::new(105.0, 0.0)), candidates.clone());
        assert_eq!(phases(&t), [("a".to_string(), PointPhase::Entering)]);

        t.set_focus(Some(Point::new(101.0, 0.0)), candidates.clone());
        assert_eq!(phases(&t), [("a".to_string(), PointPhase::Focused)]);

        // Focus-in transition of the focused point does not remove it.
        assert!(!t.transition_end(&points[0]));
        assert!(t.is_tracked(&points[0]));

        t.set_focus(Some(Point::new(299.0, 0.0)), candidates.clone());
        assert_eq!(
            phases(&t),
            [("a".to_string(), PointPhase::Exiting), ("b".to_string(), PointPhase::Entering)]
        );

        assert!(t.transition_end(&points[0]));
        assert_eq!(phases(&t), [("b".to_string(), PointPhase::Entering)]);

        t.set_focus(None, candidates);
        assert_eq!(phases(&t), [("b".to_string(), PointPhase::Exiting)]);
        assert!(t.transition_end(&points[1]));
        assert!(t.interactive_points().is_empty());
    }

    #[test]
    fn refocusing_an_exiting_point() {
        let points = ids(&["a"]);
        let candidates = strip(&points, &[100.0]);
        let mut t = tracker(FocusMetric::Horizontal);
        t.set_focus(Some(Point::new(100.0, 0.0)), candidates.clone());
        t.set_focus(None, candidates.clone());
        assert_eq!(phases(&t), [("a".to_string(), PointPhase::Exiting)]);
        t.set_focus(Some(Point::new(100.0, 0.0)), candidates);
        assert_eq!(phases(&t), [("a".to_string(), PointPhase::Focused)]);
    }

    #[test]
    fn anchored_points_survive_exit() {
        let points = ids(&["a"]);
        let candidates = strip(&points, &[100.0]);
        let mut t = tracker(FocusMetric::Horizontal);
        t.set_focus(Some(Point::new(100.0, 0.0)), candidates.clone());
        assert!(!t.lock(&points[0]));

        t.set_focus(None, candidates);
        assert!(!t.transition_end(&points[0]));
        assert_eq!(phases(&t), [("a".to_string(), PointPhase::Anchored)]);

        assert!(t.unlock(&points[0]));
        assert!(t.interactive_points().is_empty());
    }

    #[test]
    fn lock_materializes_untracked_point() {
        let points = ids(&["a"]);
        let mut t = tracker(FocusMetric::Horizontal);
        assert!(t.lock(&points[0]));
        assert!(!t.lock(&points[0]));
        assert_eq!(phases(&t), [("a".to_string(), PointPhase::Anchored)]);
        assert!(!t.unlock(&SharedStr::from("missing")));
    }

    #[test]
    fn unlock_keeps_tracked_point() {
        let points = ids(&["a"]);
        let candidates = strip(&points, &[100.0]);
        let mut t = tracker(FocusMetric::Horizontal);
        t.set_focus(Some(Point::new(100.0, 0.0)), candidates);
        t.lock(&points[0]);
        assert!(!t.unlock(&points[0]));
        assert!(t.is_interactive(&points[0]));
    }

    #[test]
    fn prune_drops_offscreen_points_immediately() {
        let points = ids(&["in", "edge", "out", "gone"]);
        let candidates = strip(&points, &[500.0, -6.0, -20.0, 50.0]);
        let mut t = tracker(FocusMetric::Euclidean);
        for (id, at) in &candidates {
            t.set_focus(Some(*at), candidates.clone());
            t.lock(id);
        }
        t.prune((0.0, 1000.0), |id| match id.as_str() {
            "in" => Some(500.0),
            "edge" => Some(-6.0),
            "out" => Some(-20.0),
            _ => None,
        });
        let kept: Vec<_> = t.interactive_points().into_iter().map(|p| p.id.to_string()).collect();
        assert_eq!(kept, ["in", "edge"]);
        assert!(t.focus().is_none());
    }
}
