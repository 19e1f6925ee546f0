use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::TimelineConfig;
use crate::model::Timestamp;
use crate::scale::TimeScale;

/// Relative tolerance for span comparisons. Bounds are products of float
/// arithmetic on epoch milliseconds, so exact equality is too strict.
const SPAN_TOLERANCE: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= SPAN_TOLERANCE * a.abs().max(b.abs())
}

/// The visible time window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub min: Timestamp,
    pub max: Timestamp,
}

impl Viewport {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> Timestamp {
        self.min + self.span() / 2.0
    }
}

/// Who asked for a viewport change. Listeners skip changes that came from
/// themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOrigin {
    /// Keyboard steps, reset, scroll-to and host calls.
    Api,
    /// Continuous wheel/drag gestures on the lanes.
    Zoom,
    /// Dragging the minimap brush.
    Brush,
}

/// What lanes must do after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Span unchanged: shift pixel positions, keep clusters.
    Reposition,
    /// Span or pixel width changed: re-run clustering.
    Rearrange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportChange {
    pub previous: Viewport,
    pub current: Viewport,
    pub kind: ChangeKind,
    pub origin: ChangeOrigin,
}

/// Accumulated zoom transform of an ongoing gesture, relative to the scale
/// captured when the gesture reference was last refreshed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gesture {
    reference: TimeScale,
    k: f64,
    tx: f64,
}

impl Gesture {
    fn new(reference: TimeScale) -> Self {
        Self {
            reference,
            k: 1.0,
            tx: 0.0,
        }
    }

    fn domain(&self) -> (Timestamp, Timestamp) {
        let (r0, r1) = self.reference.range();
        (
            self.reference.invert((r0 - self.tx) / self.k),
            self.reference.invert((r1 - self.tx) / self.k),
        )
    }
}

/// Owns the visible window and the main time scale.
///
/// All mutation goes through one clamped setter. Requests outside the span
/// limits, with non-finite bounds, or identical to the current window are
/// rejected with `None`; accepted requests are shifted (never shrunk) to stay
/// inside `[dataMin - 2·pad, dataMax + 2·pad]`.
#[derive(Debug, Clone)]
pub struct ViewportController {
    viewport: Viewport,
    data_range: (Timestamp, Timestamp),
    min_span: f64,
    max_span: f64,
    range_padding: f64,
    step_size: f64,
    scale: TimeScale,
    gesture: Gesture,
}

impl ViewportController {
    /// Controller showing the padded data range. The scale has no pixel
    /// range until [`set_surface_width`](Self::set_surface_width).
    pub fn new(config: &TimelineConfig, data_min: Timestamp, data_max: Timestamp) -> Self {
        let mut controller = Self {
            viewport: Viewport { min: data_min, max: data_max },
            data_range: (data_min, data_max),
            min_span: config.min_span,
            max_span: config.min_span,
            range_padding: config.range_padding,
            step_size: config.step_size,
            scale: TimeScale::default(),
            gesture: Gesture::new(TimeScale::default()),
        };
        controller.set_data_range(data_min, data_max);
        controller
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scale(&self) -> &TimeScale {
        &self.scale
    }

    pub fn data_range(&self) -> (Timestamp, Timestamp) {
        self.data_range
    }

    pub fn min_span(&self) -> f64 {
        self.min_span
    }

    pub fn max_span(&self) -> f64 {
        self.max_span
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Padding added on each side of the data range.
    pub fn padding(&self) -> f64 {
        (self.data_range.1 - self.data_range.0) * self.range_padding
    }

    /// `[dataMin - pad, dataMax + pad]`: the window shown after a reset.
    pub fn padded_range(&self) -> (Timestamp, Timestamp) {
        let pad = self.padding();
        (self.data_range.0 - pad, self.data_range.1 + pad)
    }

    /// `[dataMin - 2·pad, dataMax + 2·pad]`: the hard pan limit.
    pub fn outer_range(&self) -> (Timestamp, Timestamp) {
        let pad = 2.0 * self.padding();
        (self.data_range.0 - pad, self.data_range.1 + pad)
    }

    /// Replace the data range, recompute the span limit and reset the
    /// window. Always reports a re-arranging change.
    pub fn set_data_range(&mut self, min: Timestamp, max: Timestamp) -> Option<ViewportChange> {
        if !(min.is_finite() && max.is_finite()) {
            trace!(min, max, "ignoring non-finite data range");
            return None;
        }
        let (min, max) = (min.min(max), min.max(max));
        self.data_range = (min, max);
        self.max_span = ((max - min) * (1.0 + 2.0 * self.range_padding)).max(self.min_span);
        let (lo, hi) = self.reset_window();
        self.apply(lo, hi, true, ChangeOrigin::Api)
    }

    /// Set the pixel width of the main drawing surface. Clustering depends
    /// on pixel distances, so a width change forces a re-arrange.
    pub fn set_surface_width(&mut self, width: f64) -> Option<ViewportChange> {
        if !width.is_finite() || width < 0.0 || self.scale.range() == (0.0, width) {
            return None;
        }
        self.scale.set_range(0.0, width);
        self.apply(self.viewport.min, self.viewport.max, true, ChangeOrigin::Api)
    }

    pub fn set_viewport(&mut self, min: Timestamp, max: Timestamp, force: bool) -> Option<ViewportChange> {
        self.apply(min, max, force, ChangeOrigin::Api)
    }

    /// Clamped setter shared by every entry point; `origin` is carried into
    /// the returned change.
    pub fn set_viewport_from(
        &mut self,
        min: Timestamp,
        max: Timestamp,
        force: bool,
        origin: ChangeOrigin,
    ) -> Option<ViewportChange> {
        self.apply(min, max, force, origin)
    }

    /// Move each bound by a fraction of the current span. Equal signs pan,
    /// opposite signs zoom.
    pub fn update_by(&mut self, delta_min: f64, delta_max: f64) -> Option<ViewportChange> {
        let span = self.viewport.span();
        self.apply(
            self.viewport.min + span * delta_min,
            self.viewport.max + span * delta_max,
            false,
            ChangeOrigin::Api,
        )
    }

    /// Pan by `fraction` of the span; positive moves later in time.
    pub fn pan_by(&mut self, fraction: f64) -> Option<ViewportChange> {
        self.update_by(fraction, fraction)
    }

    /// Zoom by `fraction` of the span on each side; positive zooms in.
    pub fn zoom_by(&mut self, fraction: f64) -> Option<ViewportChange> {
        self.update_by(fraction, -fraction)
    }

    pub fn pan_left(&mut self) -> Option<ViewportChange> {
        self.pan_by(-self.step_size)
    }

    pub fn pan_right(&mut self) -> Option<ViewportChange> {
        self.pan_by(self.step_size)
    }

    pub fn zoom_in(&mut self) -> Option<ViewportChange> {
        self.zoom_by(self.step_size)
    }

    pub fn zoom_out(&mut self) -> Option<ViewportChange> {
        self.zoom_by(-self.step_size)
    }

    pub fn reset_to_data_range(&mut self) -> Option<ViewportChange> {
        let (lo, hi) = self.reset_window();
        self.apply(lo, hi, false, ChangeOrigin::Api)
    }

    /// Keep the span, center the window on `center`.
    pub fn scroll_to(&mut self, center: Timestamp) -> Option<ViewportChange> {
        let half = self.viewport.span() / 2.0;
        self.apply(center - half, center + half, false, ChangeOrigin::Api)
    }

    /// Scale the gesture by `factor` (> 1 zooms in) around pixel `anchor`.
    pub fn zoom_gesture(&mut self, anchor: f64, factor: f64) -> Option<ViewportChange> {
        if !(factor.is_finite() && factor > 0.0 && anchor.is_finite()) {
            return None;
        }
        let mut next = self.gesture;
        next.k *= factor;
        next.tx = anchor - (anchor - next.tx) * factor;
        self.apply_gesture(next)
    }

    /// Drag the lanes by `dx` pixels; positive reveals earlier times.
    pub fn pan_gesture(&mut self, dx: f64) -> Option<ViewportChange> {
        if !dx.is_finite() {
            return None;
        }
        let mut next = self.gesture;
        next.tx += dx;
        self.apply_gesture(next)
    }

    /// Rebase gestures on the current window.
    pub fn end_gesture(&mut self) {
        self.gesture = Gesture::new(self.scale);
    }

    fn apply_gesture(&mut self, next: Gesture) -> Option<ViewportChange> {
        if !next.reference.is_established() {
            return None;
        }
        let (min, max) = next.domain();
        let change = self.apply(min, max, false, ChangeOrigin::Zoom)?;
        self.gesture = next;
        // A clamped result no longer matches the transform; rebase on it.
        if !approx_eq(change.current.min, min) || !approx_eq(change.current.max, max) {
            self.end_gesture();
        }
        Some(change)
    }

    fn reset_window(&self) -> (Timestamp, Timestamp) {
        let (lo, hi) = self.padded_range();
        if hi - lo < self.min_span {
            let mid = lo + (hi - lo) / 2.0;
            return (mid - self.min_span / 2.0, mid + self.min_span / 2.0);
        }
        (lo, hi)
    }

    fn apply(&mut self, min: Timestamp, max: Timestamp, force: bool, origin: ChangeOrigin) -> Option<ViewportChange> {
        if !(min.is_finite() && max.is_finite()) {
            trace!(?origin, min, max, "rejected viewport: non-finite bound");
            return None;
        }
        if !force && min == self.viewport.min && max == self.viewport.max {
            trace!(?origin, "rejected viewport: unchanged");
            return None;
        }
        let span = max - min;
        if (span < self.min_span && !approx_eq(span, self.min_span))
            || (span > self.max_span && !approx_eq(span, self.max_span))
        {
            trace!(?origin, span, min_span = self.min_span, max_span = self.max_span, "rejected viewport: span out of bounds");
            return None;
        }

        let (lo, hi) = self.outer_range();
        let (min, max) = if hi - lo < span {
            let mid = lo + (hi - lo) / 2.0;
            (mid - span / 2.0, mid + span / 2.0)
        } else if min < lo {
            (lo, lo + span)
        } else if max > hi {
            (hi - span, hi)
        } else {
            (min, max)
        };
        if !force && approx_eq(min, self.viewport.min) && approx_eq(max, self.viewport.max) {
            trace!(?origin, "rejected viewport: unchanged after clamp");
            return None;
        }

        let previous = self.viewport;
        let kind = if !force && approx_eq(previous.span(), span) {
            ChangeKind::Reposition
        } else {
            ChangeKind::Rearrange
        };
        self.viewport = Viewport { min, max };
        self.scale.set_domain(min, max);
        if origin != ChangeOrigin::Zoom {
            self.end_gesture();
        }
        debug!(?origin, ?kind, min, max, "viewport changed");
        Some(ViewportChange {
            previous,
            current: self.viewport,
            kind,
            origin,
        })
    }
}
