use serde::{Deserialize, Serialize};

use crate::model::Timestamp;

/// Linear mapping between a time interval (ms) and a pixel interval.
///
/// `TimeScale` is `Copy`: a lane that stores the scale it was last arranged
/// with holds an independent snapshot that later viewport changes cannot
/// alter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    domain: (Timestamp, Timestamp),
    range: (f64, f64),
}

impl Default for TimeScale {
    /// Unit domain onto a zero-width range: maps everything to 0 and is not
    /// established.
    fn default() -> Self {
        Self {
            domain: (0.0, 1.0),
            range: (0.0, 0.0),
        }
    }
}

impl TimeScale {
    pub fn new(domain: (Timestamp, Timestamp), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (Timestamp, Timestamp) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn set_domain(&mut self, min: Timestamp, max: Timestamp) {
        self.domain = (min, max);
    }

    pub fn set_range(&mut self, r0: f64, r1: f64) {
        self.range = (r0, r1);
    }

    pub fn with_range(mut self, r0: f64, r1: f64) -> Self {
        self.range = (r0, r1);
        self
    }

    pub fn span(&self) -> f64 {
        self.domain.1 - self.domain.0
    }

    pub fn width(&self) -> f64 {
        self.range.1 - self.range.0
    }

    /// A scale with a non-empty pixel range. Geometry computed against an
    /// unestablished scale collapses every tile onto pixel 0.
    pub fn is_established(&self) -> bool {
        self.width().abs() > 0.0 && self.span().abs() > 0.0
    }

    /// Time to pixel. `NaN` maps to 0. A zero-length domain maps to `r0`.
    pub fn map(&self, t: Timestamp) -> f64 {
        if t.is_nan() {
            return 0.0;
        }
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (t - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Like [`map`](Self::map), treating a missing timestamp as undated.
    pub fn map_opt(&self, t: Option<Timestamp>) -> f64 {
        t.map_or(0.0, |t| self.map(t))
    }

    /// Pixel to time. A zero-width range inverts to `d0`.
    pub fn invert(&self, px: f64) -> Timestamp {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (px - r0) / (r1 - r0) * (d1 - d0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn maps_linearly() {
        let scale = TimeScale::new((1000.0, 2000.0), (0.0, 500.0));
        assert!((scale.map(1000.0) - 0.0).abs() < EPS);
        assert!((scale.map(1500.0) - 250.0).abs() < EPS);
        assert!((scale.map(3000.0) - 1000.0).abs() < EPS);
        assert!((scale.invert(250.0) - 1500.0).abs() < EPS);
    }

    #[test]
    fn round_trips_within_domain() {
        let scale = TimeScale::new((1.5e12, 1.6e12), (0.0, 1234.0));
        for i in 0..=20 {
            let t = 1.5e12 + i as f64 * 5e9;
            let back = scale.invert(scale.map(t));
            assert!((back - t).abs() / t < 1e-12, "t={t} back={back}");
        }
    }

    #[test]
    fn nan_and_missing_map_to_zero() {
        let scale = TimeScale::new((0.0, 10.0), (100.0, 200.0));
        assert_eq!(scale.map(f64::NAN), 0.0);
        assert_eq!(scale.map_opt(None), 0.0);
        assert!((scale.map_opt(Some(5.0)) - 150.0).abs() < EPS);
    }

    #[test]
    fn reversed_domain_interpolates() {
        let scale = TimeScale::new((10.0, 0.0), (0.0, 100.0));
        assert!((scale.map(2.5) - 75.0).abs() < EPS);
    }

    #[test]
    fn degenerate_scales() {
        let flat = TimeScale::new((5.0, 5.0), (0.0, 100.0));
        assert_eq!(flat.map(7.0), 0.0);
        assert!(!flat.is_established());

        let unmeasured = TimeScale::default();
        assert!(!unmeasured.is_established());
        assert_eq!(unmeasured.invert(42.0), 0.0);
    }

    #[test]
    fn copies_are_independent() {
        let mut live = TimeScale::new((0.0, 10.0), (0.0, 100.0));
        let frozen = live;
        live.set_domain(0.0, 20.0);
        assert!((frozen.map(10.0) - 100.0).abs() < EPS);
        assert!((live.map(10.0) - 50.0).abs() < EPS);
    }
}
