use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tilelane_protocol::{LaneColor, SharedStr};

use super::tile::{Tile, Timestamp};
use crate::scale::TimeScale;

/// What a lane displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneKind {
    #[default]
    Tiles,
    Chart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[default]
    Dot,
    Line,
}

/// One sample of a numeric series. `value: None` marks a missing measurement;
/// it is kept for ordering but never drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub key: SharedStr,
    pub time: Timestamp,
    pub value: Option<f64>,
}

impl ChartPoint {
    pub fn new(key: impl Into<SharedStr>, time: Timestamp, value: Option<f64>) -> Self {
        Self {
            key: key.into(),
            time,
            value,
        }
    }

    /// Finite numeric value, if any.
    pub fn numeric(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// A horizontal strip of interactions sharing a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: SharedStr,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub color: LaneColor,
    /// Draw tiles as a dot-density strip instead of full tiles.
    #[serde(default)]
    pub minimized: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub kind: LaneKind,
    #[serde(default)]
    pub chart_mode: ChartMode,
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub points: Vec<ChartPoint>,
}

fn default_true() -> bool {
    true
}

impl Lane {
    pub fn tiles(id: impl Into<SharedStr>, title: impl Into<String>, tiles: Vec<Tile>) -> Self {
        let mut lane = Self {
            id: id.into(),
            title: title.into(),
            color: LaneColor::default(),
            minimized: false,
            visible: true,
            kind: LaneKind::Tiles,
            chart_mode: ChartMode::Dot,
            tiles,
            points: Vec::new(),
        };
        lane.sort();
        lane
    }

    pub fn chart(
        id: impl Into<SharedStr>,
        title: impl Into<String>,
        mode: ChartMode,
        points: Vec<ChartPoint>,
    ) -> Self {
        let mut lane = Self {
            id: id.into(),
            title: title.into(),
            color: LaneColor::default(),
            minimized: false,
            visible: true,
            kind: LaneKind::Chart,
            chart_mode: mode,
            tiles: Vec::new(),
            points,
        };
        lane.sort();
        lane
    }

    pub fn with_color(mut self, color: LaneColor) -> Self {
        self.color = color;
        self
    }

    pub fn minimized(mut self, minimized: bool) -> Self {
        self.minimized = minimized;
        self
    }

    /// Stable sort: dated tiles ascending by start, undated tiles after them
    /// in input order; chart points ascending by time. Chart points without a
    /// finite time cannot be placed and are dropped.
    pub fn sort(&mut self) {
        self.tiles
            .sort_by(|a, b| match (a.dated_start(), b.dated_start()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        self.points.retain(|p| p.time.is_finite());
        self.points.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Earliest start and latest end over dated tiles and chart points.
    pub fn time_extent(&self) -> Option<(Timestamp, Timestamp)> {
        let tile_bounds = self
            .tiles
            .iter()
            .filter(|t| t.is_dated())
            .filter_map(|t| Some((t.start?, t.end?)));
        let point_bounds = self
            .points
            .iter()
            .filter(|p| p.time.is_finite())
            .map(|p| (p.time, p.time));
        tile_bounds
            .chain(point_bounds)
            .fold(None, |acc, (s, e)| match acc {
                None => Some((s.min(e), s.max(e))),
                Some((lo, hi)) => Some((lo.min(s).min(e), hi.max(s).max(e))),
            })
    }

    /// Dated tiles whose left edge lies strictly within `tolerance` pixels of
    /// `x`. Used to aggregate dots that overlap in a minimized strip.
    pub fn tiles_near(&self, scale: &TimeScale, x: f64, tolerance: f64) -> Vec<&Tile> {
        self.tiles
            .iter()
            .filter(|t| t.is_dated())
            .filter(|t| {
                let left = scale.map_opt(t.start);
                x - tolerance < left && left < x + tolerance
            })
            .collect()
    }
}
