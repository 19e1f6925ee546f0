//! Pixel-space clustering of a lane's tiles.
//!
//! Tiles are merged left to right: a tile opens a new visible mark when its
//! pixel start lies at least `min_tile_distance` past the right edge of the
//! current mark; otherwise it is hidden inside that mark. The same sweep, run
//! with the finer time-indicator constants over a mark's members, yields the
//! ticks drawn inside a stacked tile.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tilelane_protocol::SharedStr;

use crate::config::TimelineConfig;
use crate::model::{Tile, Timestamp};
use crate::scale::TimeScale;

/// Mark width used by [`PresentationTile::duration_width`].
const MIN_DURATION_WIDTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub min_tile_width: f64,
    pub min_tile_distance: f64,
    pub time_indicator_min_width: f64,
    pub time_indicator_min_distance: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::from(&TimelineConfig::default())
    }
}

impl From<&TimelineConfig> for ClusterConfig {
    fn from(config: &TimelineConfig) -> Self {
        Self {
            min_tile_width: config.min_tile_width,
            min_tile_distance: config.min_tile_distance,
            time_indicator_min_width: config.time_indicator_min_width,
            time_indicator_min_distance: config.time_indicator_min_distance,
        }
    }
}

/// A tick inside a mark standing for `count` interactions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeIndicator {
    pub left: f64,
    pub width: f64,
    pub count: usize,
}

impl TimeIndicator {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// Derived presentation state of one input tile.
///
/// Every input tile gets one entry; hidden tiles have `visible == false` and
/// an empty `represents`. A visible entry's `represents` lists the indices of
/// every tile it stands for, itself first, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationTile {
    /// Index into the lane's tile list.
    pub index: usize,
    pub id: SharedStr,
    pub left: f64,
    pub right: f64,
    /// Display width after the width floor and stacking rules.
    pub width: f64,
    pub visible: bool,
    pub dated: bool,
    pub stacked: bool,
    pub represents: Vec<usize>,
    pub indicators: Vec<TimeIndicator>,
}

impl PresentationTile {
    pub fn badge_count(&self) -> usize {
        self.represents.len()
    }

    pub fn is_multiple(&self) -> bool {
        self.represents.len() > 1
    }

    pub fn duration_width(&self) -> f64 {
        (self.right - self.left).max(MIN_DURATION_WIDTH)
    }

    pub fn represented<'a>(&'a self, tiles: &'a [Tile]) -> impl Iterator<Item = &'a Tile> + 'a {
        self.represents.iter().filter_map(|&i| tiles.get(i))
    }

    /// Names of the represented tiles, duplicates collapsed as `name (n)`
    /// in first-seen order.
    pub fn simple_details(&self, tiles: &[Tile]) -> String {
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for tile in self.represented(tiles) {
            let name = tile.name.as_str();
            let count = counts.entry(name).or_insert(0);
            if *count == 0 {
                order.push(name);
            }
            *count += 1;
        }
        order
            .into_iter()
            .map(|name| match counts.get(name).copied().unwrap_or(1) {
                1 => name.to_string(),
                n => format!("{name} ({n})"),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Earliest start and latest end over the represented dated tiles.
    pub fn time_span(&self, tiles: &[Tile]) -> Option<(Timestamp, Timestamp)> {
        self.represented(tiles)
            .filter(|t| t.is_dated())
            .filter_map(|t| Some((t.start?, t.end?)))
            .fold(None, |acc, (s, e)| match acc {
                None => Some((s, e)),
                Some((lo, hi)) => Some((f64::min(lo, s), f64::max(hi, e))),
            })
    }

    /// Pixel extent of the drawn mark.
    pub fn mark_right(&self) -> f64 {
        self.left + self.width
    }
}

/// Clustering result for one lane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneLayout {
    pub tiles: Vec<PresentationTile>,
}

impl LaneLayout {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn visible(&self) -> impl Iterator<Item = &PresentationTile> {
        self.tiles.iter().filter(|t| t.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    pub fn get(&self, id: &str) -> Option<&PresentationTile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    /// The visible dated mark whose drawn extent contains `x`.
    pub fn hit_test(&self, x: f64) -> Option<&PresentationTile> {
        self.visible()
            .filter(|t| t.dated)
            .find(|t| t.left <= x && x <= t.mark_right())
    }

    /// Re-run the sweep for every tile. Membership depends on pixel
    /// distances, so this is required after any change of scale span or
    /// pixel width.
    pub fn cluster(tiles: &[Tile], scale: &TimeScale, config: &ClusterConfig) -> Self {
        let mut out: Vec<PresentationTile> = tiles
            .iter()
            .enumerate()
            .map(|(index, tile)| PresentationTile {
                index,
                id: tile.id.clone(),
                left: if tile.is_dated() { scale.map_opt(tile.start) } else { 0.0 },
                right: if tile.is_dated() { scale.map_opt(tile.end) } else { 0.0 },
                width: config.min_tile_width,
                visible: false,
                dated: tile.is_dated(),
                stacked: false,
                represents: Vec::new(),
                indicators: Vec::new(),
            })
            .collect();

        let (dated, undated): (Vec<usize>, Vec<usize>) = (0..tiles.len()).partition(|&i| tiles[i].is_dated());

        let outlines: Vec<(f64, f64)> = dated.iter().map(|&i| (out[i].left, out[i].right)).collect();
        let clusters = sweep(&outlines, config.min_tile_width, config.min_tile_distance);
        for cluster in clusters {
            let members = &dated[cluster.first..cluster.first + cluster.len];
            let lead = members[0];
            let stacked = members[1..].iter().any(|&m| stacks_with(&tiles[lead], &tiles[m]));
            let mark = &mut out[lead];
            mark.visible = true;
            mark.stacked = stacked;
            mark.represents = members.to_vec();
            for &m in &members[1..] {
                out[m].width = (out[m].right - out[m].left).max(config.min_tile_width);
            }
            settle(&mut out, lead, config);
        }

        if !undated.is_empty() {
            let mark = &mut out[undated[0]];
            mark.visible = true;
            mark.represents = undated;
        }

        Self { tiles: out }
    }

    /// Move every tile to its position under `scale` without touching
    /// cluster membership. Valid only when the span is unchanged.
    pub fn reposition(&mut self, tiles: &[Tile], scale: &TimeScale, config: &ClusterConfig) {
        for mark in self.tiles.iter_mut().filter(|t| t.dated) {
            if let Some(tile) = tiles.get(mark.index) {
                mark.left = scale.map_opt(tile.start);
                mark.right = scale.map_opt(tile.end);
            }
        }
        let leads: Vec<usize> = self
            .tiles
            .iter()
            .filter(|t| t.visible && t.dated)
            .map(|t| t.index)
            .collect();
        for lead in leads {
            settle(&mut self.tiles, lead, config);
        }
    }
}

/// Recompute time indicators and display width of a visible dated mark from
/// its members' current pixel positions.
fn settle(out: &mut [PresentationTile], lead: usize, config: &ClusterConfig) {
    let outlines: Vec<(f64, f64)> = out[lead]
        .represents
        .iter()
        .map(|&m| (out[m].left, out[m].right))
        .collect();
    let indicators: Vec<TimeIndicator> = sweep(
        &outlines,
        config.time_indicator_min_width,
        config.time_indicator_min_distance,
    )
    .into_iter()
    .map(|c| TimeIndicator {
        left: c.left,
        width: c.right - c.left,
        count: c.len,
    })
    .collect();

    let mark = &mut out[lead];
    mark.width = if mark.stacked {
        let max_right = indicators
            .iter()
            .map(TimeIndicator::right)
            .fold(f64::NEG_INFINITY, f64::max);
        (max_right - mark.left).max(config.min_tile_width)
    } else {
        (mark.right - mark.left).max(config.min_tile_width)
    };
    mark.indicators = indicators;
}

/// Merging `other` into a mark led by `lead` makes it a stacked mark unless
/// both are points at the same instant.
fn stacks_with(lead: &Tile, other: &Tile) -> bool {
    lead.is_dated() && (!lead.is_point() || !other.is_point() || lead.start != other.start)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cluster {
    first: usize,
    len: usize,
    left: f64,
    right: f64,
}

/// One left-to-right pass over `(pixel_start, pixel_end)` outlines.
///
/// Every tile reserves `max(end, start + min_width)` before the merge
/// decision. A tile opens a new cluster when its start is at or past
/// `right + distance`; otherwise it extends the current cluster's right edge.
fn sweep(outlines: &[(f64, f64)], min_width: f64, distance: f64) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    for (i, &(start, end)) in outlines.iter().enumerate() {
        let reach = end.max(start + min_width);
        match clusters.last_mut() {
            Some(current) if start < current.right + distance => {
                current.len += 1;
                current.right = current.right.max(reach);
            }
            _ => clusters.push(Cluster {
                first: i,
                len: 1,
                left: start,
                right: reach,
            }),
        }
    }
    clusters
}
