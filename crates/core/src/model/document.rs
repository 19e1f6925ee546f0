use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::lane::Lane;
use super::tile::Timestamp;
use crate::error::DocumentError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: Timestamp,
    pub max: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSide {
    Before,
    After,
}

/// A fixed date marked on the overview, with everything on `side` of it
/// shaded: the start or end of the period the data can cover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMarker {
    pub time: Timestamp,
    pub side: ReferenceSide,
}

impl ReferenceMarker {
    pub fn before(time: Timestamp) -> Self {
        Self {
            time,
            side: ReferenceSide::Before,
        }
    }

    pub fn after(time: Timestamp) -> Self {
        Self {
            time,
            side: ReferenceSide::After,
        }
    }
}

/// Everything a host hands to the core: lanes, reference dates and an
/// optional explicit data range. When the range is absent it is derived
/// from the lanes' contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    #[serde(default)]
    pub range: Option<TimeRange>,
    #[serde(default)]
    pub lanes: Vec<Lane>,
    #[serde(default)]
    pub references: Vec<ReferenceMarker>,
}

impl TimelineDocument {
    pub fn new(lanes: Vec<Lane>) -> Self {
        Self {
            range: None,
            lanes,
            references: Vec::new(),
        }
    }

    pub fn with_references(mut self, references: Vec<ReferenceMarker>) -> Self {
        self.references = references;
        self
    }

    /// Parse a JSON document. Lanes are sorted and checked for unique ids.
    pub fn from_json(data: &[u8]) -> Result<Self, DocumentError> {
        let mut doc: Self = serde_json::from_slice(data)?;
        doc.normalize()?;
        Ok(doc)
    }

    pub fn normalize(&mut self) -> Result<(), DocumentError> {
        let mut seen = HashSet::new();
        for lane in &mut self.lanes {
            if !seen.insert(lane.id.clone()) {
                return Err(DocumentError::DuplicateLane(lane.id.to_string()));
            }
            lane.sort();
        }
        Ok(())
    }

    /// Explicit range, or the extent of all lanes. `None` for a document
    /// with no dated content.
    pub fn data_range(&self) -> Option<(Timestamp, Timestamp)> {
        if let Some(r) = self.range.filter(|r| r.min.is_finite() && r.max.is_finite()) {
            return Some((r.min.min(r.max), r.min.max(r.max)));
        }
        self.lanes
            .iter()
            .filter_map(Lane::time_extent)
            .fold(None, |acc, (lo, hi)| match acc {
                None => Some((lo, hi)),
                Some((a, b)) => Some((a.min(lo), b.max(hi))),
            })
    }
}
