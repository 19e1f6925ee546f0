pub mod document;
pub mod lane;
pub mod tile;

pub use document::{ReferenceMarker, ReferenceSide, TimeRange, TimelineDocument};
pub use lane::{ChartMode, ChartPoint, Lane, LaneKind};
pub use tile::{Attribute, AttributeKind, Tile, Timestamp};
