//! Visualization core for zoomable, pannable lane timelines.
//!
//! Data flows one way through the crate:
//!
//! ```text
//!   tiles + data range ──▶ ViewportController ──▶ TimeScale ──▶ clustering ──▶ PointLifecycleTracker ──▶ RenderCommand[]
//!                                 ▲      │
//!                    brush drag   │      ▼  viewport changes
//!                             MinimapSynchronizer
//! ```
//!
//! [`Timeline`] owns every stage and applies them in a fixed order inside
//! each event callback: viewport clamp, scale update, re-clustering or
//! repositioning, minimap sync, then point lifecycle re-evaluation.

pub mod clustering;
pub mod config;
pub mod error;
pub mod lanes;
pub mod minimap;
pub mod model;
pub mod points;
pub mod render_context;
pub mod scale;
pub mod timeline;
pub mod viewport;
pub mod views;

pub use clustering::{ClusterConfig, LaneLayout, PresentationTile, TimeIndicator};
pub use config::TimelineConfig;
pub use error::{ConfigError, DocumentError, TimelineError};
pub use lanes::LaneView;
pub use minimap::{Brush, BrushGeometry, MinimapSynchronizer, ReferenceGeometry};
pub use model::{Lane, ReferenceMarker, ReferenceSide, Tile, TimelineDocument, Timestamp};
pub use points::{FocusMetric, PointLifecycleTracker, PointPhase};
pub use render_context::RenderContext;
pub use scale::TimeScale;
pub use timeline::{NavigationKey, Timeline};
pub use viewport::{ChangeKind, ChangeOrigin, Viewport, ViewportChange, ViewportController};
