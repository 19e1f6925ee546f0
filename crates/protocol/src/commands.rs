use serde::{Deserialize, Serialize};

use crate::shared_str::SharedStr;
use crate::theme::ThemeToken;
use crate::types::{Point, Rect};

/// A single, stateless render instruction.
///
/// The core emits a `Vec<RenderCommand>` per pass. Renderers consume the list
/// sequentially; each command carries all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Draw a filled rectangle, optionally with a text label and the id of
    /// the tile it represents (for hit-testing and popovers).
    DrawRect {
        rect: Rect,
        color: ThemeToken,
        border_color: Option<ThemeToken>,
        label: Option<SharedStr>,
        tile_id: Option<SharedStr>,
    },

    /// Draw a text string at a position.
    DrawText {
        position: Point,
        text: SharedStr,
        color: ThemeToken,
        font_size: f64,
        align: TextAlign,
    },

    /// Draw a line segment.
    DrawLine {
        from: Point,
        to: Point,
        color: ThemeToken,
        width: f64,
    },

    /// Blit the prepared dot stencil so that its center lands on `center`.
    /// Bulk-layer dots carry no id and receive no pointer events.
    DrawDot {
        center: Point,
        radius: f64,
        color: ThemeToken,
    },

    /// An addressable dot in the interactive layer. `entering` is set on the
    /// pass the point first appears so the renderer can start its focus
    /// animation; `focused` selects the enlarged style.
    DrawInteractiveDot {
        center: Point,
        radius: f64,
        point_id: SharedStr,
        focused: bool,
        entering: bool,
    },

    /// Restrict subsequent drawing to a rectangular region.
    SetClip { rect: Rect },

    /// Remove the active clip region.
    ClearClip,

    /// Begin a logical group (a lane, the axis, the minimap). Renderers may
    /// use this for batching or layer separation.
    BeginGroup {
        id: SharedStr,
        label: Option<SharedStr>,
    },

    /// End the current group.
    EndGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}
