//! Render-command emitters. Each function draws one part of the timeline
//! from already-computed geometry; none of them mutate state.

pub mod chart;
pub mod dot_strip;
pub mod minimap;
pub mod tile_lane;
pub mod time_axis;

use tilelane_protocol::{Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken};

use crate::model::Lane;

/// Height of the title row at the top of every lane strip.
pub const LANE_HEADER_HEIGHT: f64 = 14.0;
const TITLE_FONT_SIZE: f64 = 10.0;
const TITLE_INSET: f64 = 4.0;

/// Opening commands shared by every lane: group, background, clip, title.
/// Pair with [`close_lane`].
pub(crate) fn open_lane(lane: &Lane, width: f64, top: f64, height: f64) -> Vec<RenderCommand> {
    let frame = Rect::new(0.0, top, width, height);
    vec![
        RenderCommand::BeginGroup {
            id: lane.id.clone(),
            label: Some(SharedStr::from(lane.title.as_str())),
        },
        RenderCommand::DrawRect {
            rect: frame,
            color: ThemeToken::LaneBackground,
            border_color: Some(ThemeToken::LaneBorder),
            label: None,
            tile_id: None,
        },
        RenderCommand::SetClip { rect: frame },
        RenderCommand::DrawText {
            position: Point::new(TITLE_INSET, top + 2.0),
            text: SharedStr::from(lane.title.as_str()),
            color: ThemeToken::LaneHeaderText,
            font_size: TITLE_FONT_SIZE,
            align: TextAlign::Left,
        },
    ]
}

pub(crate) fn close_lane(commands: &mut Vec<RenderCommand>) {
    commands.push(RenderCommand::ClearClip);
    commands.push(RenderCommand::EndGroup);
}
