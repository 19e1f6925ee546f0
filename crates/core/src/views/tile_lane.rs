use tilelane_protocol::{Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken};

use super::{LANE_HEADER_HEIGHT, close_lane, open_lane};
use crate::clustering::{LaneLayout, PresentationTile};
use crate::model::Lane;

const TILE_PADDING: f64 = 4.0;
const INDICATOR_HEIGHT: f64 = 4.0;
const BADGE_FONT_SIZE: f64 = 9.0;
const BADGE_INSET: f64 = 4.0;
/// Width of the undated mark in the lane header.
pub const UNDATED_WIDTH: f64 = 90.0;

/// Render a clustered tile lane.
///
/// Dated marks fill the body below the header. A stacked mark carries its
/// time indicators along its bottom edge and a badge with the number of
/// tiles it stands for. The undated mark, if any, sits at the right end of
/// the header, off the time axis.
pub fn render_tile_lane(lane: &Lane, layout: &LaneLayout, width: f64, top: f64, height: f64) -> Vec<RenderCommand> {
    let mut commands = open_lane(lane, width, top, height);
    let body_top = top + LANE_HEADER_HEIGHT + TILE_PADDING;
    let body_height = (height - LANE_HEADER_HEIGHT - 2.0 * TILE_PADDING).max(0.0);

    for mark in layout.visible() {
        if mark.dated {
            let rect = Rect::new(mark.left, body_top, mark.width, body_height);
            commands.push(RenderCommand::DrawRect {
                rect,
                color: ThemeToken::Lane(lane.color),
                border_color: Some(ThemeToken::TileBorder),
                label: Some(mark_label(lane, mark)),
                tile_id: Some(mark.id.clone()),
            });
            if mark.stacked {
                let y = body_top + body_height - INDICATOR_HEIGHT;
                for indicator in &mark.indicators {
                    commands.push(RenderCommand::DrawRect {
                        rect: Rect::new(indicator.left, y, indicator.width, INDICATOR_HEIGHT),
                        color: ThemeToken::TimeIndicator,
                        border_color: None,
                        label: None,
                        tile_id: None,
                    });
                }
            }
            if mark.is_multiple() {
                commands.push(badge(mark, rect));
            }
        } else {
            let rect = Rect::new(width - UNDATED_WIDTH, top + 1.0, UNDATED_WIDTH, LANE_HEADER_HEIGHT - 2.0);
            commands.push(RenderCommand::DrawRect {
                rect,
                color: ThemeToken::TileBackground,
                border_color: Some(ThemeToken::TileBorder),
                label: Some(mark_label(lane, mark)),
                tile_id: Some(mark.id.clone()),
            });
            if mark.is_multiple() {
                commands.push(badge(mark, rect));
            }
        }
    }

    close_lane(&mut commands);
    commands
}

fn mark_label(lane: &Lane, mark: &PresentationTile) -> SharedStr {
    if mark.is_multiple() {
        SharedStr::from(mark.simple_details(&lane.tiles))
    } else {
        lane.tiles
            .get(mark.index)
            .map(|t| SharedStr::from(t.name.as_str()))
            .unwrap_or_else(|| mark.id.clone())
    }
}

fn badge(mark: &PresentationTile, rect: Rect) -> RenderCommand {
    RenderCommand::DrawText {
        position: Point::new(rect.right() - BADGE_INSET, rect.y + 1.0),
        text: SharedStr::from(mark.badge_count().to_string()),
        color: ThemeToken::TileBadge,
        font_size: BADGE_FONT_SIZE,
        align: TextAlign::Right,
    }
}
