use tilelane_protocol::{Point, RenderCommand, SharedStr, ThemeToken};

use super::{close_lane, open_lane};
use crate::model::Lane;
use crate::render_context::RenderContext;

/// Enlargement of a focused interactive dot.
const FOCUS_GROWTH: f64 = 2.0;

/// Render a minimized lane: one stencil blit per bulk dot, then the
/// interactive layer on top.
///
/// `interactive` holds `(id, center, focused, entering)` for every
/// materialized point.
pub fn render_dot_strip(
    lane: &Lane,
    ctx: &RenderContext,
    top: f64,
    height: f64,
    bulk: &[Point],
    interactive: &[(SharedStr, Point, bool, bool)],
) -> Vec<RenderCommand> {
    let width = ctx.surface().width;
    let radius = ctx.stencil().radius;
    let mut commands = open_lane(lane, width, top, height);
    commands.reserve(bulk.len() + interactive.len() + 2);

    commands.extend(bulk.iter().map(|&center| RenderCommand::DrawDot {
        center,
        radius,
        color: ThemeToken::Lane(lane.color),
    }));
    commands.extend(interactive.iter().map(|(id, center, focused, entering)| {
        RenderCommand::DrawInteractiveDot {
            center: *center,
            radius: if *focused { radius + FOCUS_GROWTH } else { radius },
            point_id: id.clone(),
            focused: *focused,
            entering: *entering,
        }
    }));

    close_lane(&mut commands);
    commands
}
