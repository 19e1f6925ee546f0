use tilelane_protocol::{Point, Rect, RenderCommand, ThemeToken};

use crate::config::TimelineConfig;
use crate::minimap::MinimapSynchronizer;
use crate::model::{Lane, LaneKind};

/// Height of the minimap for `rows` visible lanes.
pub fn minimap_height(config: &TimelineConfig, rows: usize) -> f64 {
    config.minimap_tile_size * rows as f64
}

/// Render the overview strip: one row of tile boxes per visible lane, the
/// reference markers and today line, the shaded regions outside the brush,
/// the brush, and its two resize handles.
///
/// Boxes are centered on the tile start and at least one row tall wide.
/// A box whose floored edges match the previous box of the same lane is
/// skipped. Chart lanes take a row but draw no boxes.
pub fn render_minimap(
    lanes: &[&Lane],
    sync: &MinimapSynchronizer,
    config: &TimelineConfig,
    top: f64,
) -> Vec<RenderCommand> {
    let width = sync.width();
    let height = minimap_height(config, lanes.len());
    if width <= 0.0 || height <= 0.0 {
        return Vec::new();
    }
    let size = config.minimap_tile_size;
    let border = config.minimap_border_size;
    let scale = sync.scale();

    let mut commands = Vec::with_capacity(lanes.iter().map(|l| l.tiles.len()).sum::<usize>() + 8);
    commands.push(RenderCommand::BeginGroup {
        id: "minimap".into(),
        label: Some("Minimap".into()),
    });
    commands.push(RenderCommand::DrawRect {
        rect: Rect::new(0.0, top, width, height),
        color: ThemeToken::MinimapBackground,
        border_color: None,
        label: None,
        tile_id: None,
    });

    for (row, lane) in lanes.iter().enumerate() {
        if lane.kind == LaneKind::Chart {
            continue;
        }
        let y = top + row as f64 * size;
        let mut last: Option<(f64, f64)> = None;
        for tile in lane.tiles.iter().filter(|t| t.is_dated()) {
            let start = scale.map_opt(tile.start);
            let end = scale.map_opt(tile.end);
            let x = start - size / 2.0;
            let w = (end - start).max(size) - 2.0 * border;
            let edges = (x.floor(), (x + w).floor());
            if last == Some(edges) {
                continue;
            }
            last = Some(edges);
            commands.push(RenderCommand::DrawRect {
                rect: Rect::new(x, y, w, size - 2.0 * border),
                color: ThemeToken::Lane(lane.color),
                border_color: None,
                label: None,
                tile_id: None,
            });
        }
    }

    for reference in sync.reference_geometry() {
        let (x, w) = reference.area;
        if w > 0.0 {
            commands.push(RenderCommand::DrawRect {
                rect: Rect::new(x, top, w, height),
                color: ThemeToken::MinimapReferenceArea,
                border_color: None,
                label: None,
                tile_id: None,
            });
        }
        if reference.line_visible(width) {
            commands.push(vertical_line(reference.x, top, height, ThemeToken::MinimapReferenceLine));
        }
    }
    if let Some(x) = sync.today_x() {
        commands.push(vertical_line(x, top, height, ThemeToken::MinimapToday));
    }

    let g = sync.geometry();
    let shaded = [g.inverse_before, g.inverse_after];
    for (x, w) in shaded.into_iter().filter(|&(_, w)| w > 0.0) {
        commands.push(RenderCommand::DrawRect {
            rect: Rect::new(x, top, w, height),
            color: ThemeToken::MinimapBrushInverse,
            border_color: None,
            label: None,
            tile_id: None,
        });
    }
    commands.push(RenderCommand::DrawRect {
        rect: Rect::new(g.left, top, (g.right - g.left).max(0.0), height),
        color: ThemeToken::MinimapBrush,
        border_color: Some(ThemeToken::MinimapHandle),
        label: None,
        tile_id: None,
    });
    for handle in [g.west_handle, g.east_handle] {
        commands.push(RenderCommand::DrawRect {
            rect: Rect::new(handle.x, top + handle.y, handle.w, height),
            color: ThemeToken::MinimapHandle,
            border_color: None,
            label: None,
            tile_id: None,
        });
    }

    commands.push(RenderCommand::EndGroup);
    commands
}

fn vertical_line(x: f64, top: f64, height: f64, color: ThemeToken) -> RenderCommand {
    RenderCommand::DrawLine {
        from: Point::new(x, top),
        to: Point::new(x, top + height),
        color,
        width: 1.0,
    }
}
