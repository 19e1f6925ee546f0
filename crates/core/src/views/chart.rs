use tilelane_protocol::{Point, RenderCommand, SharedStr, TextAlign, ThemeToken};

use super::{close_lane, open_lane};
use crate::lanes::{ChartLabel, LabelKind};
use crate::model::{ChartMode, Lane};
use crate::render_context::RenderContext;

const LINE_WIDTH: f64 = 1.5;
const LABEL_FONT_SIZE: f64 = 9.0;
const LABEL_OFFSET: f64 = 6.0;
const FOCUS_GROWTH: f64 = 2.0;

/// Everything a chart lane needs drawn in one pass. Positions are
/// lane-local; `top` is added when emitting.
#[derive(Debug)]
pub struct ChartFrame<'a> {
    pub lane: &'a Lane,
    pub top: f64,
    pub height: f64,
    pub points: Vec<Point>,
    pub labels: Vec<ChartLabel>,
    /// `(key, position, focused, entering)` per materialized point.
    pub interactive: Vec<(SharedStr, Point, bool, bool)>,
}

pub fn render_chart(frame: &ChartFrame<'_>, ctx: &RenderContext) -> Vec<RenderCommand> {
    let lane = frame.lane;
    let shift = |p: Point| Point::new(p.x, p.y + frame.top);
    let radius = ctx.stencil().radius;
    let mut commands = open_lane(lane, ctx.surface().width, frame.top, frame.height);

    match lane.chart_mode {
        ChartMode::Line => {
            commands.extend(frame.points.windows(2).map(|pair| RenderCommand::DrawLine {
                from: shift(pair[0]),
                to: shift(pair[1]),
                color: ThemeToken::ChartLine,
                width: LINE_WIDTH,
            }));
        }
        ChartMode::Dot => {
            commands.extend(frame.points.iter().map(|&p| RenderCommand::DrawDot {
                center: shift(p),
                radius,
                color: ThemeToken::Lane(lane.color),
            }));
        }
    }

    for (key, position, focused, entering) in &frame.interactive {
        commands.push(RenderCommand::DrawInteractiveDot {
            center: shift(*position),
            radius: if *focused { radius + FOCUS_GROWTH } else { radius },
            point_id: key.clone(),
            focused: *focused,
            entering: *entering,
        });
    }

    for label in &frame.labels {
        let (dy, color) = match label.kind {
            LabelKind::Min => (LABEL_OFFSET + LABEL_FONT_SIZE, ThemeToken::ChartLabel),
            LabelKind::Focus => (-LABEL_OFFSET - LABEL_FONT_SIZE, ThemeToken::TextPrimary),
            LabelKind::Last | LabelKind::Max => (-LABEL_OFFSET - LABEL_FONT_SIZE, ThemeToken::ChartLabel),
        };
        let at = shift(label.position);
        commands.push(RenderCommand::DrawText {
            position: Point::new(at.x, at.y + dy),
            text: SharedStr::from(label.text.as_str()),
            color,
            font_size: LABEL_FONT_SIZE,
            align: TextAlign::Center,
        });
    }

    close_lane(&mut commands);
    commands
}
