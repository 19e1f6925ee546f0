use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use tilelane_protocol::{LaneColor, Point, RenderCommand, TextAlign, ThemeToken};

/// Surface pixels per terminal column.
pub const CELL_W: f64 = 8.0;
/// Surface pixels per terminal row.
pub const CELL_H: f64 = 16.0;

fn lane_color(color: LaneColor) -> Color {
    match color {
        LaneColor::LightOrange => Color::Rgb(255, 196, 140),
        LaneColor::LightGreen => Color::Rgb(170, 230, 170),
        LaneColor::LightGold => Color::Rgb(250, 225, 140),
        LaneColor::LightPurple => Color::Rgb(210, 185, 245),
        LaneColor::LightPink => Color::Rgb(250, 190, 215),
        LaneColor::MediumOrange => Color::Rgb(240, 150, 70),
        LaneColor::MediumGreen => Color::Rgb(100, 190, 100),
        LaneColor::MediumGold => Color::Rgb(220, 185, 60),
        LaneColor::MediumPurple => Color::Rgb(160, 120, 220),
        LaneColor::MediumPink => Color::Rgb(230, 120, 170),
        LaneColor::DarkOrange => Color::Rgb(190, 100, 30),
        LaneColor::DarkGreen => Color::Rgb(40, 130, 50),
        LaneColor::DarkGold => Color::Rgb(170, 130, 20),
        LaneColor::DarkPurple => Color::Rgb(110, 70, 170),
        LaneColor::DarkPink => Color::Rgb(170, 60, 110),
    }
}

fn theme_to_color(token: ThemeToken) -> Color {
    match token {
        ThemeToken::Lane(color) => lane_color(color),
        ThemeToken::LaneBackground => Color::Black,
        ThemeToken::LaneBorder => Color::DarkGray,
        ThemeToken::LaneHeaderBackground => Color::DarkGray,
        ThemeToken::LaneHeaderText => Color::White,
        ThemeToken::TileBackground => Color::Rgb(30, 30, 30),
        ThemeToken::TileBorder => Color::Gray,
        ThemeToken::TileText => Color::Black,
        ThemeToken::TileBadge => Color::LightYellow,
        ThemeToken::TimeIndicator => Color::White,
        ThemeToken::TextPrimary => Color::White,
        ThemeToken::TextMuted => Color::DarkGray,
        ThemeToken::DotStroke => Color::Gray,
        ThemeToken::DotFill => Color::White,
        ThemeToken::DotFocus => Color::LightYellow,
        ThemeToken::ChartLine => Color::Cyan,
        ThemeToken::ChartLabel => Color::LightCyan,
        ThemeToken::AxisBackground => Color::Rgb(20, 20, 20),
        ThemeToken::AxisTick => Color::DarkGray,
        ThemeToken::AxisText => Color::Gray,
        ThemeToken::MinimapBackground => Color::Rgb(15, 15, 15),
        ThemeToken::MinimapBrush => Color::Gray,
        ThemeToken::MinimapBrushInverse => Color::Rgb(40, 40, 40),
        ThemeToken::MinimapHandle => Color::LightBlue,
        ThemeToken::MinimapReferenceArea => Color::Rgb(30, 20, 20),
        ThemeToken::MinimapReferenceLine => Color::LightRed,
        ThemeToken::MinimapToday => Color::LightGreen,
    }
}

/// How a filled rectangle lands on the cell grid.
enum Fill {
    /// Clear the cells and paint their background.
    Solid,
    /// Paint the background, keep whatever glyphs are already there.
    Backdrop,
    /// Dim the cells below.
    Shade,
    /// Draw a glyph in the foreground color.
    Glyph(&'static str),
    /// Outline only; nothing to fill on a terminal.
    None,
}

fn fill_for(token: ThemeToken) -> Fill {
    match token {
        ThemeToken::LaneBackground | ThemeToken::AxisBackground | ThemeToken::MinimapBackground => Fill::Backdrop,
        ThemeToken::MinimapBrushInverse | ThemeToken::MinimapReferenceArea => Fill::Shade,
        ThemeToken::MinimapBrush => Fill::None,
        ThemeToken::MinimapHandle => Fill::Glyph("┃"),
        ThemeToken::TimeIndicator => Fill::Glyph("▁"),
        _ => Fill::Solid,
    }
}

/// Paints a render command list onto a ratatui buffer. Surface pixels map to
/// cells through [`CELL_W`] and [`CELL_H`], relative to `area`.
pub struct Painter<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    clip: Rect,
}

impl<'a> Painter<'a> {
    pub fn new(buf: &'a mut Buffer, area: Rect) -> Self {
        let area = area.intersection(buf.area);
        Self { buf, area, clip: area }
    }

    pub fn paint(&mut self, commands: &[RenderCommand]) {
        for cmd in commands {
            match cmd {
                RenderCommand::DrawRect {
                    rect, color, label, ..
                } => {
                    let cells = self.cells_of(rect.x, rect.y, rect.w, rect.h);
                    self.fill(cells, *color);
                    if let Some(label) = label.as_deref() {
                        let style = Style::default().fg(theme_to_color(ThemeToken::TileText));
                        self.text(cells.x.saturating_add(1), cells.y, label, cells.right(), style);
                    }
                }
                RenderCommand::DrawText {
                    position,
                    text,
                    color,
                    align,
                    ..
                } => {
                    let len = text.chars().count() as f64 * CELL_W;
                    let x = match align {
                        TextAlign::Left => position.x,
                        TextAlign::Center => position.x - len / 2.0,
                        TextAlign::Right => position.x - len,
                    };
                    if let Some((col, row)) = self.cell_at(x.max(0.0), position.y) {
                        let style = Style::default().fg(theme_to_color(*color));
                        self.text(col, row, text, self.clip.right(), style);
                    }
                }
                RenderCommand::DrawLine { from, to, color, .. } => self.line(*from, *to, *color),
                RenderCommand::DrawDot { center, color, .. } => {
                    self.glyph(*center, "●", Style::default().fg(theme_to_color(*color)));
                }
                RenderCommand::DrawInteractiveDot {
                    center,
                    focused,
                    entering,
                    ..
                } => {
                    let (symbol, token) = if *focused {
                        ("◉", ThemeToken::DotFocus)
                    } else {
                        ("○", ThemeToken::DotStroke)
                    };
                    let mut style = Style::default().fg(theme_to_color(token));
                    if *entering {
                        style = style.add_modifier(Modifier::BOLD);
                    }
                    self.glyph(*center, symbol, style);
                }
                RenderCommand::SetClip { rect } => {
                    self.clip = self.cells_of(rect.x, rect.y, rect.w, rect.h);
                }
                RenderCommand::ClearClip => self.clip = self.area,
                RenderCommand::BeginGroup { .. } | RenderCommand::EndGroup => {}
            }
        }
    }

    /// Cell containing surface pixel `(x, y)`, if it is inside the clip.
    fn cell_at(&self, x: f64, y: f64) -> Option<(u16, u16)> {
        let col = (x / CELL_W).floor();
        let row = (y / CELL_H).floor();
        if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
            return None;
        }
        let col = f64::from(self.area.x) + col;
        let row = f64::from(self.area.y) + row;
        let inside = col >= f64::from(self.clip.x)
            && col < f64::from(self.clip.right())
            && row >= f64::from(self.clip.y)
            && row < f64::from(self.clip.bottom());
        inside.then_some((col as u16, row as u16))
    }

    /// Cells covered by a pixel rectangle, at least one cell each way,
    /// clipped to the active clip.
    fn cells_of(&self, x: f64, y: f64, w: f64, h: f64) -> Rect {
        if x + w < 0.0 || y + h < 0.0 {
            return Rect::default();
        }
        let to_cell = |cells: f64, origin: u16| -> u16 {
            let c = f64::from(origin) + cells;
            if c.is_finite() { c.clamp(0.0, f64::from(u16::MAX - 1)) as u16 } else { origin }
        };
        let x0 = to_cell((x / CELL_W).floor(), self.area.x);
        let y0 = to_cell((y / CELL_H).floor(), self.area.y);
        let x1 = to_cell(((x + w.max(0.0)) / CELL_W).ceil(), self.area.x).max(x0 + 1);
        let y1 = to_cell(((y + h.max(0.0)) / CELL_H).ceil(), self.area.y).max(y0 + 1);
        Rect::new(x0, y0, x1 - x0, y1 - y0).intersection(self.clip)
    }

    fn fill(&mut self, cells: Rect, token: ThemeToken) {
        let color = theme_to_color(token);
        let fill = fill_for(token);
        for y in cells.top()..cells.bottom() {
            for x in cells.left()..cells.right() {
                let cell = &mut self.buf[(x, y)];
                match fill {
                    Fill::Solid => {
                        cell.set_symbol(" ").set_bg(color);
                    }
                    Fill::Backdrop => {
                        cell.set_bg(color);
                    }
                    Fill::Shade => {
                        cell.set_style(Style::default().add_modifier(Modifier::DIM));
                    }
                    Fill::Glyph(symbol) => {
                        cell.set_symbol(symbol).set_fg(color);
                    }
                    Fill::None => {}
                }
            }
        }
    }

    fn text(&mut self, col: u16, row: u16, text: &str, limit: u16, style: Style) {
        if row < self.clip.y || row >= self.clip.bottom() {
            return;
        }
        let limit = limit.min(self.clip.right());
        let mut buf = [0u8; 4];
        for (i, ch) in text.chars().enumerate() {
            let x = col.saturating_add(i as u16);
            if x >= limit {
                break;
            }
            if x >= self.clip.x {
                self.buf[(x, row)].set_symbol(ch.encode_utf8(&mut buf)).set_style(style);
            }
        }
    }

    fn glyph(&mut self, at: Point, symbol: &str, style: Style) {
        if let Some((col, row)) = self.cell_at(at.x, at.y) {
            self.buf[(col, row)].set_symbol(symbol).set_style(style);
        }
    }

    fn line(&mut self, from: Point, to: Point, token: ThemeToken) {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let symbol = if dx.abs() < f64::EPSILON {
            "│"
        } else if dy.abs() < f64::EPSILON {
            "─"
        } else {
            "•"
        };
        let steps = (dx.abs() / CELL_W).max(dy.abs() / CELL_H).ceil().max(1.0);
        if !steps.is_finite() {
            return;
        }
        let style = Style::default().fg(theme_to_color(token));
        for i in 0..=(steps as u32) {
            let t = f64::from(i) / steps;
            self.glyph(Point::new(from.x + dx * t, from.y + dy * t), symbol, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilelane_protocol::Rect as PxRect;

    fn buffer() -> Buffer {
        Buffer::empty(Rect::new(0, 0, 20, 6))
    }

    fn paint(buf: &mut Buffer, commands: &[RenderCommand]) {
        let area = buf.area;
        Painter::new(buf, area).paint(commands);
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    #[test]
    fn rect_fills_cells_and_writes_label() {
        let mut buf = buffer();
        paint(&mut buf, &[RenderCommand::DrawRect {
            rect: PxRect::new(16.0, 16.0, 64.0, 16.0),
            color: ThemeToken::Lane(LaneColor::MediumGreen),
            border_color: None,
            label: Some("lab".into()),
            tile_id: None,
        }]);
        assert_eq!(buf[(2, 1)].bg, lane_color(LaneColor::MediumGreen));
        assert_eq!(buf[(9, 1)].bg, lane_color(LaneColor::MediumGreen));
        assert_eq!(buf[(10, 1)].bg, Color::Reset);
        assert_eq!(&row(&buf, 1)[3..6], "lab");
    }

    #[test]
    fn clip_restricts_drawing() {
        let mut buf = buffer();
        paint(&mut buf, &[
            RenderCommand::SetClip {
                rect: PxRect::new(0.0, 0.0, 40.0, 16.0),
            },
            RenderCommand::DrawText {
                position: Point::new(0.0, 0.0),
                text: "abcdefgh".into(),
                color: ThemeToken::TextPrimary,
                font_size: 9.0,
                align: TextAlign::Left,
            },
            RenderCommand::DrawDot {
                center: Point::new(4.0, 20.0),
                radius: 4.0,
                color: ThemeToken::DotFill,
            },
            RenderCommand::ClearClip,
        ]);
        assert!(row(&buf, 0).starts_with("abcde "));
        assert_eq!(buf[(0, 1)].symbol(), " ");
    }

    #[test]
    fn centered_text_straddles_position() {
        let mut buf = buffer();
        paint(&mut buf, &[RenderCommand::DrawText {
            position: Point::new(80.0, 0.0),
            text: "7.5".into(),
            color: ThemeToken::ChartLabel,
            font_size: 9.0,
            align: TextAlign::Center,
        }]);
        assert_eq!(&row(&buf, 0)[8..11], "7.5");
    }

    #[test]
    fn focused_dot_is_highlighted() {
        let mut buf = buffer();
        paint(&mut buf, &[RenderCommand::DrawInteractiveDot {
            center: Point::new(12.0, 40.0),
            radius: 6.0,
            point_id: "p".into(),
            focused: true,
            entering: true,
        }]);
        assert_eq!(buf[(1, 2)].symbol(), "◉");
        assert!(buf[(1, 2)].modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn vertical_line_spans_rows_under_backdrop() {
        let mut buf = buffer();
        paint(&mut buf, &[
            RenderCommand::DrawLine {
                from: Point::new(24.0, 0.0),
                to: Point::new(24.0, 64.0),
                color: ThemeToken::AxisTick,
                width: 1.0,
            },
            RenderCommand::DrawRect {
                rect: PxRect::new(0.0, 16.0, 160.0, 32.0),
                color: ThemeToken::LaneBackground,
                border_color: None,
                label: None,
                tile_id: None,
            },
        ]);
        for y in 0..=4 {
            assert_eq!(buf[(3, y)].symbol(), "│");
        }
        assert_eq!(buf[(3, 1)].bg, Color::Black);
    }

    #[test]
    fn painting_is_offset_by_area() {
        let mut buf = buffer();
        Painter::new(&mut buf, Rect::new(0, 1, 20, 5)).paint(&[RenderCommand::DrawDot {
            center: Point::new(0.0, 0.0),
            radius: 4.0,
            color: ThemeToken::DotFill,
        }]);
        assert_eq!(buf[(0, 0)].symbol(), " ");
        assert_eq!(buf[(0, 1)].symbol(), "●");
    }
}
