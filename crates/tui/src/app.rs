use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use tilelane_core::{NavigationKey, Timeline, TimelineError};
use tilelane_protocol::{Point, SharedStr, Surface};
use tracing::debug;

use crate::renderer::{CELL_H, CELL_W, Painter};

/// Terminal rows given to each lane.
pub const LANE_ROWS: u16 = 4;
const WHEEL_ZOOM: f64 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Pan { last_x: f64 },
    Brush { origin_x: f64 },
}

/// Interactive session over one timeline.
pub struct App {
    timeline: Timeline,
    area: Rect,
    drag: Option<Drag>,
    /// Lane under the mouse, target of the minimize toggle.
    hovered: Option<usize>,
    focus: Option<SharedStr>,
    selected: Option<(usize, SharedStr)>,
}

impl App {
    pub fn new(mut timeline: Timeline) -> Result<Self, TimelineError> {
        for index in 0..timeline.lanes().len() {
            timeline.set_lane_height(index, f64::from(LANE_ROWS) * CELL_H)?;
        }
        Ok(Self {
            timeline,
            area: Rect::default(),
            drag: None,
            hovered: None,
            focus: None,
            selected: None,
        })
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Lay the timeline out below a one-row header.
    pub fn resize(&mut self, width: u16, height: u16) {
        let area = Rect::new(0, 1, width, height.saturating_sub(1));
        if area != self.area {
            self.area = area;
            let surface = Surface::new(f64::from(area.width) * CELL_W, f64::from(area.height) * CELL_H);
            self.timeline.set_surface(surface);
        }
    }

    /// Returns `false` when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let nav = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Left => Some(NavigationKey::Left),
            KeyCode::Right => Some(NavigationKey::Right),
            KeyCode::Up => Some(NavigationKey::Up),
            KeyCode::Down => Some(NavigationKey::Down),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(NavigationKey::Plus),
            KeyCode::Char('-') => Some(NavigationKey::Minus),
            KeyCode::Char('0') => {
                self.timeline.reset_viewport();
                None
            }
            KeyCode::Char('m') => {
                self.toggle_minimized();
                None
            }
            _ => None,
        };
        if let Some(nav) = nav {
            self.timeline.key(nav);
        }
        true
    }

    fn toggle_minimized(&mut self) {
        let index = self.hovered.unwrap_or(0);
        let Ok(lane) = self.timeline.lane(index) else {
            return;
        };
        let minimized = !lane.lane().minimized;
        if let Err(err) = self.timeline.set_lane_minimized(index, minimized) {
            debug!(%err, "minimize toggle ignored");
        }
    }

    /// Center of the cell under the mouse, in surface pixels.
    fn to_surface(&self, column: u16, row: u16) -> Option<Point> {
        let inside = column >= self.area.x
            && column < self.area.right()
            && row >= self.area.y
            && row < self.area.bottom();
        inside.then(|| {
            Point::new(
                (f64::from(column - self.area.x) + 0.5) * CELL_W,
                (f64::from(row - self.area.y) + 0.5) * CELL_H,
            )
        })
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some(at) = self.to_surface(mouse.column, mouse.row) else {
            self.timeline.pointer_left();
            self.focus = None;
            self.hovered = None;
            return;
        };
        let layout = self.timeline.layout();
        self.hovered = layout.lane_at(at.y).map(|(index, _)| index);

        match mouse.kind {
            MouseEventKind::Moved => {
                self.focus = self.timeline.pointer_moved(at);
            }
            MouseEventKind::Down(MouseButton::Left) if layout.in_minimap(at.y) => {
                self.timeline.begin_brush();
                self.drag = Some(Drag::Brush { origin_x: at.x });
            }
            MouseEventKind::Down(MouseButton::Left) => {
                self.selected = self.timeline.pick(at).ok().flatten();
                self.drag = Some(Drag::Pan { last_x: at.x });
            }
            MouseEventKind::Drag(MouseButton::Left) => match self.drag {
                Some(Drag::Brush { origin_x }) => {
                    self.timeline.drag_brush(origin_x, at.x);
                }
                Some(Drag::Pan { last_x }) => {
                    self.timeline.pan_gesture(at.x - last_x);
                    self.drag = Some(Drag::Pan { last_x: at.x });
                }
                None => {}
            },
            MouseEventKind::Up(MouseButton::Left) => match self.drag.take() {
                Some(Drag::Brush { .. }) => self.timeline.end_brush(),
                Some(Drag::Pan { .. }) => self.timeline.end_gesture(),
                None => {}
            },
            MouseEventKind::ScrollUp => {
                self.timeline.zoom_gesture(at.x, WHEEL_ZOOM);
            }
            MouseEventKind::ScrollDown => {
                self.timeline.zoom_gesture(at.x, 1.0 / WHEEL_ZOOM);
            }
            _ => {}
        }
    }

    fn status(&self) -> String {
        let viewport = self.timeline.viewport();
        let date = |ms: f64| {
            DateTime::<Utc>::from_timestamp_millis(ms as i64)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        let detail = match (&self.selected, &self.focus) {
            (Some((_, id)), _) => format!(" | selected {id}"),
            (None, Some(id)) => format!(" | {id}"),
            (None, None) => String::new(),
        };
        format!(
            " tilelane {} .. {}{detail} | arrows pan/zoom | 0 reset | m minimize | q quit ",
            date(viewport.min),
            date(viewport.max)
        )
    }

    pub fn draw(&self, frame: &mut Frame<'_>) {
        let full = frame.area();
        let header = Rect::new(0, 0, full.width, 1);
        frame.render_widget(
            Paragraph::new(self.status()).style(Style::default().fg(Color::White).bg(Color::DarkGray)),
            header,
        );
        let commands = self.timeline.render();
        Painter::new(frame.buffer_mut(), self.area).paint(&commands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use tilelane_core::{Lane, Tile, TimelineConfig, TimelineDocument};

    const DAY: f64 = 86_400_000.0;

    fn app() -> App {
        let doc = TimelineDocument::new(vec![
            Lane::tiles(
                "visits",
                "Visits",
                (0..10)
                    .map(|i| Tile::point(format!("v{i}"), "visit", f64::from(i) * 3.0 * DAY))
                    .collect(),
            ),
            Lane::tiles("labs", "Labs", vec![Tile::point("l1", "blood", 10.0 * DAY)]),
        ]);
        let timeline = Timeline::new(TimelineConfig::default(), doc).unwrap();
        let mut app = App::new(timeline).unwrap();
        app.resize(120, 30);
        app
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn quits_on_q() {
        let mut app = app();
        assert!(app.handle_key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE)));
        assert!(!app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
    }

    #[test]
    fn arrows_pan_the_viewport() {
        let mut app = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('+'), KeyModifiers::NONE));
        let before = app.timeline().viewport();
        app.handle_key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE));
        let after = app.timeline().viewport();
        assert!(after.min > before.min);
        assert!((after.span() - before.span()).abs() < 1.0);
    }

    #[test]
    fn lanes_get_terminal_rows() {
        let app = app();
        let layout = app.timeline().layout();
        assert_eq!(layout.lanes[0].height, f64::from(LANE_ROWS) * CELL_H);
        assert_eq!(app.timeline().render_context().surface().width, 120.0 * CELL_W);
    }

    #[test]
    fn m_toggles_hovered_lane() {
        let mut app = app();
        let top = app.timeline().layout().lanes[1].top;
        let row = 1 + (top / CELL_H) as u16;
        app.handle_mouse(mouse(MouseEventKind::Moved, 10, row));
        app.handle_key(KeyEvent::new(KeyCode::Char('m'), KeyModifiers::NONE));
        assert!(app.timeline().lanes()[1].lane().minimized);
        assert!(!app.timeline().lanes()[0].lane().minimized);
    }

    #[test]
    fn minimap_drag_moves_viewport() {
        let mut app = app();
        let layout = app.timeline().layout();
        let row = 1 + ((layout.minimap_top + 1.0) / CELL_H) as u16;
        let before = app.timeline().viewport();
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 30, row));
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 60, row));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 60, row));
        let after = app.timeline().viewport();
        assert!(after.span() < before.span());
        let brush = app.timeline().minimap().brush();
        assert_eq!((brush.min, brush.max), (after.min, after.max));
    }
}
