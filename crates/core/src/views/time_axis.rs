use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use tilelane_protocol::{Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken};

use crate::config::DAY_MS;
use crate::scale::TimeScale;

pub const AXIS_HEIGHT: f64 = 32.0;
const UPPER_TICK_HEIGHT: f64 = 14.0;
const LOWER_TICK_HEIGHT: f64 = 6.0;
const FONT_SIZE: f64 = 10.0;
const UPPER_LABEL_Y: f64 = 2.0;
const LOWER_LABEL_Y: f64 = 17.0;
const LABEL_OFFSET: f64 = 3.0;
/// Lower rows aim for roughly this many ticks across the viewport.
const TARGET_TICKS: f64 = 10.0;
const MAX_TICKS: usize = 2_000;

const YEAR_MS: f64 = 365.0 * DAY_MS;
const MONTH_MS: f64 = 30.0 * DAY_MS;

/// Calendar step between two ticks of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickUnit {
    Years(i32),
    Months(u32),
    /// Days of the month `1, 1 + n, 1 + 2n, …`, restarting each month.
    Days(u32),
    Hours(u32),
    Minutes(u32),
}

/// Candidates for a "nice" lower row, shortest first.
const NICE_UNITS: &[TickUnit] = &[
    TickUnit::Minutes(1),
    TickUnit::Minutes(5),
    TickUnit::Minutes(15),
    TickUnit::Minutes(30),
    TickUnit::Hours(1),
    TickUnit::Hours(3),
    TickUnit::Hours(6),
    TickUnit::Hours(12),
    TickUnit::Days(1),
    TickUnit::Days(2),
    TickUnit::Days(5),
    TickUnit::Days(10),
    TickUnit::Months(1),
    TickUnit::Months(3),
    TickUnit::Years(1),
    TickUnit::Years(2),
    TickUnit::Years(5),
    TickUnit::Years(10),
    TickUnit::Years(20),
    TickUnit::Years(50),
    TickUnit::Years(100),
];

impl TickUnit {
    fn approx_ms(self) -> f64 {
        match self {
            Self::Years(n) => f64::from(n) * YEAR_MS,
            Self::Months(n) => f64::from(n) * MONTH_MS,
            Self::Days(n) => f64::from(n) * DAY_MS,
            Self::Hours(n) => f64::from(n) * 3_600_000.0,
            Self::Minutes(n) => f64::from(n) * 60_000.0,
        }
    }

    /// Latest tick boundary at or before `t`.
    fn floor(self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let (y, m, d, h) = (t.year(), t.month(), t.day(), t.hour());
        match self {
            Self::Years(n) => ymd(y.div_euclid(n.max(1)) * n.max(1), 1, 1),
            Self::Months(n) => ymd(y, t.month0() - t.month0() % n.max(1) + 1, 1),
            Self::Days(n) => ymd(y, m, t.day0() - t.day0() % n.max(1) + 1),
            Self::Hours(n) => Utc.with_ymd_and_hms(y, m, d, h - h % n.max(1), 0, 0).single(),
            Self::Minutes(n) => {
                let minute = t.minute() - t.minute() % n.max(1);
                Utc.with_ymd_and_hms(y, m, d, h, minute, 0).single()
            }
        }
    }

    fn next(self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Years(n) => ymd(t.year() + n.max(1), 1, 1),
            Self::Months(n) => {
                let total = t.year() * 12 + t.month0() as i32 + n.max(1) as i32;
                ymd(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)
            }
            Self::Days(n) => {
                let candidate = t + Duration::days(i64::from(n.max(1)));
                if candidate.month() == t.month() {
                    Some(candidate)
                } else {
                    Self::Months(1).next(t)
                }
            }
            Self::Hours(n) => Some(t + Duration::hours(i64::from(n.max(1)))),
            Self::Minutes(n) => Some(t + Duration::minutes(i64::from(n.max(1)))),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFormat {
    Year,
    Month,
    MonthYear,
    DayOfMonth,
    Date,
    Time,
}

impl LabelFormat {
    pub fn format(self, t: DateTime<Utc>) -> String {
        let pattern = match self {
            Self::Year => "%Y",
            Self::Month => "%b",
            Self::MonthYear => "%b %Y",
            Self::DayOfMonth => "%e",
            Self::Date => "%Y-%m-%d",
            Self::Time => "%H:%M",
        };
        t.format(pattern).to_string().trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRow {
    pub unit: TickUnit,
    pub format: LabelFormat,
}

/// Tick rows for a visible span. Long spans show a single lower row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisGranularity {
    pub upper: Option<TickRow>,
    pub lower: TickRow,
}

/// Smallest nice unit giving at most about [`TARGET_TICKS`] ticks.
fn nice_unit(span: f64) -> TickUnit {
    let raw = span / TARGET_TICKS;
    for &unit in NICE_UNITS {
        if unit.approx_ms() >= raw {
            return unit;
        }
    }
    // Fallback for spans of millennia
    let years = (raw / YEAR_MS).log10().ceil();
    TickUnit::Years(10_f64.powf(years).min(f64::from(i32::MAX)) as i32)
}

pub fn granularity(span: f64) -> AxisGranularity {
    let row = |unit, format| TickRow { unit, format };
    let years = row(TickUnit::Years(1), LabelFormat::Year);
    let months = row(TickUnit::Months(1), LabelFormat::MonthYear);
    if span > 5.0 * YEAR_MS {
        AxisGranularity {
            upper: None,
            lower: row(nice_unit(span), LabelFormat::Year),
        }
    } else if span > YEAR_MS {
        AxisGranularity {
            upper: Some(years),
            lower: row(nice_unit(span), LabelFormat::Month),
        }
    } else if span > 5.0 * MONTH_MS {
        AxisGranularity {
            upper: Some(years),
            lower: row(TickUnit::Months(1), LabelFormat::Month),
        }
    } else if span > 15.0 * DAY_MS {
        AxisGranularity {
            upper: Some(months),
            lower: row(nice_unit(span), LabelFormat::DayOfMonth),
        }
    } else if span > 3.0 * DAY_MS {
        AxisGranularity {
            upper: Some(months),
            lower: row(TickUnit::Days(1), LabelFormat::DayOfMonth),
        }
    } else {
        AxisGranularity {
            upper: Some(row(TickUnit::Days(1), LabelFormat::Date)),
            lower: row(nice_unit(span), LabelFormat::Time),
        }
    }
}

/// Tick instants of `unit` inside `[start, end]` (ms).
pub fn ticks(unit: TickUnit, start: f64, end: f64) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let Some(first) = DateTime::from_timestamp_millis(start.floor() as i64) else {
        return out;
    };
    let mut cursor = unit.floor(first);
    while let Some(tick) = cursor {
        let ms = tick.timestamp_millis() as f64;
        if ms > end || out.len() >= MAX_TICKS {
            break;
        }
        if ms >= start {
            out.push(tick);
        }
        cursor = unit.next(tick);
    }
    out
}

/// Render the two-row time ruler above the lanes.
///
/// Upper ticks span the top of the ruler; lower ticks sit on its bottom edge
/// and extend as gridlines `grid_height` pixels into the lanes.
pub fn render_time_axis(scale: &TimeScale, grid_height: f64) -> Vec<RenderCommand> {
    if !scale.is_established() {
        return Vec::new();
    }
    let (d0, d1) = scale.domain();
    let (start, end) = (d0.min(d1), d0.max(d1));
    let (r0, r1) = scale.range();
    let width = (r1 - r0).abs();
    let levels = granularity(end - start);

    let mut commands = Vec::with_capacity(64);
    commands.push(RenderCommand::BeginGroup {
        id: "axis".into(),
        label: None,
    });
    commands.push(RenderCommand::DrawRect {
        rect: Rect::new(r0.min(r1), 0.0, width, AXIS_HEIGHT),
        color: ThemeToken::AxisBackground,
        border_color: Some(ThemeToken::LaneBorder),
        label: None,
        tile_id: None,
    });

    if let Some(upper) = levels.upper {
        for tick in ticks(upper.unit, start, end) {
            let x = scale.map(tick.timestamp_millis() as f64);
            commands.push(RenderCommand::DrawLine {
                from: Point::new(x, 0.0),
                to: Point::new(x, UPPER_TICK_HEIGHT),
                color: ThemeToken::AxisTick,
                width: 1.0,
            });
            commands.push(label(x, UPPER_LABEL_Y, upper.format.format(tick), ThemeToken::AxisText));
        }
    }

    let lower = levels.lower;
    for tick in ticks(lower.unit, start, end) {
        let x = scale.map(tick.timestamp_millis() as f64);
        commands.push(RenderCommand::DrawLine {
            from: Point::new(x, AXIS_HEIGHT - LOWER_TICK_HEIGHT),
            to: Point::new(x, AXIS_HEIGHT),
            color: ThemeToken::AxisTick,
            width: 0.5,
        });
        commands.push(label(x, LOWER_LABEL_Y, lower.format.format(tick), ThemeToken::TextMuted));
        if grid_height > 0.0 {
            commands.push(RenderCommand::DrawLine {
                from: Point::new(x, AXIS_HEIGHT),
                to: Point::new(x, AXIS_HEIGHT + grid_height),
                color: ThemeToken::LaneBorder,
                width: 0.5,
            });
        }
    }

    commands.push(RenderCommand::EndGroup);
    commands
}

fn label(x: f64, y: f64, text: String, color: ThemeToken) -> RenderCommand {
    RenderCommand::DrawText {
        position: Point::new(x + LABEL_OFFSET, y),
        text: SharedStr::from(text),
        color,
        font_size: FONT_SIZE,
        align: TextAlign::Left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tile::tests::ms;

    fn texts(commands: &[RenderCommand], y: f64) -> Vec<String> {
        commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawText { position, text, .. } if position.y == y => Some(text.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn granularity_follows_span() {
        assert_eq!(granularity(20.0 * YEAR_MS).upper, None);
        assert_eq!(granularity(20.0 * YEAR_MS).lower.format, LabelFormat::Year);
        assert_eq!(granularity(8.0 * YEAR_MS).lower.unit, TickUnit::Years(1));
        assert_eq!(granularity(2.0 * YEAR_MS).lower.format, LabelFormat::Month);
        assert_eq!(granularity(200.0 * DAY_MS).lower.unit, TickUnit::Months(1));
        assert_eq!(granularity(30.0 * DAY_MS).upper.map(|r| r.format), Some(LabelFormat::MonthYear));
        assert_eq!(granularity(10.0 * DAY_MS).lower.unit, TickUnit::Days(1));
        assert_eq!(granularity(DAY_MS).lower.unit, TickUnit::Hours(3));
        assert_eq!(granularity(DAY_MS).lower.format, LabelFormat::Time);
    }

    #[test]
    fn day_ticks_restart_each_month() {
        let days: Vec<u32> = ticks(TickUnit::Days(5), ms(2024, 1, 20), ms(2024, 2, 12))
            .iter()
            .map(|t| t.day())
            .collect();
        assert_eq!(days, vec![21, 26, 31, 1, 6, 11]);
    }

    #[test]
    fn month_ticks_cross_years() {
        let labels: Vec<String> = ticks(TickUnit::Months(3), ms(2023, 11, 15), ms(2024, 8, 1))
            .into_iter()
            .map(|t| LabelFormat::MonthYear.format(t))
            .collect();
        assert_eq!(labels, vec!["Jan 2024", "Apr 2024", "Jul 2024"]);
    }

    #[test]
    fn renders_month_and_day_rows() {
        let scale = TimeScale::new((ms(2024, 1, 1), ms(2024, 1, 31)), (0.0, 900.0));
        let commands = render_time_axis(&scale, 200.0);

        assert_eq!(texts(&commands, UPPER_LABEL_Y), vec!["Jan 2024"]);
        assert_eq!(texts(&commands, LOWER_LABEL_Y), vec!["1", "6", "11", "16", "21", "26", "31"]);

        let gridlines = commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawLine { to, .. } if to.y == AXIS_HEIGHT + 200.0))
            .count();
        assert_eq!(gridlines, 7);
        assert!(matches!(commands.first(), Some(RenderCommand::BeginGroup { .. })));
        assert!(matches!(commands.last(), Some(RenderCommand::EndGroup)));
    }

    #[test]
    fn renders_times_within_a_day() {
        let scale = TimeScale::new((ms(2024, 3, 10), ms(2024, 3, 11)), (0.0, 800.0));
        let commands = render_time_axis(&scale, 0.0);
        assert_eq!(texts(&commands, UPPER_LABEL_Y), vec!["2024-03-10", "2024-03-11"]);
        let lower = texts(&commands, LOWER_LABEL_Y);
        assert_eq!(lower.len(), 9);
        assert_eq!(lower[1], "03:00");
    }

    #[test]
    fn nothing_without_established_scale() {
        assert!(render_time_axis(&TimeScale::default(), 100.0).is_empty());
    }
}
