use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tilelane_protocol::SharedStr;

/// Milliseconds since the Unix epoch.
pub type Timestamp = f64;

/// How an attribute's values should be read by a detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    #[default]
    Text,
    Number,
    Freetext,
    Date,
    Datetime,
}

/// One named property of an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
    /// Shown on the tile face rather than only in the detail view.
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub main_order: i32,
    #[serde(default)]
    pub kind: AttributeKind,
}

/// An interaction as supplied by the data layer. Never mutated by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: SharedStr,
    #[serde(default)]
    pub name: String,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Tile {
    pub fn new(
        id: impl Into<SharedStr>,
        name: impl Into<String>,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start,
            end,
            attributes: Vec::new(),
        }
    }

    /// A dated interaction with `start == end`.
    pub fn point(id: impl Into<SharedStr>, name: impl Into<String>, at: Timestamp) -> Self {
        Self::new(id, name, Some(at), Some(at))
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Both bounds present and finite.
    pub fn is_dated(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s.is_finite() && e.is_finite())
    }

    pub fn is_point(&self) -> bool {
        self.is_dated() && self.start == self.end
    }

    /// Dated start, or `None`.
    pub fn dated_start(&self) -> Option<Timestamp> {
        self.start.filter(|s| s.is_finite())
    }

    pub fn dated_end(&self) -> Option<Timestamp> {
        self.end.filter(|e| e.is_finite())
    }

    /// Attributes flagged `main`, ordered by `main_order`. Ties keep input order.
    pub fn main_attributes(&self) -> Vec<&Attribute> {
        let mut main: Vec<&Attribute> = self.attributes.iter().filter(|a| a.main).collect();
        main.sort_by_key(|a| a.main_order);
        main
    }

    /// Date label for a detail view: `None` when undated, a single date for
    /// points, a `start - end` range otherwise.
    pub fn time_label(&self) -> Option<String> {
        if !self.is_dated() {
            return None;
        }
        let start = format_date(self.start?)?;
        if self.is_point() {
            return Some(start);
        }
        Some(format!("{start} - {}", format_date(self.end?)?))
    }
}

pub(crate) fn format_date(ms: Timestamp) -> Option<String> {
    DateTime::from_timestamp_millis(ms as i64).map(|dt| dt.format("%Y-%m-%d").to_string())
}
