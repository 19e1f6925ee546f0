use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Milliseconds in one day.
pub const DAY_MS: f64 = 86_400_000.0;

/// Every tunable constant of the visualization core.
///
/// Deserializes from a partial JSON object; missing fields take their
/// defaults. `clipping_margin` is derived from `circle_radius` unless set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Width floor (px) every tile reserves while clustering.
    pub min_tile_width: f64,
    /// Minimum gap (px) between two visually distinct marks.
    pub min_tile_distance: f64,
    pub time_indicator_min_width: f64,
    pub time_indicator_min_distance: f64,
    /// Maximum cursor distance (px) at which a point can take focus.
    pub focus_distance: f64,
    /// Fraction of the data span added on each side of the data range.
    pub range_padding: f64,
    /// Smallest viewport span (ms).
    pub min_span: f64,
    /// Fraction of the current span applied by one keyboard pan/zoom step.
    pub step_size: f64,
    pub circle_radius: f64,
    pub stencil_density: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipping_margin: Option<f64>,
    pub minimap_tile_size: f64,
    pub minimap_border_size: f64,
    pub minimap_handle_size: f64,
    pub right_to_left: bool,
    /// Vertical padding (px) above and below a chart's y range.
    pub chart_padding: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            min_tile_width: 200.0,
            min_tile_distance: 4.0,
            time_indicator_min_width: 10.0,
            time_indicator_min_distance: 10.0,
            focus_distance: 50.0,
            range_padding: 0.1,
            min_span: DAY_MS,
            step_size: 0.1,
            circle_radius: 4.0,
            stencil_density: 2.0,
            clipping_margin: None,
            minimap_tile_size: 10.0,
            minimap_border_size: 1.0,
            minimap_handle_size: 3.0,
            right_to_left: false,
            chart_padding: 10.0,
        }
    }
}

impl TimelineConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        Self::from_json_over(&Self::default(), data)
    }

    /// Like [`from_json`](Self::from_json), but fields missing from `data`
    /// keep their value in `base` rather than the crate default.
    pub fn from_json_over(base: &Self, data: &[u8]) -> Result<Self, ConfigError> {
        let overrides: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(data)?;
        let mut merged = match serde_json::to_value(base)? {
            serde_json::Value::Object(fields) => fields,
            _ => serde_json::Map::new(),
        };
        merged.extend(overrides);
        let config: Self = serde_json::from_value(serde_json::Value::Object(merged))?;
        config.validate()?;
        Ok(config)
    }

    /// Pixels beyond the visible range in which points are still kept.
    pub fn clipping_margin(&self) -> f64 {
        self.clipping_margin
            .unwrap_or_else(|| (self.circle_radius * 1.7).ceil())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("min_tile_width", self.min_tile_width),
            ("min_tile_distance", self.min_tile_distance),
            ("time_indicator_min_width", self.time_indicator_min_width),
            ("time_indicator_min_distance", self.time_indicator_min_distance),
            ("focus_distance", self.focus_distance),
            ("circle_radius", self.circle_radius),
            ("minimap_tile_size", self.minimap_tile_size),
            ("minimap_border_size", self.minimap_border_size),
            ("minimap_handle_size", self.minimap_handle_size),
            ("chart_padding", self.chart_padding),
            ("clipping_margin", self.clipping_margin()),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::OutOfRange {
                    field,
                    expected: "a finite, non-negative number",
                    value,
                });
            }
        }
        if !(0.0..1.0).contains(&self.range_padding) {
            return Err(ConfigError::OutOfRange {
                field: "range_padding",
                expected: "in [0, 1)",
                value: self.range_padding,
            });
        }
        if !(self.min_span.is_finite() && self.min_span > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "min_span",
                expected: "positive",
                value: self.min_span,
            });
        }
        if !(self.step_size > 0.0 && self.step_size < 0.5) {
            return Err(ConfigError::OutOfRange {
                field: "step_size",
                expected: "in (0, 0.5)",
                value: self.step_size,
            });
        }
        if !(self.stencil_density.is_finite() && self.stencil_density > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "stencil_density",
                expected: "positive",
                value: self.stencil_density,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = TimelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.clipping_margin(), 7.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = TimelineConfig::from_json(br#"{"min_tile_width": 120, "right_to_left": true}"#)
            .expect("valid config");
        assert_eq!(config.min_tile_width, 120.0);
        assert!(config.right_to_left);
        assert_eq!(config.min_tile_distance, 4.0);
        assert_eq!(config.min_span, DAY_MS);
    }

    #[test]
    fn overrides_apply_over_host_base() {
        let base = TimelineConfig {
            minimap_tile_size: 16.0,
            ..TimelineConfig::default()
        };
        let config = TimelineConfig::from_json_over(&base, br#"{"min_tile_width": 50}"#).expect("valid config");
        assert_eq!(config.minimap_tile_size, 16.0);
        assert_eq!(config.min_tile_width, 50.0);

        let config = TimelineConfig::from_json_over(&base, br#"{"minimap_tile_size": 8}"#).expect("valid config");
        assert_eq!(config.minimap_tile_size, 8.0);
        assert!(matches!(
            TimelineConfig::from_json_over(&base, b"[1, 2]"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn explicit_clipping_margin_wins() {
        let config = TimelineConfig::from_json(br#"{"clipping_margin": 2}"#).expect("valid config");
        assert_eq!(config.clipping_margin(), 2.0);
    }

    #[test]
    fn rejects_out_of_range_padding() {
        let err = TimelineConfig::from_json(br#"{"range_padding": 1.5}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "range_padding",
                ..
            }
        ));
    }

    #[test]
    fn rejects_negative_width() {
        let err = TimelineConfig::from_json(br#"{"min_tile_width": -1}"#).unwrap_err();
        assert!(err.to_string().contains("min_tile_width"));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            TimelineConfig::from_json(b"{not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
