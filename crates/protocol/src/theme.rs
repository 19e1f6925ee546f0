use serde::{Deserialize, Serialize};

/// Per-lane accent color, picked by the data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LaneColor {
    LightOrange,
    LightGreen,
    LightGold,
    LightPurple,
    LightPink,
    #[default]
    MediumOrange,
    MediumGreen,
    MediumGold,
    MediumPurple,
    MediumPink,
    DarkOrange,
    DarkGreen,
    DarkGold,
    DarkPurple,
    DarkPink,
}

/// Semantic color tokens resolved by the renderer's active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    /// Fill of a tile, minimap box or dot in the given lane color.
    Lane(LaneColor),

    LaneBackground,
    LaneBorder,
    LaneHeaderBackground,
    LaneHeaderText,

    TileBackground,
    TileBorder,
    TileText,
    TileBadge,
    TimeIndicator,

    TextPrimary,
    TextMuted,

    // Dot strips and charts
    DotStroke,
    DotFill,
    DotFocus,
    ChartLine,
    ChartLabel,

    // Axis
    AxisBackground,
    AxisTick,
    AxisText,

    // Minimap
    MinimapBackground,
    MinimapBrush,
    MinimapBrushInverse,
    MinimapHandle,
    /// Region outside a reference date, and the line marking it.
    MinimapReferenceArea,
    MinimapReferenceLine,
    MinimapToday,
}
