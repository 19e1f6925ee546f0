use serde::{Deserialize, Serialize};
use tilelane_protocol::{Point, Surface};
use tracing::debug;

use crate::config::TimelineConfig;

const STENCIL_PADDING: f64 = 2.0;
const STENCIL_LINE_WIDTH: f64 = 3.0;

/// Geometry of the pre-rendered dot image blitted once per bulk-layer point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotStencil {
    pub radius: f64,
    pub padding: f64,
    /// Backing-store pixels per logical pixel.
    pub density: f64,
}

impl DotStencil {
    /// Offset of the dot center from the stencil's top-left corner.
    pub fn center(&self) -> f64 {
        self.padding + self.radius
    }

    /// Logical edge length of the square stencil.
    pub fn size(&self) -> f64 {
        2.0 * (self.padding + self.radius)
    }

    /// Edge length of the backing image.
    pub fn backing_size(&self) -> f64 {
        self.size() * self.density
    }

    /// Radius of the drawn circle; shrunk by half a pixel so the stroked
    /// outline matches an interactive dot of `radius`.
    pub fn draw_radius(&self) -> f64 {
        self.radius - 0.5
    }

    pub fn line_width(&self) -> f64 {
        STENCIL_LINE_WIDTH
    }

    /// Top-left corner at which to blit the stencil for a dot at `center`.
    pub fn origin_for(&self, center: Point) -> Point {
        Point::new(center.x - self.center(), center.y - self.center())
    }
}

/// Cached drawing resources shared by every lane's `render` call.
///
/// Built once from the config and the measured surface, and rebuilt only by
/// [`set_surface`](Self::set_surface) or
/// [`set_theme_generation`](Self::set_theme_generation). Renderers compare
/// [`generation`](Self::generation) to know when to re-rasterize the stencil.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    surface: Surface,
    theme_generation: u64,
    generation: u64,
    circle_radius: f64,
    stencil_density: f64,
    stencil: DotStencil,
}

impl RenderContext {
    pub fn new(config: &TimelineConfig, surface: Surface) -> Self {
        let mut ctx = Self {
            surface,
            theme_generation: 0,
            generation: 0,
            circle_radius: config.circle_radius,
            stencil_density: config.stencil_density,
            stencil: DotStencil {
                radius: config.circle_radius,
                padding: STENCIL_PADDING,
                density: config.stencil_density,
            },
        };
        ctx.rebuild();
        ctx
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn stencil(&self) -> &DotStencil {
        &self.stencil
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn theme_generation(&self) -> u64 {
        self.theme_generation
    }

    pub fn circle_radius(&self) -> f64 {
        self.circle_radius
    }

    /// Returns `true` if the context was rebuilt.
    pub fn set_surface(&mut self, surface: Surface) -> bool {
        if surface == self.surface {
            return false;
        }
        self.surface = surface;
        self.rebuild();
        true
    }

    /// Hosts bump the theme generation whenever stroke or fill colors change.
    pub fn set_theme_generation(&mut self, theme_generation: u64) -> bool {
        if theme_generation == self.theme_generation {
            return false;
        }
        self.theme_generation = theme_generation;
        self.rebuild();
        true
    }

    fn rebuild(&mut self) {
        let dpr = if self.surface.dpr > 0.0 { self.surface.dpr } else { 1.0 };
        self.stencil = DotStencil {
            radius: self.circle_radius,
            padding: STENCIL_PADDING,
            density: self.stencil_density * dpr,
        };
        self.generation += 1;
        debug!(generation = self.generation, density = self.stencil.density, "render context rebuilt");
    }
}
