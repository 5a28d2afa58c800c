use std::rc::Rc;

use crate::foundation::core::Point;
use crate::runtime::commands::PackedColor;

/// One gradient stop: a position along the ramp and its color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// Position in `[0, 1]` along the gradient.
    pub offset: f32,
    pub color: PackedColor,
}

/// Backend-agnostic gradient shader description.
///
/// Geometry is in artboard space; backends realize it into their own paint
/// types at draw time. Shared so the engine can cache one shader across
/// many paints and frames.
#[derive(Clone, Debug, PartialEq)]
pub enum Gradient {
    Linear {
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
    },
    Radial {
        center: Point,
        radius: f64,
        stops: Vec<GradientStop>,
    },
}

/// Reference-counted gradient handle, cacheable by the engine.
pub type SharedGradient = Rc<Gradient>;

impl Gradient {
    pub fn stops(&self) -> &[GradientStop] {
        match self {
            Self::Linear { stops, .. } | Self::Radial { stops, .. } => stops,
        }
    }
}
