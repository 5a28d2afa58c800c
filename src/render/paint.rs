use crate::render::gradient::SharedGradient;
use crate::runtime::commands::{BlendMode, PackedColor, StrokeCap, StrokeJoin};

/// Whether a paint fills the interior of a path or strokes its outline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
}

/// Backend-agnostic paint description.
///
/// The factory hands this out with every field defaulted; the engine
/// configures it before emitting the draw command. A set gradient takes
/// precedence over the solid color. Exclusively owned and rebuilt per draw
/// since its content is frame-variant.
#[derive(Clone, Debug)]
pub struct RenderPaint {
    pub style: PaintStyle,
    pub color: PackedColor,
    pub gradient: Option<SharedGradient>,
    pub blend_mode: BlendMode,
    /// Stroke width in artboard units. Ignored for fills.
    pub thickness: f64,
    pub cap: StrokeCap,
    pub join: StrokeJoin,
}

impl Default for RenderPaint {
    fn default() -> Self {
        Self {
            style: PaintStyle::Fill,
            color: PackedColor::BLACK,
            gradient: None,
            blend_mode: BlendMode::SrcOver,
            thickness: 1.0,
            cap: StrokeCap::Butt,
            join: StrokeJoin::Miter,
        }
    }
}
