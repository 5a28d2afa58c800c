//! Animatic embeds vector-animation playback into a UI toolkit's scene
//! graph.
//!
//! The host item owns the loaded animation and drives one synchronous
//! sequence per displayed frame:
//!
//! - Ask the [`RenderFactory`] for a node matching the window's graphics API
//! - Sync geometry (`set_rect`, `set_artboard_rect`) and call `render`
//! - Composite the node's output (texture, canvas replay, or pixel buffer)
//!
//! The animation engine stays external: it emits [`DrawCommand`]s and
//! realizes its resources (paths, paints, gradients, buffers, images,
//! fonts) through the same factory. Everything runs on the UI/render
//! thread; artboard instances are observed weakly and a dead instance
//! simply draws nothing.
#![forbid(unsafe_code)]

// The painter node paints onto a host-owned `vello_cpu` canvas; re-export
// the crate so hosts name those types at the version we link.
pub use vello_cpu;

pub mod foundation;
pub mod render;
pub mod runtime;

pub use foundation::core::{Affine, BezPath, Point, Rect, Size, Vec2};
pub use foundation::error::{AnimaticError, AnimaticResult};

pub use render::buffer::{RenderBuffer, SharedBuffer};
pub use render::factory::RenderFactory;
pub use render::font::{FontHandle, FontVariation, SharedFont};
pub use render::gradient::{Gradient, GradientStop, SharedGradient};
pub use render::image::RenderImage;
pub use render::node::{FrameRgba, NodeGeometry, SceneRenderNode};
pub use render::paint::{PaintStyle, RenderPaint};
pub use render::painter::PainterRenderNode;
pub use render::path::{PainterPath, RenderPath, TessellatedPath};
pub use render::settings::{
    BackendKind, FillMode, GraphicsApi, RenderQuality, RenderSettings, RenderType,
    SharedRenderSettings, artboard_placement,
};
pub use render::software::SoftwareRenderNode;
pub use runtime::artboard::{Artboard, HostItem, SharedArtboard, WeakArtboard, WeakHostItem};
pub use runtime::commands::{
    BlendMode, DrawCommand, FillRule, PackedColor, StrokeCap, StrokeJoin,
};

#[cfg(feature = "gpu")]
pub use render::gpu::GpuRenderNode;
