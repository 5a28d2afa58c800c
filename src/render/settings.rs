use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::core::{Rect, Size};

/// The graphics API a host window is actively rendering with.
///
/// Reported by the host windowing layer at node-creation time; this crate
/// never queries it itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GraphicsApi {
    /// OpenGL through the host's unified GPU pipeline.
    OpenGl,
    Metal,
    Vulkan,
    Direct3D,
    /// Direct OpenGL outside the unified pipeline (legacy hosts).
    LegacyOpenGl,
    /// The host's software rasterizer.
    Software,
    #[default]
    Unknown,
}

/// Graphics backend family, derived once per window from [`GraphicsApi`].
///
/// `None` is the state before any window API has been derived; it never
/// selects a node but keeps every settings-driven dispatch total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BackendKind {
    /// GPU-pipeline node (tessellated geometry).
    Gpu,
    /// Immediate 2D replay node.
    Painter,
    /// Offscreen CPU raster node.
    Software,
    #[default]
    None,
}

impl BackendKind {
    /// Derive the backend family for a window's active API.
    ///
    /// Unrecognized APIs fall through to the software family rather than
    /// failing; this is the crate-wide degradation policy.
    pub fn from_api(api: GraphicsApi) -> Self {
        match api {
            GraphicsApi::OpenGl | GraphicsApi::Metal | GraphicsApi::Vulkan | GraphicsApi::Direct3D => {
                Self::Gpu
            }
            GraphicsApi::LegacyOpenGl => Self::Painter,
            GraphicsApi::Software | GraphicsApi::Unknown => Self::Software,
        }
    }

    /// The path realization the factory uses for this backend family.
    pub fn render_type(self) -> RenderType {
        match self {
            Self::Gpu => RenderType::Tessellated,
            Self::Painter | Self::Software => RenderType::Painter,
            Self::None => RenderType::None,
        }
    }
}

/// How the factory realizes path geometry for the current backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderType {
    /// Raw geometry, fill rule enforced by the 2D rasterizer.
    Painter,
    /// Curves pre-flattened into line segments for GPU consumption.
    Tessellated,
    /// No backend derived yet.
    None,
}

/// Curve-smoothness/cost tradeoff, host controlled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RenderQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl RenderQuality {
    /// Line segments per curve when flattening for the tessellated path
    /// family. Deterministic: Low→5, Medium→10, High→15.
    pub fn segment_count(self) -> u32 {
        match self {
            Self::Low => 5,
            Self::Medium => 10,
            Self::High => 15,
        }
    }
}

/// Viewport mapping policy when the artboard and display aspect ratios
/// differ.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FillMode {
    /// Scale each axis independently to fill the rect.
    #[default]
    Stretch,
    /// Largest uniform scale that fits inside the rect, centered (letterbox).
    PreserveAspectFit,
    /// Smallest uniform scale that covers the rect, centered.
    PreserveAspectCrop,
}

/// Render configuration owned by the host item and shared into the factory.
///
/// Mutated in place; changes apply to the next frame or resource
/// construction, never retroactively to already-built resources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderSettings {
    /// Backend family of the current window, via [`BackendKind::from_api`].
    pub backend: BackendKind,
    pub quality: RenderQuality,
    pub fill_mode: FillMode,
}

/// Single-threaded shared handle over [`RenderSettings`].
pub type SharedRenderSettings = Rc<RefCell<RenderSettings>>;

/// Compute where an artboard of intrinsic `artboard_size` is placed inside
/// `item_rect` under `mode`.
///
/// The host item feeds the result to
/// [`crate::render::node::SceneRenderNode::set_artboard_rect`]; hit-testing
/// and drawing then share the same placement. Degenerate artboard sizes
/// return `item_rect` unchanged.
pub fn artboard_placement(item_rect: Rect, artboard_size: Size, mode: FillMode) -> Rect {
    if artboard_size.width <= 0.0 || artboard_size.height <= 0.0 {
        return item_rect;
    }
    let sx = item_rect.width() / artboard_size.width;
    let sy = item_rect.height() / artboard_size.height;
    let scale = match mode {
        FillMode::Stretch => return item_rect,
        FillMode::PreserveAspectFit => sx.min(sy),
        FillMode::PreserveAspectCrop => sx.max(sy),
    };
    let w = artboard_size.width * scale;
    let h = artboard_size.height * scale;
    let x0 = item_rect.x0 + (item_rect.width() - w) / 2.0;
    let y0 = item_rect.y0 + (item_rect.height() - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}
