use crate::foundation::core::{Affine, Point, Rect, Size, Vec2};
use crate::foundation::error::AnimaticResult;
use crate::runtime::artboard::{SharedArtboard, WeakArtboard, WeakHostItem};

/// A rendered frame as RGBA8 pixels.
///
/// Frames produced by the nodes are **premultiplied alpha**; the flag makes
/// this explicit at the compositing boundary.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

/// The backend-independent coordinate-and-bounds cache every node embeds.
///
/// Refreshed once per frame by the owning item; it defines no lifecycle of
/// its own. Scale factors are only ever recomputed as a pair from one
/// bounding-rect/artboard-size observation, so they cannot go independently
/// stale.
pub struct NodeGeometry {
    artboard: WeakArtboard,
    item: WeakHostItem,
    rect: Rect,
    top_left: Point,
    artboard_size: Size,
    scale_x: f64,
    scale_y: f64,
}

impl NodeGeometry {
    pub fn new(artboard: WeakArtboard, item: WeakHostItem) -> Self {
        Self {
            artboard,
            item,
            rect: Rect::ZERO,
            top_left: Point::ZERO,
            artboard_size: Size::ZERO,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Current layout bounds of the owning item; the item is re-queried on
    /// every call. A dead item reads as a zero rect.
    pub fn bounding_rect(&self) -> Rect {
        self.item
            .upgrade()
            .map(|item| item.bounding_rect())
            .unwrap_or(Rect::ZERO)
    }

    /// The node's draw-target rectangle, for backends that size an explicit
    /// target (offscreen buffers, GPU textures).
    pub fn set_rect(&mut self, bounds: Rect) {
        self.rect = bounds;
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Store the artboard's placement rectangle in item-local coordinates
    /// and refresh the artboard-to-item scale factors.
    ///
    /// If the artboard instance is gone the previous scale factors are kept
    /// as-is; the node may be mid-teardown and a silent reset would skew the
    /// frames still in flight.
    pub fn set_artboard_rect(&mut self, bounds: Rect) {
        self.top_left = bounds.origin();
        self.artboard_size = bounds.size();

        if let Some(artboard) = self.artboard.upgrade() {
            let artboard = artboard.borrow();
            self.scale_x = bounds.width() / artboard.width();
            self.scale_y = bounds.height() / artboard.height();
        }
    }

    /// Top-left of the artboard placement, in item-local coordinates.
    pub fn top_left(&self) -> Point {
        self.top_left
    }

    pub fn artboard_size(&self) -> Size {
        self.artboard_size
    }

    pub fn scale_factor_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_factor_y(&self) -> f64 {
        self.scale_y
    }

    /// Upgrade the weak artboard handle, or `None` when the instance is
    /// gone and this frame is a no-op.
    pub fn artboard(&self) -> Option<SharedArtboard> {
        self.artboard.upgrade()
    }

    /// Map an item-local point into artboard space with the same transform
    /// used for drawing; this is the hit-testing entry.
    pub fn map_to_artboard(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.top_left.x) / self.scale_x,
            (p.y - self.top_left.y) / self.scale_y,
        )
    }

    /// The artboard-to-item affine applied under every draw command.
    pub(crate) fn artboard_transform(&self) -> Affine {
        Affine::translate(Vec2::new(self.top_left.x, self.top_left.y))
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Like [`Self::artboard_transform`], rebased into the node's own draw
    /// target whose pixel origin is the rect's top-left.
    pub(crate) fn target_transform(&self) -> Affine {
        Affine::translate(Vec2::new(-self.rect.x0, -self.rect.y0)) * self.artboard_transform()
    }

    /// Integer draw-target size, or `None` for a missing/empty rect
    /// (a no-op frame, by contract).
    pub(crate) fn frame_size(&self) -> Option<(u16, u16)> {
        let w = self.rect.width().round();
        let h = self.rect.height().round();
        if w < 1.0 || h < 1.0 || w > f64::from(u16::MAX) || h > f64::from(u16::MAX) {
            return None;
        }
        Some((w as u16, h as u16))
    }
}

/// The contract every backend node satisfies.
///
/// A node is selected once at construction for the window's backend family
/// and never re-dispatched per frame. The owning item drives it through the
/// same per-frame sequence regardless of variant: `set_rect`,
/// `set_artboard_rect`, then `render`.
pub trait SceneRenderNode {
    fn geometry(&self) -> &NodeGeometry;

    fn geometry_mut(&mut self) -> &mut NodeGeometry;

    /// The backend family this node was selected for.
    fn backend_kind(&self) -> crate::render::settings::BackendKind;

    /// Pull the current frame's draw commands from the artboard and realize
    /// them. A dead artboard handle or an empty draw-target rect must be a
    /// quiet no-op, not an error.
    fn render(&mut self) -> AnimaticResult<()>;

    /// The most recently rendered frame, if the node produced one.
    fn frame(&self) -> Option<&FrameRgba>;

    fn bounding_rect(&self) -> Rect {
        self.geometry().bounding_rect()
    }

    fn set_rect(&mut self, bounds: Rect) {
        self.geometry_mut().set_rect(bounds);
    }

    fn set_artboard_rect(&mut self, bounds: Rect) {
        self.geometry_mut().set_artboard_rect(bounds);
    }

    fn top_left(&self) -> Point {
        self.geometry().top_left()
    }

    fn scale_factor_x(&self) -> f64 {
        self.geometry().scale_factor_x()
    }

    fn scale_factor_y(&self) -> f64 {
        self.geometry().scale_factor_y()
    }

    /// Hit-testing transform; see [`NodeGeometry::map_to_artboard`].
    fn map_to_artboard(&self, p: Point) -> Point {
        self.geometry().map_to_artboard(p)
    }
}
