use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::core::{BezPath, Point};
use crate::render::buffer::{RenderBuffer, SharedBuffer};
use crate::render::font::{FontStore, SharedFont};
use crate::render::gradient::{Gradient, GradientStop, SharedGradient};
use crate::render::image::{RenderImage, decode_image};
use crate::render::node::SceneRenderNode;
use crate::render::paint::RenderPaint;
use crate::render::painter::PainterRenderNode;
use crate::render::path::{PainterPath, RenderPath, TessellatedPath};
use crate::render::settings::{
    BackendKind, GraphicsApi, RenderType, SharedRenderSettings,
};
use crate::render::software::SoftwareRenderNode;
use crate::runtime::artboard::{WeakArtboard, WeakHostItem};
use crate::runtime::commands::{FillRule, PackedColor};

#[cfg(feature = "gpu")]
use crate::render::gpu::GpuRenderNode;

/// Single point of construction for every renderable resource, abstracting
/// over the three backend families.
///
/// The factory shares the host item's [`crate::render::settings::RenderSettings`];
/// settings changes apply to the next construction, never retroactively.
/// Everything downstream of [`RenderFactory::render_node`] is backend-pure.
pub struct RenderFactory {
    settings: SharedRenderSettings,
    fonts: RefCell<FontStore>,
}

impl RenderFactory {
    pub fn new(settings: SharedRenderSettings) -> Self {
        Self {
            settings,
            fonts: RefCell::new(FontStore::new()),
        }
    }

    /// The shared settings handle this factory reads from.
    pub fn settings(&self) -> SharedRenderSettings {
        self.settings.clone()
    }

    /// Select and construct the render node for a window's active graphics
    /// API. This is the only backend dispatch point.
    ///
    /// The derived backend family is recorded into the shared settings, so
    /// later path construction agrees with the node that will consume it.
    /// Without the `gpu` cargo feature the GPU family degrades to the
    /// software node rather than failing.
    pub fn render_node(
        &self,
        api: GraphicsApi,
        artboard: WeakArtboard,
        item: WeakHostItem,
    ) -> Box<dyn SceneRenderNode> {
        let backend = BackendKind::from_api(api);
        self.settings.borrow_mut().backend = backend;

        match backend {
            BackendKind::Gpu => self.gpu_node(artboard, item),
            BackendKind::Painter => Box::new(PainterRenderNode::new(artboard, item)),
            BackendKind::Software | BackendKind::None => {
                Box::new(SoftwareRenderNode::new(artboard, item))
            }
        }
    }

    #[cfg(feature = "gpu")]
    fn gpu_node(&self, artboard: WeakArtboard, item: WeakHostItem) -> Box<dyn SceneRenderNode> {
        let mut node = GpuRenderNode::new(artboard, item);
        node.set_fill_mode(self.settings.borrow().fill_mode);
        Box::new(node)
    }

    #[cfg(not(feature = "gpu"))]
    fn gpu_node(&self, artboard: WeakArtboard, item: WeakHostItem) -> Box<dyn SceneRenderNode> {
        tracing::debug!("gpu backend not compiled in, degrading to software node");
        self.settings.borrow_mut().backend = BackendKind::Software;
        Box::new(SoftwareRenderNode::new(artboard, item))
    }

    /// Copy a span of 16-bit indices into a new shared buffer.
    ///
    /// The caller's span may be transient; buffers never alias it.
    pub fn make_buffer_u16(&self, data: &[u16]) -> SharedBuffer {
        Rc::new(RenderBuffer::U16(data.to_vec()))
    }

    /// Copy a span of 32-bit indices into a new shared buffer.
    pub fn make_buffer_u32(&self, data: &[u32]) -> SharedBuffer {
        Rc::new(RenderBuffer::U32(data.to_vec()))
    }

    /// Copy a span of 32-bit float vertex data into a new shared buffer.
    pub fn make_buffer_f32(&self, data: &[f32]) -> SharedBuffer {
        Rc::new(RenderBuffer::F32(data.to_vec()))
    }

    /// Build a linear gradient shader from `(x1, y1)` to `(x2, y2)`.
    ///
    /// Equal `colors`/`positions` lengths are the engine's guarantee.
    pub fn make_linear_gradient(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        colors: &[PackedColor],
        positions: &[f32],
    ) -> SharedGradient {
        debug_assert_eq!(colors.len(), positions.len());
        Rc::new(Gradient::Linear {
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
            stops: zip_stops(colors, positions),
        })
    }

    /// Build a radial gradient shader around `(center_x, center_y)`.
    pub fn make_radial_gradient(
        &self,
        center_x: f64,
        center_y: f64,
        radius: f64,
        colors: &[PackedColor],
        positions: &[f32],
    ) -> SharedGradient {
        debug_assert_eq!(colors.len(), positions.len());
        Rc::new(Gradient::Radial {
            center: Point::new(center_x, center_y),
            radius,
            stops: zip_stops(colors, positions),
        })
    }

    /// Realize raw path geometry for the current backend family.
    pub fn make_render_path(&self, path: BezPath, fill_rule: FillRule) -> RenderPath {
        realize_path(self.render_type(), path, fill_rule, self.segment_count())
    }

    /// Zero-geometry variant of [`RenderFactory::make_render_path`], used as
    /// a placeholder while no path exists yet.
    pub fn make_empty_render_path(&self) -> RenderPath {
        match self.render_type() {
            RenderType::Painter => RenderPath::Painter(PainterPath::empty()),
            RenderType::Tessellated => {
                RenderPath::Tessellated(TessellatedPath::empty(self.segment_count()))
            }
            // TODO: dedicated empty-path object instead of a default painter path.
            RenderType::None => RenderPath::Painter(PainterPath::empty()),
        }
    }

    /// A default-configured paint; the engine sets style, color, gradient
    /// and blend before emitting it.
    pub fn make_render_paint(&self) -> RenderPaint {
        RenderPaint::default()
    }

    /// Decode arbitrary encoded image bytes. Malformed data reads as
    /// `None` ("image unavailable"), never as an error.
    pub fn decode_image(&self, bytes: &[u8]) -> Option<RenderImage> {
        decode_image(bytes)
    }

    /// Register raw font bytes with the text stack and wrap the first
    /// resolved family. `None` when nothing usable registered.
    pub fn decode_font(&self, bytes: &[u8]) -> Option<SharedFont> {
        self.fonts.borrow_mut().register(bytes).map(Rc::new)
    }

    /// Segments per flattened curve for the current render quality.
    pub fn segment_count(&self) -> u32 {
        self.settings.borrow().quality.segment_count()
    }

    /// Path realization family for the current settings backend.
    pub fn render_type(&self) -> RenderType {
        self.settings.borrow().backend.render_type()
    }
}

fn zip_stops(colors: &[PackedColor], positions: &[f32]) -> Vec<GradientStop> {
    colors
        .iter()
        .zip(positions.iter())
        .map(|(&color, &offset)| GradientStop { offset, color })
        .collect()
}

/// Backend-family path dispatch, total over every [`RenderType`] value.
fn realize_path(
    render_type: RenderType,
    path: BezPath,
    fill_rule: FillRule,
    segment_count: u32,
) -> RenderPath {
    match render_type {
        RenderType::Painter => RenderPath::Painter(PainterPath::new(path, fill_rule)),
        RenderType::Tessellated => {
            RenderPath::Tessellated(TessellatedPath::new(&path, fill_rule, segment_count))
        }
        // TODO: dedicated empty-path object instead of a default painter path.
        RenderType::None => RenderPath::Painter(PainterPath::new(path, fill_rule)),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::render::settings::RenderSettings;

    fn factory_with(backend: BackendKind) -> RenderFactory {
        let settings = Rc::new(RefCell::new(RenderSettings {
            backend,
            ..RenderSettings::default()
        }));
        RenderFactory::new(settings)
    }

    fn sample_path() -> BezPath {
        let mut p = BezPath::new();
        p.move_to((0.0, 0.0));
        p.line_to((10.0, 0.0));
        p.curve_to((10.0, 5.0), (10.0, 8.0), (10.0, 10.0));
        p.line_to((0.0, 10.0));
        p.close_path();
        p
    }

    #[test]
    fn buffers_are_defensive_copies() {
        let factory = factory_with(BackendKind::Software);
        let mut source = vec![1u16, 2, 3];
        let buffer = factory.make_buffer_u16(&source);
        source[0] = 99;
        assert_eq!(buffer.as_u16().unwrap(), &[1, 2, 3]);

        let mut source = vec![1.0f32, 2.0];
        let buffer = factory.make_buffer_f32(&source);
        source[1] = -1.0;
        assert_eq!(buffer.as_f32().unwrap(), &[1.0, 2.0]);

        let buffer = factory.make_buffer_u32(&[7, 8]);
        assert_eq!(buffer.as_u32().unwrap(), &[7, 8]);
    }

    #[test]
    fn realize_path_is_total_over_render_types() {
        for ty in [RenderType::Painter, RenderType::Tessellated, RenderType::None] {
            let realized = realize_path(ty, sample_path(), FillRule::EvenOdd, 10);
            assert!(!realized.is_empty());
            assert_eq!(realized.fill_rule(), FillRule::EvenOdd);
        }
        // The tessellated family is the only one that flattens.
        assert!(matches!(
            realize_path(RenderType::Tessellated, sample_path(), FillRule::NonZero, 10),
            RenderPath::Tessellated(_)
        ));
        assert!(matches!(
            realize_path(RenderType::None, sample_path(), FillRule::NonZero, 10),
            RenderPath::Painter(_)
        ));
    }

    #[test]
    fn empty_path_is_total_over_backends() {
        for backend in [
            BackendKind::Gpu,
            BackendKind::Painter,
            BackendKind::Software,
            BackendKind::None,
        ] {
            let factory = factory_with(backend);
            assert!(factory.make_empty_render_path().is_empty());
        }
    }

    #[test]
    fn render_path_follows_current_settings_backend() {
        let factory = factory_with(BackendKind::Gpu);
        assert!(matches!(
            factory.make_render_path(sample_path(), FillRule::NonZero),
            RenderPath::Tessellated(_)
        ));

        factory.settings().borrow_mut().backend = BackendKind::Software;
        assert!(matches!(
            factory.make_render_path(sample_path(), FillRule::NonZero),
            RenderPath::Painter(_)
        ));
    }

    #[test]
    fn gradients_zip_colors_with_positions() {
        let factory = factory_with(BackendKind::Software);
        let colors = [PackedColor::from_argb(255, 255, 0, 0), PackedColor::BLACK];
        let gradient = factory.make_linear_gradient(0.0, 0.0, 1.0, 0.0, &colors, &[0.0, 1.0]);
        let stops = gradient.stops();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].offset, 0.0);
        assert_eq!(stops[0].color, colors[0]);
        assert_eq!(stops[1].offset, 1.0);

        let radial = factory.make_radial_gradient(5.0, 5.0, 4.0, &colors, &[0.0, 1.0]);
        assert_eq!(radial.stops().len(), 2);
    }

    #[test]
    fn decode_image_absence_is_not_an_error() {
        let factory = factory_with(BackendKind::Software);
        assert!(factory.decode_image(b"garbage").is_none());
    }

    #[test]
    fn decode_font_absence_is_not_an_error() {
        let factory = factory_with(BackendKind::Software);
        assert!(factory.decode_font(b"garbage").is_none());
    }

    #[test]
    fn segment_count_tracks_quality() {
        use crate::render::settings::RenderQuality;

        let factory = factory_with(BackendKind::Software);
        assert_eq!(factory.segment_count(), 10);
        factory.settings().borrow_mut().quality = RenderQuality::High;
        assert_eq!(factory.segment_count(), 15);
        factory.settings().borrow_mut().quality = RenderQuality::Low;
        assert_eq!(factory.segment_count(), 5);
    }
}
