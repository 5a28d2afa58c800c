use crate::foundation::error::AnimaticResult;
use crate::render::node::{FrameRgba, NodeGeometry, SceneRenderNode};
use crate::render::painter::replay;
use crate::runtime::artboard::{WeakArtboard, WeakHostItem};

/// Rasterizes the artboard into an owned offscreen pixel buffer.
///
/// The fallback node for software-rendered and unrecognized window APIs.
/// The buffer is sized to the draw-target rect and reused across frames;
/// the windowing layer composites [`SceneRenderNode::frame`] into the host
/// frame after each render.
pub struct SoftwareRenderNode {
    geometry: NodeGeometry,
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
    frame: Option<FrameRgba>,
}

impl SoftwareRenderNode {
    pub fn new(artboard: WeakArtboard, item: WeakHostItem) -> Self {
        Self {
            geometry: NodeGeometry::new(artboard, item),
            ctx: None,
            pixmap: None,
            frame: None,
        }
    }

    /// Reuse the raster context across frames, recreating it only when the
    /// draw-target size changed.
    fn take_ctx(&mut self, width: u16, height: u16) -> vello_cpu::RenderContext {
        match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        }
    }

    fn take_pixmap(&mut self, width: u16, height: u16) -> vello_cpu::Pixmap {
        match self.pixmap.take() {
            Some(pm) if pm.width() == width && pm.height() == height => pm,
            _ => vello_cpu::Pixmap::new(width, height),
        }
    }
}

impl SceneRenderNode for SoftwareRenderNode {
    fn geometry(&self) -> &NodeGeometry {
        &self.geometry
    }

    fn geometry_mut(&mut self) -> &mut NodeGeometry {
        &mut self.geometry
    }

    fn backend_kind(&self) -> crate::render::settings::BackendKind {
        crate::render::settings::BackendKind::Software
    }

    #[tracing::instrument(skip_all)]
    fn render(&mut self) -> AnimaticResult<()> {
        let Some((width, height)) = self.geometry.frame_size() else {
            return Ok(());
        };
        let Some(artboard) = self.geometry.artboard() else {
            return Ok(());
        };
        let commands = artboard.borrow_mut().draw();

        let mut ctx = self.take_ctx(width, height);
        let mut pixmap = self.take_pixmap(width, height);
        ctx.reset();
        replay(&mut ctx, &commands, self.geometry.target_transform())?;
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        self.frame = Some(FrameRgba {
            width: u32::from(width),
            height: u32::from(height),
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        });
        self.ctx = Some(ctx);
        self.pixmap = Some(pixmap);
        Ok(())
    }

    fn frame(&self) -> Option<&FrameRgba> {
        self.frame.as_ref()
    }
}
