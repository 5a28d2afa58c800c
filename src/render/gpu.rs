//! GPU-accelerated node: draw commands become a `vello` scene rendered
//! through `wgpu` into an owned target texture, then read back.
//!
//! Device, queue and renderer are created lazily on the first non-empty
//! frame so constructing the node never touches the GPU.

use crate::foundation::core::{Affine, BezPath, Point, Rect, Size, Vec2};
use crate::foundation::error::{AnimaticError, AnimaticResult};
use crate::render::gradient::Gradient;
use crate::render::node::{FrameRgba, NodeGeometry, SceneRenderNode};
use crate::render::paint::RenderPaint;
use crate::render::path::RenderPath;
use crate::render::settings::{FillMode, artboard_placement};
use crate::runtime::artboard::{SharedArtboard, WeakArtboard, WeakHostItem};
use crate::runtime::commands::{BlendMode, DrawCommand, FillRule, PackedColor, StrokeCap, StrokeJoin};

struct GpuState {
    device: vello::wgpu::Device,
    queue: vello::wgpu::Queue,
    renderer: vello::Renderer,
    texture: vello::wgpu::Texture,
    view: vello::wgpu::TextureView,
    readback: vello::wgpu::Buffer,
    readback_bytes_per_row: u32,
    width: u32,
    height: u32,
}

/// Batches draw commands through the host's accelerated pipeline.
///
/// Consumes tessellated paths (pre-flattened by the factory at the current
/// segment count) and applies the configured fill mode as its viewport
/// mapping. The rendered texture is available for zero-copy compositing via
/// [`GpuRenderNode::texture_view`]; [`SceneRenderNode::frame`] reads the
/// same pixels back for hosts and tests that want bytes.
pub struct GpuRenderNode {
    geometry: NodeGeometry,
    fill_mode: FillMode,
    scene: vello::Scene,
    state: Option<GpuState>,
    frame: Option<FrameRgba>,
}

impl GpuRenderNode {
    pub fn new(artboard: WeakArtboard, item: WeakHostItem) -> Self {
        Self {
            geometry: NodeGeometry::new(artboard, item),
            fill_mode: FillMode::default(),
            scene: vello::Scene::new(),
            state: None,
            frame: None,
        }
    }

    /// Configure the viewport mapping; set by the factory at selection time
    /// from the current render settings.
    pub fn set_fill_mode(&mut self, fill_mode: FillMode) {
        self.fill_mode = fill_mode;
    }

    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    /// The rendered target texture view, once a frame has been rendered.
    pub fn texture_view(&self) -> Option<&vello::wgpu::TextureView> {
        self.state.as_ref().map(|s| &s.view)
    }

    fn viewport_transform(&self, artboard: &SharedArtboard) -> Affine {
        if self.fill_mode == FillMode::Stretch {
            return self.geometry.target_transform();
        }
        let rect = self.geometry.rect();
        let artboard = artboard.borrow();
        let size = Size::new(artboard.width(), artboard.height());
        if size.width <= 0.0 || size.height <= 0.0 {
            return self.geometry.target_transform();
        }
        let target = Rect::new(0.0, 0.0, rect.width(), rect.height());
        let placement = artboard_placement(target, size, self.fill_mode);
        Affine::translate(Vec2::new(placement.x0, placement.y0))
            * Affine::scale_non_uniform(
                placement.width() / size.width,
                placement.height() / size.height,
            )
    }

    fn ensure_state(&mut self, width: u32, height: u32) -> AnimaticResult<()> {
        if let Some(state) = &self.state {
            if state.width == width && state.height == height {
                return Ok(());
            }
        }

        let instance = vello::wgpu::Instance::new(&vello::wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(
            &vello::wgpu::RequestAdapterOptions {
                power_preference: vello::wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            },
        ))
        .map_err(|e| match e {
            vello::wgpu::RequestAdapterError::NotFound { .. } => {
                AnimaticError::render("no gpu adapter available")
            }
            other => AnimaticError::render(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) =
            pollster::block_on(adapter.request_device(&vello::wgpu::DeviceDescriptor {
                label: None,
                required_features: vello::wgpu::Features::empty(),
                required_limits: vello::wgpu::Limits::default(),
                experimental_features: vello::wgpu::ExperimentalFeatures::default(),
                memory_hints: vello::wgpu::MemoryHints::Performance,
                trace: vello::wgpu::Trace::Off,
            }))
            .map_err(|e| AnimaticError::render(format!("wgpu request_device failed: {e:?}")))?;

        let renderer = vello::Renderer::new(&device, vello::RendererOptions::default())
            .map_err(|e| AnimaticError::render(format!("vello renderer init failed: {e:?}")))?;

        let texture = device.create_texture(&vello::wgpu::TextureDescriptor {
            label: Some("animatic_target"),
            size: vello::wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: vello::wgpu::TextureDimension::D2,
            format: vello::wgpu::TextureFormat::Rgba8Unorm,
            usage: vello::wgpu::TextureUsages::STORAGE_BINDING
                | vello::wgpu::TextureUsages::TEXTURE_BINDING
                | vello::wgpu::TextureUsages::RENDER_ATTACHMENT
                | vello::wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&vello::wgpu::TextureViewDescriptor::default());

        let bytes_per_row_unpadded = width
            .checked_mul(4)
            .ok_or_else(|| AnimaticError::render("render target width overflow"))?;
        let bytes_per_row = align_to(
            bytes_per_row_unpadded,
            vello::wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
        );
        let buffer_size = (bytes_per_row as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| AnimaticError::render("readback buffer size overflow"))?;
        let readback = device.create_buffer(&vello::wgpu::BufferDescriptor {
            label: Some("animatic_readback"),
            size: buffer_size,
            usage: vello::wgpu::BufferUsages::MAP_READ | vello::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.state = Some(GpuState {
            device,
            queue,
            renderer,
            texture,
            view,
            readback,
            readback_bytes_per_row: bytes_per_row,
            width,
            height,
        });
        Ok(())
    }

    fn readback_frame(&self) -> AnimaticResult<FrameRgba> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| AnimaticError::render("gpu node not initialized"))?;

        let mut encoder =
            state
                .device
                .create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                    label: Some("animatic_readback_encoder"),
                });
        encoder.copy_texture_to_buffer(
            vello::wgpu::TexelCopyTextureInfo {
                texture: &state.texture,
                mip_level: 0,
                origin: vello::wgpu::Origin3d::ZERO,
                aspect: vello::wgpu::TextureAspect::All,
            },
            vello::wgpu::TexelCopyBufferInfo {
                buffer: &state.readback,
                layout: vello::wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(state.readback_bytes_per_row),
                    rows_per_image: Some(state.height),
                },
            },
            vello::wgpu::Extent3d {
                width: state.width,
                height: state.height,
                depth_or_array_layers: 1,
            },
        );
        state.queue.submit(Some(encoder.finish()));

        let buffer_slice = state.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(vello::wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        state
            .device
            .poll(vello::wgpu::PollType::wait_indefinitely())
            .map_err(|e| AnimaticError::render(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| AnimaticError::render("readback channel closed"))?
            .map_err(|e| AnimaticError::render(format!("readback map failed: {e:?}")))?;

        let mapped = buffer_slice.get_mapped_range();
        let row_bytes = (state.width as usize) * 4;
        let padded_row_bytes = state.readback_bytes_per_row as usize;
        let mut out = Vec::with_capacity(row_bytes * state.height as usize);
        for row in 0..state.height as usize {
            let start = row * padded_row_bytes;
            out.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        state.readback.unmap();

        Ok(FrameRgba {
            width: state.width,
            height: state.height,
            data: out,
            premultiplied: true,
        })
    }
}

impl SceneRenderNode for GpuRenderNode {
    fn geometry(&self) -> &NodeGeometry {
        &self.geometry
    }

    fn geometry_mut(&mut self) -> &mut NodeGeometry {
        &mut self.geometry
    }

    fn backend_kind(&self) -> crate::render::settings::BackendKind {
        crate::render::settings::BackendKind::Gpu
    }

    #[tracing::instrument(skip_all)]
    fn render(&mut self) -> AnimaticResult<()> {
        let Some((width, height)) = self.geometry.frame_size() else {
            return Ok(());
        };
        let (width, height) = (u32::from(width), u32::from(height));
        let Some(artboard) = self.geometry.artboard() else {
            return Ok(());
        };
        let commands = artboard.borrow_mut().draw();
        let viewport = self.viewport_transform(&artboard);

        self.ensure_state(width, height)?;
        self.scene.reset();
        encode_commands(&mut self.scene, &commands, viewport, width, height);

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| AnimaticError::render("gpu node not initialized"))?;
        state
            .renderer
            .render_to_texture(
                &state.device,
                &state.queue,
                &self.scene,
                &state.view,
                &vello::RenderParams {
                    base_color: vello::peniko::Color::from_rgba8(0, 0, 0, 0),
                    width,
                    height,
                    antialiasing_method: vello::AaConfig::Area,
                },
            )
            .map_err(|e| AnimaticError::render(format!("vello render failed: {e:?}")))?;

        self.frame = Some(self.readback_frame()?);
        Ok(())
    }

    fn frame(&self) -> Option<&FrameRgba> {
        self.frame.as_ref()
    }
}

fn encode_commands(
    scene: &mut vello::Scene,
    commands: &[DrawCommand],
    base: Affine,
    width: u32,
    height: u32,
) {
    use vello::peniko::{BlendMode as VelloBlend, Fill};

    for command in commands {
        match command {
            DrawCommand::Fill {
                path,
                paint,
                transform,
            } => {
                let blended = paint.blend_mode != BlendMode::SrcOver;
                if blended {
                    scene.push_layer(
                        Fill::NonZero,
                        blend_to_vello(paint.blend_mode),
                        1.0,
                        Affine::IDENTITY,
                        &clip_rect(width, height),
                    );
                }
                scene.fill(
                    fill_rule_to_vello(path.fill_rule()),
                    base * *transform,
                    &brush_for(paint),
                    None,
                    path_shape(path),
                );
                if blended {
                    scene.pop_layer();
                }
            }
            DrawCommand::Stroke {
                path,
                paint,
                transform,
            } => {
                let blended = paint.blend_mode != BlendMode::SrcOver;
                if blended {
                    scene.push_layer(
                        Fill::NonZero,
                        blend_to_vello(paint.blend_mode),
                        1.0,
                        Affine::IDENTITY,
                        &clip_rect(width, height),
                    );
                }
                scene.stroke(
                    &stroke_for(paint),
                    base * *transform,
                    &brush_for(paint),
                    None,
                    path_shape(path),
                );
                if blended {
                    scene.pop_layer();
                }
            }
            DrawCommand::PushClip { path, transform } => {
                scene.push_layer(
                    fill_rule_to_vello(path.fill_rule()),
                    VelloBlend::default(),
                    1.0,
                    base * *transform,
                    path_shape(path),
                );
            }
            DrawCommand::PopClip => {
                scene.pop_layer();
            }
            DrawCommand::Image {
                image,
                transform,
                opacity,
            } => {
                if *opacity < 1.0 {
                    scene.push_layer(
                        Fill::NonZero,
                        VelloBlend::default(),
                        *opacity,
                        Affine::IDENTITY,
                        &clip_rect(width, height),
                    );
                }
                scene.draw_image(&image.gpu_image(), base * *transform);
                if *opacity < 1.0 {
                    scene.pop_layer();
                }
            }
            DrawCommand::ImageMesh {
                image,
                vertices,
                uvs,
                indices,
                transform,
                opacity,
            } => {
                let (Some(vertices), Some(uvs), Some(indices)) =
                    (vertices.as_f32(), uvs.as_f32(), indices.as_u16())
                else {
                    tracing::debug!("image mesh skipped: unexpected buffer variants");
                    continue;
                };
                let img = image.gpu_image();
                if *opacity < 1.0 {
                    scene.push_layer(
                        Fill::NonZero,
                        VelloBlend::default(),
                        *opacity,
                        Affine::IDENTITY,
                        &clip_rect(width, height),
                    );
                }
                let object = base * *transform;
                for tri in indices.chunks_exact(3) {
                    let Some((positions, texels)) =
                        crate::render::painter::mesh_triangle(
                            vertices,
                            uvs,
                            tri,
                            image.width,
                            image.height,
                        )
                    else {
                        continue;
                    };
                    let Some(uv_affine) =
                        crate::render::painter::triangle_uv_affine(texels, positions)
                    else {
                        continue;
                    };
                    scene.push_layer(
                        Fill::NonZero,
                        VelloBlend::default(),
                        1.0,
                        object,
                        &triangle_path(positions),
                    );
                    scene.draw_image(&img, object * uv_affine);
                    scene.pop_layer();
                }
                if *opacity < 1.0 {
                    scene.pop_layer();
                }
            }
        }
    }
}

fn triangle_path(p: [Point; 3]) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(p[0]);
    path.line_to(p[1]);
    path.line_to(p[2]);
    path.close_path();
    path
}

fn path_shape(path: &RenderPath) -> &BezPath {
    match path {
        RenderPath::Painter(p) => &p.path,
        RenderPath::Tessellated(p) => p.flattened(),
    }
}

fn clip_rect(width: u32, height: u32) -> kurbo::Rect {
    kurbo::Rect::new(0.0, 0.0, f64::from(width), f64::from(height))
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

fn brush_for(paint: &RenderPaint) -> vello::peniko::Brush {
    match &paint.gradient {
        Some(gradient) => vello::peniko::Brush::Gradient(gradient_to_vello(gradient)),
        None => vello::peniko::Brush::Solid(color_to_vello(paint.color)),
    }
}

fn color_to_vello(c: PackedColor) -> vello::peniko::Color {
    vello::peniko::Color::from_rgba8(c.red(), c.green(), c.blue(), c.alpha())
}

fn fill_rule_to_vello(rule: FillRule) -> vello::peniko::Fill {
    match rule {
        FillRule::NonZero => vello::peniko::Fill::NonZero,
        FillRule::EvenOdd => vello::peniko::Fill::EvenOdd,
    }
}

fn stroke_for(paint: &RenderPaint) -> kurbo::Stroke {
    use kurbo::{Cap, Join, Stroke};

    let cap = match paint.cap {
        StrokeCap::Butt => Cap::Butt,
        StrokeCap::Round => Cap::Round,
        StrokeCap::Square => Cap::Square,
    };
    let join = match paint.join {
        StrokeJoin::Miter => Join::Miter,
        StrokeJoin::Round => Join::Round,
        StrokeJoin::Bevel => Join::Bevel,
    };
    Stroke::new(paint.thickness).with_caps(cap).with_joins(join)
}

fn gradient_to_vello(gradient: &Gradient) -> vello::peniko::Gradient {
    use vello::peniko;

    let stops: Vec<peniko::ColorStop> = gradient
        .stops()
        .iter()
        .map(|stop| peniko::ColorStop {
            offset: stop.offset,
            color: color_to_vello(stop.color).into(),
        })
        .collect();

    match gradient {
        Gradient::Linear { start, end, .. } => {
            peniko::Gradient::new_linear(*start, *end).with_stops(&*stops)
        }
        Gradient::Radial { center, radius, .. } => {
            peniko::Gradient::new_radial(*center, *radius as f32).with_stops(&*stops)
        }
    }
}

fn blend_to_vello(mode: BlendMode) -> vello::peniko::BlendMode {
    use vello::peniko::Mix;

    let mix = match mode {
        BlendMode::SrcOver => Mix::Normal,
        BlendMode::Screen => Mix::Screen,
        BlendMode::Overlay => Mix::Overlay,
        BlendMode::Darken => Mix::Darken,
        BlendMode::Lighten => Mix::Lighten,
        BlendMode::ColorDodge => Mix::ColorDodge,
        BlendMode::ColorBurn => Mix::ColorBurn,
        BlendMode::HardLight => Mix::HardLight,
        BlendMode::SoftLight => Mix::SoftLight,
        BlendMode::Difference => Mix::Difference,
        BlendMode::Exclusion => Mix::Exclusion,
        BlendMode::Multiply => Mix::Multiply,
        BlendMode::Hue => Mix::Hue,
        BlendMode::Saturation => Mix::Saturation,
        BlendMode::Color => Mix::Color,
        BlendMode::Luminosity => Mix::Luminosity,
    };
    mix.into()
}
