//! Immediate 2D replay of engine draw commands through `vello_cpu`.
//!
//! The replayer here is shared by the painter node (host-owned canvas) and
//! the software node (owned offscreen pixmap); only target ownership
//! differs between the two.

use kurbo::PathEl;

use crate::foundation::core::{Affine, BezPath, Point};
use crate::foundation::error::AnimaticResult;
use crate::render::gradient::Gradient;
use crate::render::image::RenderImage;
use crate::render::node::{FrameRgba, NodeGeometry, SceneRenderNode};
use crate::render::paint::RenderPaint;
use crate::render::path::RenderPath;
use crate::runtime::artboard::{WeakArtboard, WeakHostItem};
use crate::runtime::commands::{BlendMode, DrawCommand, FillRule, PackedColor, StrokeCap, StrokeJoin};

/// Replays draw commands onto an immediate 2D canvas each frame.
///
/// Selected for hosts on the legacy direct-GL path, where the scene graph
/// hands out a 2D paint surface per frame. No intermediate geometry is
/// retained between frames; each frame is a full replay.
pub struct PainterRenderNode {
    geometry: NodeGeometry,
    frame: Option<FrameRgba>,
}

impl PainterRenderNode {
    pub fn new(artboard: WeakArtboard, item: WeakHostItem) -> Self {
        Self {
            geometry: NodeGeometry::new(artboard, item),
            frame: None,
        }
    }

    /// Replay the artboard's current commands onto a host-owned canvas.
    ///
    /// A dead artboard handle replays nothing and succeeds.
    pub fn paint_onto(&mut self, ctx: &mut vello_cpu::RenderContext) -> AnimaticResult<()> {
        let Some(artboard) = self.geometry.artboard() else {
            return Ok(());
        };
        let commands = artboard.borrow_mut().draw();
        replay(ctx, &commands, self.geometry.artboard_transform())
    }
}

impl SceneRenderNode for PainterRenderNode {
    fn geometry(&self) -> &NodeGeometry {
        &self.geometry
    }

    fn geometry_mut(&mut self) -> &mut NodeGeometry {
        &mut self.geometry
    }

    fn backend_kind(&self) -> crate::render::settings::BackendKind {
        crate::render::settings::BackendKind::Painter
    }

    fn render(&mut self) -> AnimaticResult<()> {
        let Some((width, height)) = self.geometry.frame_size() else {
            return Ok(());
        };
        let Some(artboard) = self.geometry.artboard() else {
            return Ok(());
        };
        let commands = artboard.borrow_mut().draw();

        // Immediate semantics: a transient canvas per frame.
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        replay(&mut ctx, &commands, self.geometry.target_transform())?;
        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);

        self.frame = Some(FrameRgba {
            width: u32::from(width),
            height: u32::from(height),
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        });
        Ok(())
    }

    fn frame(&self) -> Option<&FrameRgba> {
        self.frame.as_ref()
    }
}

/// Replay `commands` with `base` (the artboard-to-item affine) applied
/// under every command transform.
pub(crate) fn replay(
    ctx: &mut vello_cpu::RenderContext,
    commands: &[DrawCommand],
    base: Affine,
) -> AnimaticResult<()> {
    for command in commands {
        match command {
            DrawCommand::Fill {
                path,
                paint,
                transform,
            } => {
                ctx.set_transform(affine_to_cpu(base * *transform));
                ctx.set_fill_rule(fill_rule_to_cpu(path.fill_rule()));
                ctx.set_blend_mode(blend_to_cpu(paint.blend_mode));
                set_brush(ctx, paint);
                ctx.fill_path(&path_to_cpu(path));
            }
            DrawCommand::Stroke {
                path,
                paint,
                transform,
            } => {
                ctx.set_transform(affine_to_cpu(base * *transform));
                ctx.set_blend_mode(blend_to_cpu(paint.blend_mode));
                ctx.set_stroke(stroke_to_cpu(paint));
                set_brush(ctx, paint);
                ctx.stroke_path(&path_to_cpu(path));
            }
            DrawCommand::PushClip { path, transform } => {
                ctx.set_transform(affine_to_cpu(base * *transform));
                ctx.set_fill_rule(fill_rule_to_cpu(path.fill_rule()));
                ctx.push_clip_layer(&path_to_cpu(path));
            }
            DrawCommand::PopClip => {
                ctx.pop_layer();
            }
            DrawCommand::Image {
                image,
                transform,
                opacity,
            } => {
                let paint = cpu_image_paint(image)?;
                ctx.set_transform(affine_to_cpu(base * *transform));
                ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
                ctx.set_paint(paint);
                if *opacity < 1.0 {
                    ctx.push_opacity_layer(*opacity);
                }
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(image.width),
                    f64::from(image.height),
                ));
                if *opacity < 1.0 {
                    ctx.pop_layer();
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
                let paint = cpu_image_paint(image)?;
                ctx.set_transform(affine_to_cpu(base * *transform));
                ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
                if *opacity < 1.0 {
                    ctx.push_opacity_layer(*opacity);
                }
                for tri in indices.chunks_exact(3) {
                    let Some((positions, texels)) =
                        mesh_triangle(vertices, uvs, tri, image.width, image.height)
                    else {
                        continue;
                    };
                    let Some(uv_affine) = triangle_uv_affine(texels, positions) else {
                        continue;
                    };
                    ctx.set_paint(paint.clone());
                    ctx.set_paint_transform(affine_to_cpu(uv_affine));
                    ctx.fill_path(&bezpath_to_cpu(&triangle_path(positions)));
                }
                ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                if *opacity < 1.0 {
                    ctx.pop_layer();
                }
            }
        }
    }
    Ok(())
}

fn set_brush(ctx: &mut vello_cpu::RenderContext, paint: &RenderPaint) {
    match &paint.gradient {
        Some(gradient) => ctx.set_paint(gradient_to_cpu(gradient)),
        None => ctx.set_paint(color_to_cpu(paint.color)),
    }
}

/// Fetch one mesh triangle's artboard-space corners and pixel-space UVs.
pub(crate) fn mesh_triangle(
    vertices: &[f32],
    uvs: &[f32],
    tri: &[u16],
    image_w: u32,
    image_h: u32,
) -> Option<([Point; 3], [Point; 3])> {
    let mut positions = [Point::ZERO; 3];
    let mut texels = [Point::ZERO; 3];
    for (slot, &index) in tri.iter().enumerate() {
        let i = usize::from(index) * 2;
        let (Some(&vx), Some(&vy)) = (vertices.get(i), vertices.get(i + 1)) else {
            return None;
        };
        let (Some(&u), Some(&v)) = (uvs.get(i), uvs.get(i + 1)) else {
            return None;
        };
        positions[slot] = Point::new(f64::from(vx), f64::from(vy));
        texels[slot] = Point::new(
            f64::from(u) * f64::from(image_w),
            f64::from(v) * f64::from(image_h),
        );
    }
    Some((positions, texels))
}

fn triangle_path(p: [Point; 3]) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(p[0]);
    path.line_to(p[1]);
    path.line_to(p[2]);
    path.close_path();
    path
}

/// The affine mapping image pixel space onto one triangle's artboard
/// coordinates; `None` for degenerate UV triangles.
pub(crate) fn triangle_uv_affine(uv: [Point; 3], pos: [Point; 3]) -> Option<Affine> {
    let du1 = uv[1] - uv[0];
    let du2 = uv[2] - uv[0];
    let dp1 = pos[1] - pos[0];
    let dp2 = pos[2] - pos[0];

    let det = du1.x * du2.y - du1.y * du2.x;
    if det.abs() < 1e-12 {
        return None;
    }
    let inv = 1.0 / det;

    let a11 = (dp1.x * du2.y - dp2.x * du1.y) * inv;
    let a12 = (dp2.x * du1.x - dp1.x * du2.x) * inv;
    let a21 = (dp1.y * du2.y - dp2.y * du1.y) * inv;
    let a22 = (dp2.y * du1.x - dp1.y * du2.x) * inv;
    let e = pos[0].x - (a11 * uv[0].x + a12 * uv[0].y);
    let f = pos[0].y - (a21 * uv[0].x + a22 * uv[0].y);

    Some(Affine::new([a11, a21, a12, a22, e, f]))
}

fn cpu_image_paint(image: &RenderImage) -> AnimaticResult<vello_cpu::Image> {
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(image.cpu_pixmap()?),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn path_to_cpu(path: &RenderPath) -> vello_cpu::kurbo::BezPath {
    match path {
        RenderPath::Painter(p) => bezpath_to_cpu(&p.path),
        RenderPath::Tessellated(p) => bezpath_to_cpu(p.flattened()),
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn color_to_cpu(c: PackedColor) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.red(), c.green(), c.blue(), c.alpha())
}

fn fill_rule_to_cpu(rule: FillRule) -> vello_cpu::peniko::Fill {
    match rule {
        FillRule::NonZero => vello_cpu::peniko::Fill::NonZero,
        FillRule::EvenOdd => vello_cpu::peniko::Fill::EvenOdd,
    }
}

fn blend_to_cpu(mode: BlendMode) -> vello_cpu::peniko::BlendMode {
    use vello_cpu::peniko::Mix;

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

fn stroke_to_cpu(paint: &RenderPaint) -> vello_cpu::kurbo::Stroke {
    use vello_cpu::kurbo::{Cap, Join, Stroke};

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
    Stroke::new(paint.thickness).with_caps(cap).with_join(join)
}

fn gradient_to_cpu(gradient: &Gradient) -> vello_cpu::peniko::Gradient {
    use vello_cpu::peniko;

    let stops: Vec<peniko::ColorStop> = gradient
        .stops()
        .iter()
        .map(|stop| peniko::ColorStop {
            offset: stop.offset,
            color: color_to_cpu(stop.color).into(),
        })
        .collect();

    match gradient {
        Gradient::Linear { start, end, .. } => peniko::Gradient::new_linear(
            vello_cpu::kurbo::Point::new(start.x, start.y),
            vello_cpu::kurbo::Point::new(end.x, end.y),
        )
        .with_stops(&*stops),
        Gradient::Radial { center, radius, .. } => peniko::Gradient::new_radial(
            vello_cpu::kurbo::Point::new(center.x, center.y),
            *radius as f32,
        )
        .with_stops(&*stops),
    }
}
