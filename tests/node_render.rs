use std::cell::RefCell;
use std::io::Cursor;
use std::rc::{Rc, Weak};

use animatic::{
    Affine, Artboard, BezPath, DrawCommand, FillRule, FrameRgba, GraphicsApi, HostItem,
    PackedColor, PaintStyle, Point, Rect, RenderFactory, RenderSettings, SceneRenderNode,
    SharedArtboard,
};

/// An artboard whose frame is a fixed command script built through the
/// factory, like the engine would.
struct ScriptArtboard {
    width: f64,
    height: f64,
    script: Box<dyn FnMut(&RenderFactory) -> Vec<DrawCommand>>,
    factory: Rc<RenderFactory>,
}

impl Artboard for ScriptArtboard {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn draw(&mut self) -> Vec<DrawCommand> {
        (self.script)(&self.factory)
    }
}

struct NoItem;

impl HostItem for NoItem {
    fn bounding_rect(&self) -> Rect {
        Rect::ZERO
    }
}

fn factory() -> Rc<RenderFactory> {
    Rc::new(RenderFactory::new(Rc::new(RefCell::new(
        RenderSettings::default(),
    ))))
}

fn artboard_with(
    factory: &Rc<RenderFactory>,
    script: impl FnMut(&RenderFactory) -> Vec<DrawCommand> + 'static,
) -> SharedArtboard {
    Rc::new(RefCell::new(ScriptArtboard {
        width: 100.0,
        height: 100.0,
        script: Box::new(script),
        factory: factory.clone(),
    }))
}

fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    let mut p = BezPath::new();
    p.move_to((x0, y0));
    p.line_to((x1, y0));
    p.line_to((x1, y1));
    p.line_to((x0, y1));
    p.close_path();
    p
}

fn px(frame: &FrameRgba, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    frame.data[i..i + 4].try_into().unwrap()
}

const RED: PackedColor = PackedColor::from_argb(255, 255, 0, 0);

fn fill_command(factory: &RenderFactory, path: BezPath, color: PackedColor) -> DrawCommand {
    let mut paint = factory.make_render_paint();
    paint.color = color;
    DrawCommand::Fill {
        path: factory.make_render_path(path, FillRule::NonZero),
        paint,
        transform: Affine::IDENTITY,
    }
}

fn rendered_node(
    factory: &Rc<RenderFactory>,
    artboard: &SharedArtboard,
) -> Box<dyn animatic::SceneRenderNode> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut node = factory.render_node(
        GraphicsApi::Software,
        Rc::downgrade(artboard),
        Weak::<NoItem>::new(),
    );
    node.set_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
    node.set_artboard_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
    node.render().unwrap();
    node
}

#[test]
fn software_node_rasterizes_a_fill() {
    let factory = factory();
    let artboard = artboard_with(&factory, |f| {
        vec![fill_command(f, rect_path(0.0, 0.0, 50.0, 100.0), RED)]
    });
    let node = rendered_node(&factory, &artboard);

    let frame = node.frame().expect("frame produced");
    assert_eq!(frame.width, 100);
    assert_eq!(frame.height, 100);
    assert!(frame.premultiplied);
    assert_eq!(px(frame, 10, 50), [255, 0, 0, 255]);
    assert_eq!(px(frame, 90, 50)[3], 0);
}

#[test]
fn empty_rect_is_a_noop_frame() {
    let factory = factory();
    let artboard = artboard_with(&factory, |f| {
        vec![fill_command(f, rect_path(0.0, 0.0, 100.0, 100.0), RED)]
    });
    let mut node = factory.render_node(
        GraphicsApi::Software,
        Rc::downgrade(&artboard),
        Weak::<NoItem>::new(),
    );

    // No rect set at all.
    node.render().unwrap();
    assert!(node.frame().is_none());

    // Zero-size rect.
    node.set_rect(Rect::new(0.0, 0.0, 0.0, 100.0));
    node.render().unwrap();
    assert!(node.frame().is_none());
}

#[test]
fn dead_artboard_is_a_noop_frame_keeping_the_last_one() {
    let factory = factory();
    let artboard = artboard_with(&factory, |f| {
        vec![fill_command(f, rect_path(0.0, 0.0, 100.0, 100.0), RED)]
    });
    let mut node = rendered_node(&factory, &artboard);
    let before = node.frame().unwrap().data.clone();

    drop(artboard);
    node.render().unwrap();
    assert_eq!(node.frame().unwrap().data, before);
}

#[test]
fn artboard_rect_drives_scale_and_survives_teardown() {
    let factory = factory();
    let artboard = artboard_with(&factory, |_| Vec::new());
    let mut node = factory.render_node(
        GraphicsApi::Software,
        Rc::downgrade(&artboard),
        Weak::<NoItem>::new(),
    );

    node.set_artboard_rect(Rect::new(0.0, 0.0, 200.0, 100.0));
    assert_eq!(node.scale_factor_x(), 2.0);
    assert_eq!(node.scale_factor_y(), 1.0);
    assert_eq!(node.top_left(), Point::ZERO);
    assert_eq!(node.map_to_artboard(Point::new(100.0, 40.0)), Point::new(50.0, 40.0));

    drop(artboard);
    node.set_artboard_rect(Rect::new(5.0, 5.0, 105.0, 55.0));
    assert_eq!(node.scale_factor_x(), 2.0);
    assert_eq!(node.scale_factor_y(), 1.0);
    assert_eq!(node.top_left(), Point::new(5.0, 5.0));
}

#[test]
fn clip_commands_bound_the_fill() {
    let factory = factory();
    let artboard = artboard_with(&factory, |f| {
        vec![
            DrawCommand::PushClip {
                path: f.make_render_path(rect_path(0.0, 0.0, 50.0, 100.0), FillRule::NonZero),
                transform: Affine::IDENTITY,
            },
            fill_command(f, rect_path(0.0, 0.0, 100.0, 100.0), RED),
            DrawCommand::PopClip,
        ]
    });
    let node = rendered_node(&factory, &artboard);

    let frame = node.frame().unwrap();
    assert_eq!(px(frame, 25, 50), [255, 0, 0, 255]);
    assert_eq!(px(frame, 75, 50)[3], 0);
}

#[test]
fn stroke_commands_outline_instead_of_filling() {
    let factory = factory();
    let artboard = artboard_with(&factory, |f| {
        let mut line = BezPath::new();
        line.move_to((0.0, 50.0));
        line.line_to((100.0, 50.0));

        let mut paint = f.make_render_paint();
        paint.style = PaintStyle::Stroke;
        paint.color = RED;
        paint.thickness = 10.0;
        vec![DrawCommand::Stroke {
            path: f.make_render_path(line, FillRule::NonZero),
            paint,
            transform: Affine::IDENTITY,
        }]
    });
    let node = rendered_node(&factory, &artboard);

    let frame = node.frame().unwrap();
    assert_eq!(px(frame, 50, 50), [255, 0, 0, 255]);
    assert_eq!(px(frame, 50, 30)[3], 0);
}

#[test]
fn gradient_fills_ramp_across_the_path() {
    let factory = factory();
    let artboard = artboard_with(&factory, |f| {
        let gradient = f.make_linear_gradient(
            0.0,
            0.0,
            100.0,
            0.0,
            &[PackedColor::from_argb(255, 0, 0, 0), PackedColor::from_argb(255, 255, 255, 255)],
            &[0.0, 1.0],
        );
        let mut paint = f.make_render_paint();
        paint.gradient = Some(gradient);
        vec![DrawCommand::Fill {
            path: f.make_render_path(rect_path(0.0, 0.0, 100.0, 100.0), FillRule::NonZero),
            paint,
            transform: Affine::IDENTITY,
        }]
    });
    let node = rendered_node(&factory, &artboard);

    let frame = node.frame().unwrap();
    let left = px(frame, 5, 50);
    let right = px(frame, 95, 50);
    assert_eq!(left[3], 255);
    assert_eq!(right[3], 255);
    assert!(left[0] < right[0], "ramp should brighten left to right");
}

#[test]
fn image_commands_blit_decoded_pixels() {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let factory = factory();
    let decoded = Rc::new(factory.decode_image(&png).unwrap());
    let artboard = artboard_with(&factory, move |_| {
        vec![DrawCommand::Image {
            image: decoded.clone(),
            transform: Affine::translate((10.0, 10.0)),
            opacity: 1.0,
        }]
    });
    let node = rendered_node(&factory, &artboard);

    let frame = node.frame().unwrap();
    assert_eq!(px(frame, 12, 12), [0, 0, 255, 255]);
    assert_eq!(px(frame, 30, 30)[3], 0);
}

#[test]
fn image_mesh_consumes_shared_buffers() {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 255]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let factory = factory();
    let decoded = Rc::new(factory.decode_image(&png).unwrap());
    let vertices = factory.make_buffer_f32(&[10.0, 10.0, 40.0, 10.0, 40.0, 40.0, 10.0, 40.0]);
    let uvs = factory.make_buffer_f32(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
    let indices = factory.make_buffer_u16(&[0, 1, 2, 0, 2, 3]);
    let artboard = artboard_with(&factory, move |_| {
        vec![DrawCommand::ImageMesh {
            image: decoded.clone(),
            vertices: vertices.clone(),
            uvs: uvs.clone(),
            indices: indices.clone(),
            transform: Affine::IDENTITY,
            opacity: 1.0,
        }]
    });
    let node = rendered_node(&factory, &artboard);

    let frame = node.frame().unwrap();
    // Interior of each triangle; the shared diagonal is left to AA.
    assert_eq!(px(frame, 30, 20), [255, 255, 255, 255]);
    assert_eq!(px(frame, 20, 30), [255, 255, 255, 255]);
    assert_eq!(px(frame, 5, 5)[3], 0);
}

#[test]
fn painter_node_replays_onto_a_host_canvas() {
    let factory = factory();
    let artboard = artboard_with(&factory, |f| {
        vec![fill_command(f, rect_path(0.0, 0.0, 100.0, 100.0), RED)]
    });
    let mut node = animatic::PainterRenderNode::new(Rc::downgrade(&artboard), Weak::<NoItem>::new());
    node.set_artboard_rect(Rect::new(0.0, 0.0, 64.0, 64.0));

    let mut ctx = animatic::vello_cpu::RenderContext::new(64, 64);
    node.paint_onto(&mut ctx).unwrap();
    ctx.flush();
    let mut pixmap = animatic::vello_cpu::Pixmap::new(64, 64);
    ctx.render_to_pixmap(&mut pixmap);

    let bytes = pixmap.data_as_u8_slice();
    let center = ((32 * 64 + 32) * 4) as usize;
    assert_eq!(&bytes[center..center + 4], &[255, 0, 0, 255]);
}
