use kurbo::{CubicBez, ParamCurve, PathEl, QuadBez};

use crate::foundation::core::{BezPath, Point};
use crate::runtime::commands::FillRule;

/// Path realization for the immediate-2D backend family.
///
/// Wraps the engine's raw geometry untouched; the rasterizer enforces the
/// fill rule at draw time.
#[derive(Clone, Debug)]
pub struct PainterPath {
    pub path: BezPath,
    pub fill_rule: FillRule,
}

impl PainterPath {
    pub fn new(path: BezPath, fill_rule: FillRule) -> Self {
        Self { path, fill_rule }
    }

    /// Zero-geometry placeholder path.
    pub fn empty() -> Self {
        Self {
            path: BezPath::new(),
            fill_rule: FillRule::default(),
        }
    }
}

/// Path realization for the GPU backend family.
///
/// Curves are flattened into `segments_per_curve` line segments at
/// construction so the result can be consumed as GPU geometry; raising the
/// render quality raises the segment count and the curve smoothness.
#[derive(Clone, Debug)]
pub struct TessellatedPath {
    flattened: BezPath,
    fill_rule: FillRule,
    segments_per_curve: u32,
}

impl TessellatedPath {
    pub fn new(source: &BezPath, fill_rule: FillRule, segments_per_curve: u32) -> Self {
        let n = segments_per_curve.max(1);
        Self {
            flattened: flatten(source, n),
            fill_rule,
            segments_per_curve: n,
        }
    }

    /// Zero-geometry placeholder path.
    pub fn empty(segments_per_curve: u32) -> Self {
        Self {
            flattened: BezPath::new(),
            fill_rule: FillRule::default(),
            segments_per_curve: segments_per_curve.max(1),
        }
    }

    /// The flattened geometry: moves, lines and closes only.
    pub fn flattened(&self) -> &BezPath {
        &self.flattened
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn segments_per_curve(&self) -> u32 {
        self.segments_per_curve
    }
}

/// A path as handed to a render node, realized for exactly one backend
/// family by the factory. Exclusively owned; rebuilt per draw.
#[derive(Clone, Debug)]
pub enum RenderPath {
    Painter(PainterPath),
    Tessellated(TessellatedPath),
}

impl RenderPath {
    pub fn fill_rule(&self) -> FillRule {
        match self {
            Self::Painter(p) => p.fill_rule,
            Self::Tessellated(p) => p.fill_rule,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Painter(p) => p.path.elements().is_empty(),
            Self::Tessellated(p) => p.flattened.elements().is_empty(),
        }
    }
}

/// Replace every quad/cubic with `n` chords sampled at uniform parameters.
fn flatten(source: &BezPath, n: u32) -> BezPath {
    let mut out = BezPath::new();
    let mut cur = Point::ZERO;
    let mut start = Point::ZERO;
    for &el in source.elements() {
        match el {
            PathEl::MoveTo(p) => {
                out.move_to(p);
                cur = p;
                start = p;
            }
            PathEl::LineTo(p) => {
                out.line_to(p);
                cur = p;
            }
            PathEl::QuadTo(p1, p2) => {
                let q = QuadBez::new(cur, p1, p2);
                for i in 1..=n {
                    out.line_to(q.eval(f64::from(i) / f64::from(n)));
                }
                cur = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                let c = CubicBez::new(cur, p1, p2, p3);
                for i in 1..=n {
                    out.line_to(c.eval(f64::from(i) / f64::from(n)));
                }
                cur = p3;
            }
            PathEl::ClosePath => {
                out.close_path();
                cur = start;
            }
        }
    }
    out
}
