//! Geometry currency shared across the engine boundary and the render core.
//!
//! All coordinates are `f64` in kurbo's conventions: artboard space is the
//! animation engine's logical coordinate system, item space is the host
//! item's local coordinate system. Render nodes own the mapping between the
//! two (see [`crate::render::node::NodeGeometry`]).

pub use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};
