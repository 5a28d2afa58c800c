use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::foundation::core::Rect;
use crate::runtime::commands::DrawCommand;

/// A live artboard instance inside the animation engine.
///
/// The engine owns the instance and advances its timelines/state machines;
/// the render core only asks for its intrinsic size and the draw commands of
/// the current frame. Render nodes hold this through [`WeakArtboard`] and
/// must tolerate the instance disappearing between frames (file unload).
pub trait Artboard {
    /// Intrinsic width of the artboard in engine units.
    fn width(&self) -> f64;

    /// Intrinsic height of the artboard in engine units.
    fn height(&self) -> f64;

    /// Emit the draw commands for the current frame, in paint order.
    ///
    /// Transforms inside the commands are in artboard space; the consuming
    /// node applies the artboard-to-item mapping on top.
    fn draw(&mut self) -> Vec<DrawCommand>;
}

/// Owning handle to an artboard instance, held by the host item.
pub type SharedArtboard = Rc<RefCell<dyn Artboard>>;

/// Non-owning observation handle held by render nodes.
///
/// Nodes never extend the instance's lifetime; every use site upgrades and
/// treats a dead handle as "draw nothing".
pub type WeakArtboard = Weak<RefCell<dyn Artboard>>;

/// The host visual item, seen from a render node.
///
/// Only the layout bounds are consumed; the item stays the source of truth
/// and the node re-queries on every call.
pub trait HostItem {
    /// Current layout bounds of the item, in item-local coordinates.
    fn bounding_rect(&self) -> Rect;
}

/// Non-owning back-reference from a node to its owning item.
pub type WeakHostItem = Weak<dyn HostItem>;
