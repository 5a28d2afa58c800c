//! The render core: settings, the backend resource factory, backend-agnostic
//! resources, and the per-backend scene-graph nodes.

pub mod buffer;
pub mod factory;
pub mod font;
pub mod gradient;
pub mod image;
pub mod node;
pub mod paint;
pub mod painter;
pub mod path;
pub mod settings;
pub mod software;

#[cfg(feature = "gpu")]
pub mod gpu;
