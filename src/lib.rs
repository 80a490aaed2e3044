//! Retained-mode 2D rendering engine.
//!
//! How a frame happens:
//!   - build renderers (shapes, gradients, images, compounds) and set
//!     their state; nothing draws yet
//!   - `has_changed` / `damages` compare current state against the last
//!     committed draw and report what needs repainting
//!   - `draw` runs setup, then a span per destination row, then cleanup;
//!     cleanup commits the state snapshot the next change check diffs
//!     against
//!
//! Geometry flows path -> flatten (device space) -> figure -> stroke ->
//! rasterize to 8-bit coverage -> composite. Pixels are premultiplied
//! ARGB in native byte order throughout; the compositor picks a kernel
//! per raster op, source and mask layout, with SSE2 variants installed
//! over the scalar ones where the target has them.

pub mod bitmap;
pub mod buffer;
pub mod color;
pub mod compositor;
pub mod compound;
pub mod context;
pub mod converter;
pub mod coord;
pub mod curve;
pub mod error;
pub mod figure;
pub mod format;
pub mod generator;
pub mod gradient;
pub mod job;
pub mod matrix;
pub mod path;
pub mod pattern;
pub mod perlin;
pub mod pool;
pub mod provider;
pub mod proxy;
pub mod raster;
pub mod rect;
pub mod renderer;
pub mod shape;
pub mod shapes;
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod simd;
pub mod stroker;
pub mod surface;

pub use buffer::Buffer;
pub use color::{Argb, Color};
pub use compositor::{Compositor, KernelKey, MaskChannel, Rop};
pub use context::Context;
pub use error::{Error, Result};
pub use format::Format;
pub use matrix::Matrix;
pub use path::{Path, SharedPath};
pub use raster::FillRule;
pub use rect::{IRect, Rect};
pub use renderer::{Features, Kind, Quality, Render, Renderer, SharedRenderer};
pub use stroker::{Cap, Dash, Join};
pub use surface::{SharedSurface, Surface};

pub use bitmap::Image;
pub use compound::Compound;
pub use gradient::{GradientStop, LinearGradient, RadialGradient, Spread};
pub use pattern::{Background, Checker, Grid, Stripes};
pub use perlin::Perlin;
pub use proxy::{Clipper, Proxy, Transition};
pub use shape::DrawMode;
pub use shapes::{Circle, Ellipse, FigureKind, PathKind, Rectangle};
