//! Geometry renderer kinds.
//!
//! Each kind owns its geometry parameters and a command list rebuilt when
//! they move; everything else lives in the embedded [`Shape`]. The command
//! list rebuild bumps the path version, which is what tells the generator
//! memo to flatten again.

use crate::context::Context;
use crate::error::Result;
use crate::figure::Figure;
use crate::path::{Path, SharedPath};
use crate::rect::{IRect, Rect};
use crate::renderer::{Features, Kind, RenderState};
use crate::shape::Shape;

// Cubic control offset approximating a quarter circle.
const KAPPA: f64 = 0.552_284_749_830_793_6;

fn shape_features() -> Features {
    Features::AFFINE
        | Features::PROJECTIVE
        | Features::COLORIZE
        | Features::ARGB8888
        | Features::ROP
        | Features::MASK
        | Features::GEOMETRY
}

fn ellipse_commands(path: &mut Path, cx: f64, cy: f64, rx: f64, ry: f64) {
    let kx = KAPPA * rx;
    let ky = KAPPA * ry;
    path.move_to(cx + rx, cy);
    path.cubic_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry);
    path.cubic_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy);
    path.cubic_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry);
    path.cubic_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy);
    path.close();
}

/// Circle centered on `(x, y)`.
pub struct Circle {
    shape: Shape,
    x: f64,
    y: f64,
    radius: f64,
    path: Path,
    built: Option<(f64, f64, f64)>,
    committed: Option<(f64, f64, f64)>,
}

impl Circle {
    pub fn new(x: f64, y: f64, radius: f64) -> Circle {
        Circle {
            shape: Shape::new(),
            x,
            y,
            radius,
            path: Path::new(),
            built: None,
            committed: None,
        }
    }

    pub fn set_center(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut Shape {
        &mut self.shape
    }

    fn geometry(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.radius)
    }

    fn ensure_path(&mut self) {
        if self.built == Some(self.geometry()) {
            return;
        }
        self.path.clear();
        let r = self.radius.max(0.0);
        if r > 0.0 {
            ellipse_commands(&mut self.path, self.x, self.y, r, r);
        }
        self.built = Some(self.geometry());
    }
}

impl Kind for Circle {
    fn name(&self) -> &'static str {
        "circle"
    }

    fn features(&self) -> Features {
        shape_features()
    }

    fn bounds(&mut self, state: &RenderState) -> Rect {
        self.ensure_path();
        self.shape.bounds(state, &self.path)
    }

    fn changed(&self) -> bool {
        self.shape.changed() || self.committed != Some(self.geometry())
    }

    fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect) -> Result<()> {
        self.ensure_path();
        self.shape.setup(ctx, state, area, &self.path)
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        self.shape.span(y, x, dst);
    }

    fn cleanup(&mut self) {
        self.shape.cleanup();
        self.committed = Some(self.geometry());
    }

    fn is_inside(&mut self, state: &RenderState, x: f64, y: f64) -> bool {
        self.ensure_path();
        self.shape.is_inside(state, &self.path, x, y)
    }
}

/// Axis-aligned rectangle, optionally with rounded corners.
pub struct Rectangle {
    shape: Shape,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    corner_radius: f64,
    path: Path,
    built: Option<(f64, f64, f64, f64, f64)>,
    committed: Option<(f64, f64, f64, f64, f64)>,
}

impl Rectangle {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Rectangle {
        Rectangle {
            shape: Shape::new(),
            x,
            y,
            w,
            h,
            corner_radius: 0.0,
            path: Path::new(),
            built: None,
            committed: None,
        }
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn set_size(&mut self, w: f64, h: f64) {
        self.w = w;
        self.h = h;
    }

    /// Uniform corner radius; zero keeps the corners square.
    pub fn set_corner_radius(&mut self, radius: f64) {
        self.corner_radius = radius;
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut Shape {
        &mut self.shape
    }

    fn geometry(&self) -> (f64, f64, f64, f64, f64) {
        (self.x, self.y, self.w, self.h, self.corner_radius)
    }

    fn ensure_path(&mut self) {
        if self.built == Some(self.geometry()) {
            return;
        }
        self.path.clear();
        let (x, y, w, h) = (self.x, self.y, self.w, self.h);
        if w > 0.0 && h > 0.0 {
            let r = self
                .corner_radius
                .max(0.0)
                .min(w / 2.0)
                .min(h / 2.0);
            if r > 0.0 {
                let k = KAPPA * r;
                self.path.move_to(x + r, y);
                self.path.line_to(x + w - r, y);
                self.path
                    .cubic_to(x + w - r + k, y, x + w, y + r - k, x + w, y + r);
                self.path.line_to(x + w, y + h - r);
                self.path
                    .cubic_to(x + w, y + h - r + k, x + w - r + k, y + h, x + w - r, y + h);
                self.path.line_to(x + r, y + h);
                self.path
                    .cubic_to(x + r - k, y + h, x, y + h - r + k, x, y + h - r);
                self.path.line_to(x, y + r);
                self.path.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
            } else {
                self.path.move_to(x, y);
                self.path.line_to(x + w, y);
                self.path.line_to(x + w, y + h);
                self.path.line_to(x, y + h);
            }
            self.path.close();
        }
        self.built = Some(self.geometry());
    }
}

impl Kind for Rectangle {
    fn name(&self) -> &'static str {
        "rectangle"
    }

    fn features(&self) -> Features {
        shape_features()
    }

    fn bounds(&mut self, state: &RenderState) -> Rect {
        self.ensure_path();
        self.shape.bounds(state, &self.path)
    }

    fn changed(&self) -> bool {
        self.shape.changed() || self.committed != Some(self.geometry())
    }

    fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect) -> Result<()> {
        self.ensure_path();
        self.shape.setup(ctx, state, area, &self.path)
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        self.shape.span(y, x, dst);
    }

    fn cleanup(&mut self) {
        self.shape.cleanup();
        self.committed = Some(self.geometry());
    }

    fn is_inside(&mut self, state: &RenderState, x: f64, y: f64) -> bool {
        self.ensure_path();
        self.shape.is_inside(state, &self.path, x, y)
    }
}

/// Axis-aligned ellipse centered on `(x, y)`.
pub struct Ellipse {
    shape: Shape,
    x: f64,
    y: f64,
    rx: f64,
    ry: f64,
    path: Path,
    built: Option<(f64, f64, f64, f64)>,
    committed: Option<(f64, f64, f64, f64)>,
}

impl Ellipse {
    pub fn new(x: f64, y: f64, rx: f64, ry: f64) -> Ellipse {
        Ellipse {
            shape: Shape::new(),
            x,
            y,
            rx,
            ry,
            path: Path::new(),
            built: None,
            committed: None,
        }
    }

    pub fn set_center(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn set_radii(&mut self, rx: f64, ry: f64) {
        self.rx = rx;
        self.ry = ry;
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut Shape {
        &mut self.shape
    }

    fn geometry(&self) -> (f64, f64, f64, f64) {
        (self.x, self.y, self.rx, self.ry)
    }

    fn ensure_path(&mut self) {
        if self.built == Some(self.geometry()) {
            return;
        }
        self.path.clear();
        if self.rx > 0.0 && self.ry > 0.0 {
            ellipse_commands(&mut self.path, self.x, self.y, self.rx, self.ry);
        }
        self.built = Some(self.geometry());
    }
}

impl Kind for Ellipse {
    fn name(&self) -> &'static str {
        "ellipse"
    }

    fn features(&self) -> Features {
        shape_features()
    }

    fn bounds(&mut self, state: &RenderState) -> Rect {
        self.ensure_path();
        self.shape.bounds(state, &self.path)
    }

    fn changed(&self) -> bool {
        self.shape.changed() || self.committed != Some(self.geometry())
    }

    fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect) -> Result<()> {
        self.ensure_path();
        self.shape.setup(ctx, state, area, &self.path)
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        self.shape.span(y, x, dst);
    }

    fn cleanup(&mut self) {
        self.shape.cleanup();
        self.committed = Some(self.geometry());
    }

    fn is_inside(&mut self, state: &RenderState, x: f64, y: f64) -> bool {
        self.ensure_path();
        self.shape.is_inside(state, &self.path, x, y)
    }
}

/// Arbitrary command list, shared with whoever builds it.
pub struct PathKind {
    shape: Shape,
    path: SharedPath,
    committed_version: Option<u64>,
}

impl PathKind {
    pub fn new(path: SharedPath) -> PathKind {
        PathKind {
            shape: Shape::new(),
            path,
            committed_version: None,
        }
    }

    pub fn path(&self) -> &SharedPath {
        &self.path
    }

    pub fn set_path(&mut self, path: SharedPath) {
        self.path = path;
        self.committed_version = None;
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut Shape {
        &mut self.shape
    }
}

impl Kind for PathKind {
    fn name(&self) -> &'static str {
        "path"
    }

    fn features(&self) -> Features {
        shape_features()
    }

    fn bounds(&mut self, state: &RenderState) -> Rect {
        let path = self.path.clone();
        let path_ref = path.borrow();
        self.shape.bounds(state, &path_ref)
    }

    fn changed(&self) -> bool {
        self.shape.changed() || self.committed_version != Some(self.path.borrow().version())
    }

    fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect) -> Result<()> {
        let path = self.path.clone();
        let path_ref = path.borrow();
        self.shape.setup(ctx, state, area, &path_ref)
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        self.shape.span(y, x, dst);
    }

    fn cleanup(&mut self) {
        self.shape.cleanup();
        self.committed_version = Some(self.path.borrow().version());
    }

    fn is_inside(&mut self, state: &RenderState, x: f64, y: f64) -> bool {
        let path = self.path.clone();
        let path_ref = path.borrow();
        self.shape.is_inside(state, &path_ref, x, y)
    }
}

/// Pre-flattened polygon set drawn through the same pipeline; the polygons
/// become line commands so transforms still apply.
pub struct FigureKind {
    shape: Shape,
    figure: Figure,
    path: Path,
    stale: bool,
    dirty: bool,
}

impl FigureKind {
    pub fn new() -> FigureKind {
        FigureKind {
            shape: Shape::new(),
            figure: Figure::new(),
            path: Path::new(),
            stale: true,
            dirty: true,
        }
    }

    pub fn figure(&self) -> &Figure {
        &self.figure
    }

    /// Mutable access marks the geometry changed.
    pub fn figure_mut(&mut self) -> &mut Figure {
        self.stale = true;
        self.dirty = true;
        &mut self.figure
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_mut(&mut self) -> &mut Shape {
        &mut self.shape
    }

    fn ensure_path(&mut self) {
        if !self.stale {
            return;
        }
        self.path.clear();
        for poly in &self.figure.polygons {
            let mut points = poly.points.iter();
            if let Some(first) = points.next() {
                self.path.move_to(first.x, first.y);
                for p in points {
                    self.path.line_to(p.x, p.y);
                }
                if poly.closed {
                    self.path.close();
                }
            }
        }
        self.stale = false;
    }
}

impl Default for FigureKind {
    fn default() -> Self {
        FigureKind::new()
    }
}

impl Kind for FigureKind {
    fn name(&self) -> &'static str {
        "figure"
    }

    fn features(&self) -> Features {
        shape_features()
    }

    fn bounds(&mut self, state: &RenderState) -> Rect {
        self.ensure_path();
        self.shape.bounds(state, &self.path)
    }

    fn changed(&self) -> bool {
        self.shape.changed() || self.dirty
    }

    fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect) -> Result<()> {
        self.ensure_path();
        self.shape.setup(ctx, state, area, &self.path)
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        self.shape.span(y, x, dst);
    }

    fn cleanup(&mut self) {
        self.shape.cleanup();
        self.dirty = false;
    }

    fn is_inside(&mut self, state: &RenderState, x: f64, y: f64) -> bool {
        self.ensure_path();
        self.shape.is_inside(state, &self.path, x, y)
    }
}
