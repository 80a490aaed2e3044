//! Shared scanline core for the geometry kinds.
//!
//! Circle, rectangle, ellipse, path and figure all draw the same way: build
//! a command list, flatten it through the [`Generator`], rasterize fill and
//! stroke outlines into coverage and push coverage-weighted paint through
//! compositor kernels. [`Shape`] owns that machinery; the kinds own only
//! their geometry parameters and the command list they produce.
//!
//! Per row the fill kernel writes paint weighted by coverage, including the
//! zero-coverage pixels, then the stroke kernel blends the stroke paint on
//! top. Paint is either the flat color or a delegated renderer's span
//! modulated by that color.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::color::{mul_u8, Argb, Color};
use crate::compositor::{KernelKey, MaskSpan, Rop, SpanFn};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::figure::Figure;
use crate::format::Format;
use crate::generator::{Generator, StrokeParams};
use crate::path::Path;
use crate::raster::{FillRule, Rasterizer};
use crate::rect::{IRect, Rect};
use crate::renderer::{RenderState, SharedRenderer};
use crate::stroker::{Cap, Dash, Join};

/// Which parts of the outline get pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    #[default]
    Fill,
    Stroke,
    StrokeFill,
}

impl DrawMode {
    pub fn has_fill(self) -> bool {
        matches!(self, DrawMode::Fill | DrawMode::StrokeFill)
    }
    pub fn has_stroke(self) -> bool {
        matches!(self, DrawMode::Stroke | DrawMode::StrokeFill)
    }
}

/// Shape-level drawing state, snapshotted by the kinds for change
/// detection just like the renderer-level state.
#[derive(Debug, Clone)]
pub struct ShapeState {
    pub mode: DrawMode,
    pub fill_color: Argb,
    pub fill_renderer: Option<SharedRenderer>,
    pub fill_rule: FillRule,
    pub stroke_color: Argb,
    pub stroke_renderer: Option<SharedRenderer>,
    pub stroke: StrokeParams,
}

impl Default for ShapeState {
    fn default() -> ShapeState {
        ShapeState {
            mode: DrawMode::default(),
            fill_color: Argb::WHITE,
            fill_renderer: None,
            fill_rule: FillRule::default(),
            stroke_color: Argb::WHITE,
            stroke_renderer: None,
            stroke: StrokeParams::default(),
        }
    }
}

impl PartialEq for ShapeState {
    fn eq(&self, other: &ShapeState) -> bool {
        fn same(a: &Option<SharedRenderer>, b: &Option<SharedRenderer>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
        }
        self.mode == other.mode
            && self.fill_color == other.fill_color
            && same(&self.fill_renderer, &other.fill_renderer)
            && self.fill_rule == other.fill_rule
            && self.stroke_color == other.stroke_color
            && same(&self.stroke_renderer, &other.stroke_renderer)
            && self.stroke == other.stroke
    }
}

/// Fill and stroke machinery embedded by every geometry kind.
pub struct Shape {
    pub state: ShapeState,
    past: Option<ShapeState>,
    generator: Generator,
    fill_raster: Rasterizer,
    stroke_raster: Rasterizer,
    // bound for the draw in flight
    fill_kernel: Option<SpanFn>,
    stroke_kernel: Option<SpanFn>,
    fill_color: Color,
    stroke_color: Color,
    stroke_cov: u8,
    cov: Vec<u8>,
    paint: Vec<u32>,
}

impl Default for Shape {
    fn default() -> Self {
        Shape::new()
    }
}

impl Shape {
    pub fn new() -> Shape {
        Shape {
            state: ShapeState::default(),
            past: None,
            generator: Generator::new(),
            fill_raster: Rasterizer::new(),
            stroke_raster: Rasterizer::new(),
            fill_kernel: None,
            stroke_kernel: None,
            fill_color: Color::WHITE,
            stroke_color: Color::WHITE,
            stroke_cov: 255,
            cov: Vec::new(),
            paint: Vec::new(),
        }
    }

    pub fn set_mode(&mut self, mode: DrawMode) {
        self.state.mode = mode;
    }

    pub fn set_fill_color(&mut self, color: Argb) {
        self.state.fill_color = color;
    }

    pub fn set_fill_renderer(&mut self, renderer: Option<SharedRenderer>) {
        self.state.fill_renderer = renderer;
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) {
        self.state.fill_rule = rule;
    }

    pub fn set_stroke_color(&mut self, color: Argb) {
        self.state.stroke_color = color;
    }

    pub fn set_stroke_renderer(&mut self, renderer: Option<SharedRenderer>) {
        self.state.stroke_renderer = renderer;
    }

    pub fn set_stroke_weight(&mut self, weight: f64) {
        self.state.stroke.weight = weight;
    }

    pub fn set_stroke_cap(&mut self, cap: Cap) {
        self.state.stroke.cap = cap;
    }

    pub fn set_stroke_join(&mut self, join: Join) {
        self.state.stroke.join = join;
    }

    pub fn set_stroke_miter_limit(&mut self, limit: f64) {
        self.state.stroke.miter_limit = limit;
    }

    pub fn set_dashes(&mut self, dashes: &[Dash]) {
        self.state.stroke.dashes = SmallVec::from_slice(dashes);
    }

    /// Shape-level change since the last committed draw. Kinds or their
    /// delegated paints contribute their own checks on top.
    pub fn changed(&self) -> bool {
        let state_moved = match &self.past {
            None => true,
            Some(past) => *past != self.state,
        };
        if state_moved {
            return true;
        }
        let child_moved = |r: &Option<SharedRenderer>| match r {
            Some(r) => r.borrow().has_changed(),
            None => false,
        };
        child_moved(&self.state.fill_renderer) || child_moved(&self.state.stroke_renderer)
    }

    /// Device-space bounds of whatever the current mode draws.
    pub fn bounds(&mut self, state: &RenderState, path: &Path) -> Rect {
        let matrix = state.full_matrix();
        let stroke = if self.state.mode.has_stroke() {
            Some(&self.state.stroke)
        } else {
            None
        };
        self.generator.generate(path, &matrix, stroke);
        let mut bounds = Rect::empty();
        if self.state.mode.has_fill() {
            bounds = self.generator.base().bounds();
        }
        if self.state.mode.has_stroke() {
            bounds = bounds.union(&self.generator.stroke().bounds());
        }
        bounds
    }

    /// Winding test against the flattened fill outline.
    pub fn is_inside(&mut self, state: &RenderState, path: &Path, x: f64, y: f64) -> bool {
        let matrix = state.full_matrix();
        let stroke = if self.state.mode.has_stroke() {
            Some(&self.state.stroke)
        } else {
            None
        };
        self.generator.generate(path, &matrix, stroke);
        let figure = if self.state.mode.has_fill() {
            self.generator.base()
        } else {
            self.generator.stroke()
        };
        winding_hit(figure, self.state.fill_rule, x, y)
    }

    pub fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect, path: &Path) -> Result<()> {
        let matrix = state.full_matrix();
        let wants_fill = self.state.mode.has_fill();
        let wants_stroke = self.state.mode.has_stroke();
        let stroke = if wants_stroke {
            Some(&self.state.stroke)
        } else {
            None
        };
        self.generator.generate(path, &matrix, stroke);

        self.fill_kernel = None;
        self.stroke_kernel = None;
        if wants_fill {
            self.fill_raster.reset();
            self.fill_raster.set_rule(self.state.fill_rule);
            self.fill_raster.set_clip(area);
            self.fill_raster.add_figure(self.generator.base());
            if self.fill_raster.finish() {
                self.fill_kernel = Some(span_kernel(
                    ctx,
                    Rop::Fill,
                    self.state.fill_renderer.is_some(),
                )?);
            }
        }
        if wants_stroke {
            self.stroke_raster.reset();
            // Stroke outlines carry their holes as reversed rings.
            self.stroke_raster.set_rule(FillRule::NonZero);
            self.stroke_raster.set_clip(area);
            self.stroke_raster.add_figure(self.generator.stroke());
            if self.stroke_raster.finish() {
                self.stroke_kernel = Some(span_kernel(
                    ctx,
                    Rop::Blend,
                    self.state.stroke_renderer.is_some(),
                )?);
            }
        }
        self.fill_color = Color::from(self.state.fill_color);
        self.stroke_color = Color::from(self.state.stroke_color);
        self.stroke_cov = self.generator.stroke_coverage();

        if self.fill_kernel.is_some() {
            if let Some(r) = &self.state.fill_renderer {
                r.borrow_mut().setup(ctx, area)?;
            }
        }
        if self.stroke_kernel.is_some() {
            if let Some(r) = &self.state.stroke_renderer {
                if let Err(e) = r.borrow_mut().setup(ctx, area) {
                    if self.fill_kernel.is_some() {
                        if let Some(f) = &self.state.fill_renderer {
                            f.borrow_mut().cleanup();
                        }
                    }
                    return Err(e);
                }
            }
        }

        let w = area.w as usize;
        self.cov.resize(w, 0);
        if self.state.fill_renderer.is_some() || self.state.stroke_renderer.is_some() {
            self.paint.resize(w, 0);
        }
        Ok(())
    }

    pub fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let n = dst.len();
        match self.fill_kernel {
            Some(kernel) if self.fill_raster.sweep_row(y, x, &mut self.cov[..n]) => {
                let src = match &self.state.fill_renderer {
                    Some(r) => {
                        r.borrow_mut().span(y, x, &mut self.paint[..n]);
                        Some(&self.paint[..n])
                    }
                    None => None,
                };
                kernel(dst, src, self.fill_color, Some(MaskSpan::Alpha(&self.cov[..n])));
            }
            _ => dst.fill(0),
        }
        if let Some(kernel) = self.stroke_kernel {
            if self.stroke_raster.sweep_row(y, x, &mut self.cov[..n]) {
                if self.stroke_cov < 255 {
                    // Sub-pixel weights thin the stroke by coverage.
                    for c in &mut self.cov[..n] {
                        *c = mul_u8(self.stroke_cov as u32, *c as u32) as u8;
                    }
                }
                let src = match &self.state.stroke_renderer {
                    Some(r) => {
                        r.borrow_mut().span(y, x, &mut self.paint[..n]);
                        Some(&self.paint[..n])
                    }
                    None => None,
                };
                kernel(
                    dst,
                    src,
                    self.stroke_color,
                    Some(MaskSpan::Alpha(&self.cov[..n])),
                );
            }
        }
    }

    /// Commit the snapshot and release whatever setup bound.
    pub fn cleanup(&mut self) {
        if self.fill_kernel.take().is_some() {
            if let Some(r) = &self.state.fill_renderer {
                r.borrow_mut().cleanup();
            }
        }
        if self.stroke_kernel.take().is_some() {
            if let Some(r) = &self.state.stroke_renderer {
                r.borrow_mut().cleanup();
            }
        }
        self.past = Some(self.state.clone());
    }
}

fn span_kernel(ctx: &Context, rop: Rop, with_src: bool) -> Result<SpanFn> {
    let d = Format::Argb8888Pre;
    let mut key = KernelKey::new(rop, d).with_mask(Format::A8);
    if with_src {
        key = key.with_src(d);
    }
    ctx.compositor()
        .span_for(key)
        .ok_or(Error::MissingKernel { rop, dst: d })
}

fn winding_hit(figure: &Figure, rule: FillRule, x: f64, y: f64) -> bool {
    let w = figure.winding(x, y);
    match rule {
        FillRule::NonZero => w != 0,
        FillRule::EvenOdd => w % 2 != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    fn square(side: f64) -> Path {
        let mut p = Path::new();
        p.move_to(0.0, 0.0);
        p.line_to(side, 0.0);
        p.line_to(side, side);
        p.line_to(0.0, side);
        p.close();
        p
    }

    #[test]
    fn fill_span_writes_solid_interior() {
        let ctx = Context::new();
        let path = square(8.0);
        let state = RenderState::default();
        let mut shape = Shape::new();
        shape.set_fill_color(Argb::new(0xff, 0xff, 0x00, 0x00));
        let area = IRect::new(0, 0, 8, 8);
        shape.setup(&ctx, &state, &area, &path).unwrap();
        let mut row = vec![0u32; 8];
        shape.span(4, 0, &mut row);
        assert!(row.iter().all(|&px| px == 0xffff_0000));
        shape.cleanup();
    }

    #[test]
    fn span_outside_geometry_is_transparent() {
        let ctx = Context::new();
        let path = square(4.0);
        let state = RenderState::default();
        let mut shape = Shape::new();
        let area = IRect::new(0, 0, 16, 16);
        shape.setup(&ctx, &state, &area, &path).unwrap();
        let mut row = vec![0xdead_beefu32; 16];
        shape.span(12, 0, &mut row);
        assert!(row.iter().all(|&px| px == 0));
        shape.cleanup();
    }

    #[test]
    fn stroke_blends_over_fill() {
        let ctx = Context::new();
        let path = square(16.0);
        let state = RenderState::default();
        let mut shape = Shape::new();
        shape.set_mode(DrawMode::StrokeFill);
        shape.set_fill_color(Argb::new(0xff, 0x00, 0x00, 0xff));
        shape.set_stroke_color(Argb::new(0xff, 0xff, 0x00, 0x00));
        shape.set_stroke_weight(4.0);
        let area = IRect::new(0, 0, 16, 16);
        shape.setup(&ctx, &state, &area, &path).unwrap();
        let mut row = vec![0u32; 16];
        shape.span(8, 0, &mut row);
        // Stroke straddles the left edge, fill owns the middle.
        assert_eq!(row[0], 0xffff_0000);
        assert_eq!(row[8], 0xff00_00ff);
        shape.cleanup();
    }

    #[test]
    fn stroke_only_leaves_interior_empty() {
        let ctx = Context::new();
        let path = square(16.0);
        let state = RenderState::default();
        let mut shape = Shape::new();
        shape.set_mode(DrawMode::Stroke);
        shape.set_stroke_weight(2.0);
        let area = IRect::new(0, 0, 16, 16);
        shape.setup(&ctx, &state, &area, &path).unwrap();
        let mut row = vec![0u32; 16];
        shape.span(8, 0, &mut row);
        assert_eq!(row[0], 0xffff_ffff);
        assert_eq!(row[8], 0);
        shape.cleanup();
    }

    #[test]
    fn change_detection_tracks_shape_state() {
        let mut shape = Shape::new();
        assert!(shape.changed());
        shape.cleanup();
        assert!(!shape.changed());
        shape.set_stroke_weight(3.0);
        assert!(shape.changed());
        shape.cleanup();
        assert!(!shape.changed());
    }

    #[test]
    fn bounds_include_stroke_overhang() {
        let path = square(10.0);
        let state = RenderState::default();
        let mut shape = Shape::new();
        shape.set_mode(DrawMode::StrokeFill);
        shape.set_stroke_weight(4.0);
        let b = shape.bounds(&state, &path);
        assert!((b.x + 2.0).abs() < 1e-9);
        assert!((b.right() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn is_inside_honors_transform() {
        let path = square(10.0);
        let mut state = RenderState::default();
        state.origin = (100.0, 0.0);
        let mut shape = Shape::new();
        assert!(shape.is_inside(&state, &path, 105.0, 5.0));
        assert!(!shape.is_inside(&state, &path, 5.0, 5.0));
    }

    #[test]
    fn scaled_fill_covers_scaled_area() {
        let ctx = Context::new();
        let path = square(4.0);
        let mut state = RenderState::default();
        state.matrix = Matrix::scale(4.0, 4.0);
        let mut shape = Shape::new();
        let area = IRect::new(0, 0, 16, 16);
        shape.setup(&ctx, &state, &area, &path).unwrap();
        let mut row = vec![0u32; 16];
        shape.span(8, 0, &mut row);
        assert!(row.iter().all(|&px| px == 0xffff_ffff));
        shape.cleanup();
    }
}
