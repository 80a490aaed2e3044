//! Renderer object model
//!
//! A renderer pairs a drawing kind (circle, gradient, compound, ...) with
//! two snapshots of the shared drawing state: `current` takes every setter,
//! `past` is committed by cleanup after a successful draw. Change detection
//! and damage reporting fall out of comparing the two.
//!
//! Drawing runs setup / span-per-row / cleanup. A kind only produces its
//! own premultiplied pixels; the wrapper applies the renderer color and
//! mask, then hands the result to a compositor kernel for the requested
//! raster operation.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use log::{debug, trace};

use crate::color::{Argb, Color};
use crate::compositor::{tinted, weighted, KernelKey, MaskChannel, Rop, SpanFn};
use crate::context::Context;
use crate::coord::RowSampler;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::matrix::{Matrix, MatrixKind};
use crate::rect::{IRect, Rect};
use crate::surface::Surface;

bitflags! {
    /// What a renderer kind can do; queried by callers and checked at setup.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Features: u32 {
        const TRANSLATE  = 1 << 0;
        const SCALE      = 1 << 1;
        const AFFINE     = 1 << 2;
        const PROJECTIVE = 1 << 3;
        const COLORIZE   = 1 << 4;
        const A8         = 1 << 5;
        const ARGB8888   = 1 << 6;
        const ROP        = 1 << 7;
        const QUALITY    = 1 << 8;
        const MASK       = 1 << 9;
        const GEOMETRY   = 1 << 10;
    }
}

/// Rendering quality knob; kinds that resample pixels honor it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Fast,
    #[default]
    Good,
    Best,
}

/// State every renderer carries, snapshotted for change detection.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub matrix: Matrix,
    pub origin: (f64, f64),
    pub scale: (f64, f64),
    pub color: Argb,
    pub mask: Option<SharedRenderer>,
    pub mask_channel: MaskChannel,
    pub quality: Quality,
    pub visible: bool,
}

impl Default for RenderState {
    fn default() -> RenderState {
        RenderState {
            matrix: Matrix::identity(),
            origin: (0.0, 0.0),
            scale: (1.0, 1.0),
            color: Argb::WHITE,
            mask: None,
            mask_channel: MaskChannel::default(),
            quality: Quality::default(),
            visible: true,
        }
    }
}

impl PartialEq for RenderState {
    fn eq(&self, other: &RenderState) -> bool {
        let mask_same = match (&self.mask, &other.mask) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        self.matrix == other.matrix
            && self.origin == other.origin
            && self.scale == other.scale
            && self.color == other.color
            && mask_same
            && self.mask_channel == other.mask_channel
            && self.quality == other.quality
            && self.visible == other.visible
    }
}

impl RenderState {
    /// Full local-to-device transform with origin and scale folded in.
    pub fn full_matrix(&self) -> Matrix {
        let mut m = Matrix::translate(self.origin.0, self.origin.1).compose(&self.matrix);
        if self.scale != (1.0, 1.0) {
            m = m.compose(&Matrix::scale(self.scale.0, self.scale.1));
        }
        m
    }

    /// Device-to-local sampler, or an error when the transform cannot be
    /// inverted.
    pub fn sampler(&self, name: &'static str) -> Result<RowSampler> {
        let m = self.full_matrix();
        let inv = m.invert().ok_or(Error::MissingCapability {
            renderer: name,
            missing: "invertible transform",
        })?;
        Ok(RowSampler::from_inverse(&inv))
    }

    /// Map a local-space rectangle to destination space.
    pub fn transform_bounds(&self, local: &Rect) -> Rect {
        self.full_matrix().map_rect(local)
    }
}

/// Feature a transform demands from the drawing kind.
fn required_feature(m: &Matrix) -> Features {
    match m.kind() {
        MatrixKind::Projective => Features::PROJECTIVE,
        MatrixKind::Identity => Features::empty(),
        MatrixKind::Affine => {
            if m.xx == 1.0 && m.yy == 1.0 && m.xy == 0.0 && m.yx == 0.0 {
                Features::TRANSLATE
            } else if m.xy == 0.0 && m.yx == 0.0 {
                Features::SCALE
            } else {
                Features::AFFINE
            }
        }
    }
}

/// One drawing kind: produces its own premultiplied pixels for a row.
///
/// `setup` runs once per draw before any `span`; `cleanup` commits the
/// kind's private change-detection state and must undo whatever `setup`
/// acquired.
pub trait Kind {
    fn name(&self) -> &'static str;
    fn features(&self) -> Features;
    /// Destination-space bounds under `state`; may regenerate geometry.
    fn bounds(&mut self, state: &RenderState) -> Rect;
    /// True when kind-private state differs from the last committed draw.
    fn changed(&self) -> bool {
        false
    }
    fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect) -> Result<()>;
    /// Write premultiplied pixels for row `y` starting at column `x`.
    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]);
    fn cleanup(&mut self) {}
    fn is_inside(&mut self, state: &RenderState, x: f64, y: f64) -> bool {
        self.bounds(state).contains(x, y)
    }
}

/// Object-safe face of [`Renderer`], used wherever renderers reference
/// each other (masks, fill paints, compound layers).
pub trait Render {
    fn name(&self) -> &'static str;
    fn features(&self) -> Features;
    fn bounds(&mut self) -> Rect;
    fn has_changed(&self) -> bool;
    fn damages(&mut self, cb: &mut dyn FnMut(&IRect));
    fn is_inside(&mut self, x: f64, y: f64) -> bool;
    fn draw(&mut self, ctx: &Context, surface: &mut Surface, rop: Rop, area: Option<&IRect>)
        -> Result<()>;

    fn state(&self) -> &RenderState;
    fn state_mut(&mut self) -> &mut RenderState;

    /// Lifecycle pieces parents drive directly when compositing children.
    fn setup(&mut self, ctx: &Context, area: &IRect) -> Result<()>;
    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]);
    fn cleanup(&mut self);
}

impl std::fmt::Debug for dyn Render {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dyn Render({})", self.name())
    }
}

pub type SharedRenderer = Rc<RefCell<dyn Render>>;

/// A kind plus the shared state machinery.
pub struct Renderer<K: Kind> {
    kind: K,
    current: RenderState,
    past: RenderState,
    past_bounds: Rect,
    ever_drawn: bool,
    mask_argb: Vec<u32>,
}

impl<K: Kind> Renderer<K> {
    pub fn new(kind: K) -> Renderer<K> {
        Renderer {
            kind,
            current: RenderState::default(),
            past: RenderState::default(),
            past_bounds: Rect::empty(),
            ever_drawn: false,
            mask_argb: Vec::new(),
        }
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut K {
        &mut self.kind
    }

    pub fn set_matrix(&mut self, m: Matrix) {
        self.current.matrix = m;
    }

    pub fn set_origin(&mut self, x: f64, y: f64) {
        self.current.origin = (x, y);
    }

    pub fn set_scale(&mut self, sx: f64, sy: f64) {
        self.current.scale = (sx, sy);
    }

    pub fn set_color(&mut self, color: Argb) {
        self.current.color = color;
    }

    pub fn set_mask(&mut self, mask: Option<SharedRenderer>, channel: MaskChannel) {
        self.current.mask = mask;
        self.current.mask_channel = channel;
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.current.quality = quality;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.current.visible = visible;
    }

    pub fn into_shared(self) -> SharedRenderer
    where
        K: 'static,
    {
        Rc::new(RefCell::new(self))
    }

    fn check_features(&self) -> Result<()> {
        let need = required_feature(&self.current.matrix);
        let have = self.kind.features();
        // broader transform support implies the narrower classes
        let satisfied = need.is_empty()
            || have.contains(need)
            || (need == Features::TRANSLATE
                && have.intersects(Features::SCALE | Features::AFFINE | Features::PROJECTIVE))
            || (need == Features::SCALE
                && have.intersects(Features::AFFINE | Features::PROJECTIVE))
            || (need == Features::AFFINE && have.contains(Features::PROJECTIVE));
        if !satisfied {
            return Err(Error::MissingCapability {
                renderer: self.kind.name(),
                missing: "transform support",
            });
        }
        if self.current.mask.is_some() && !have.contains(Features::MASK) {
            return Err(Error::MissingCapability {
                renderer: self.kind.name(),
                missing: "mask support",
            });
        }
        Ok(())
    }
}

impl<K: Kind> Render for Renderer<K> {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn features(&self) -> Features {
        self.kind.features()
    }

    fn bounds(&mut self) -> Rect {
        self.kind.bounds(&self.current)
    }

    fn has_changed(&self) -> bool {
        if !self.ever_drawn || self.kind.changed() || self.current != self.past {
            return true;
        }
        match &self.current.mask {
            Some(m) => m.borrow().has_changed(),
            None => false,
        }
    }

    fn damages(&mut self, cb: &mut dyn FnMut(&IRect)) {
        if !self.has_changed() {
            return;
        }
        if self.ever_drawn {
            let past = self.past_bounds.to_outer();
            if !past.is_empty() {
                cb(&past);
            }
        }
        let now = self.kind.bounds(&self.current).to_outer();
        if !now.is_empty() {
            cb(&now);
        }
    }

    fn is_inside(&mut self, x: f64, y: f64) -> bool {
        self.kind.is_inside(&self.current, x, y)
    }

    fn state(&self) -> &RenderState {
        &self.current
    }

    fn state_mut(&mut self) -> &mut RenderState {
        &mut self.current
    }

    fn setup(&mut self, ctx: &Context, area: &IRect) -> Result<()> {
        self.check_features()?;
        if let Some(mask) = &self.current.mask {
            mask.borrow_mut().setup(ctx, area)?;
        }
        if let Err(e) = self.kind.setup(ctx, &self.current, area) {
            if let Some(mask) = &self.current.mask {
                mask.borrow_mut().cleanup();
            }
            return Err(e);
        }
        trace!("{} set up over {:?}", self.kind.name(), area);
        Ok(())
    }

    /// Final pixels for this renderer: the kind's output with the renderer
    /// color and mask applied.
    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        self.kind.span(y, x, dst);
        if self.current.color != Argb::WHITE {
            let c = Color::from(self.current.color);
            for px in dst.iter_mut() {
                *px = tinted(c, *px);
            }
        }
        if let Some(mask) = &self.current.mask {
            self.mask_argb.resize(dst.len(), 0);
            mask.borrow_mut().span(y, x, &mut self.mask_argb);
            match self.current.mask_channel {
                MaskChannel::Alpha => {
                    for (px, m) in dst.iter_mut().zip(&self.mask_argb) {
                        *px = weighted(m >> 24, *px);
                    }
                }
                MaskChannel::Luminance => {
                    for (px, m) in dst.iter_mut().zip(&self.mask_argb) {
                        *px = weighted(crate::color::luminance(*m), *px);
                    }
                }
            }
        }
    }

    fn cleanup(&mut self) {
        self.kind.cleanup();
        if let Some(mask) = &self.current.mask {
            mask.borrow_mut().cleanup();
        }
        self.past = self.current.clone();
        self.past_bounds = self.kind.bounds(&self.current);
        self.ever_drawn = true;
    }

    fn draw(
        &mut self,
        ctx: &Context,
        surface: &mut Surface,
        rop: Rop,
        area: Option<&IRect>,
    ) -> Result<()> {
        if !self.current.visible {
            return Ok(());
        }
        let bounds = self.kind.bounds(&self.current).to_outer();
        let mut clip = surface.rect().intersection(&bounds);
        if let Some(area) = area {
            clip = clip.intersection(area);
        }
        if clip.is_empty() {
            return Ok(());
        }

        Render::setup(self, ctx, &clip)?;
        debug!(
            "drawing {} {:?} over {:?}",
            self.kind.name(),
            rop,
            clip
        );

        let direct =
            rop == Rop::Fill && self.current.color == Argb::WHITE && self.current.mask.is_none();
        let (x0, x1) = (clip.x, clip.right());
        let w = (x1 - x0) as usize;
        if direct {
            for y in clip.y..clip.bottom() {
                let row = &mut surface.row_mut(y as usize)[x0 as usize..x1 as usize];
                self.kind.span(y, x0, row);
            }
        } else {
            let key = KernelKey::new(rop, Format::Argb8888Pre).with_src(Format::Argb8888Pre);
            let blend: SpanFn = match ctx.compositor().span_for(key) {
                Some(f) => f,
                None => {
                    self.kind.cleanup();
                    if let Some(mask) = &self.current.mask {
                        mask.borrow_mut().cleanup();
                    }
                    return Err(Error::MissingKernel { rop, dst: Format::Argb8888Pre });
                }
            };
            let mut scratch = vec![0u32; w];
            for y in clip.y..clip.bottom() {
                Render::span(self, y, x0, &mut scratch);
                let row = &mut surface.row_mut(y as usize)[x0 as usize..x1 as usize];
                blend(row, Some(&scratch), Color::WHITE, None);
            }
        }

        Render::cleanup(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat {
        pixel: u32,
        dirty: bool,
    }

    impl Kind for Flat {
        fn name(&self) -> &'static str {
            "flat"
        }
        fn features(&self) -> Features {
            Features::all()
        }
        fn bounds(&mut self, _state: &RenderState) -> Rect {
            Rect::new(0.0, 0.0, 64.0, 64.0)
        }
        fn changed(&self) -> bool {
            self.dirty
        }
        fn setup(&mut self, _ctx: &Context, _state: &RenderState, _area: &IRect) -> Result<()> {
            Ok(())
        }
        fn span(&mut self, _y: i32, _x: i32, dst: &mut [u32]) {
            dst.fill(self.pixel);
        }
        fn cleanup(&mut self) {
            self.dirty = false;
        }
    }

    fn flat(pixel: u32) -> Renderer<Flat> {
        Renderer::new(Flat { pixel, dirty: true })
    }

    #[test]
    fn change_detection_tracks_state_and_kind() {
        let ctx = Context::new();
        let mut r = flat(0xff00_ff00);
        assert!(r.has_changed(), "never drawn");
        let mut s = Surface::new(64, 64).unwrap();
        r.draw(&ctx, &mut s, Rop::Fill, None).unwrap();
        assert!(!r.has_changed(), "clean after draw");
        r.set_color(Argb::new(255, 1, 2, 3));
        assert!(r.has_changed(), "color touched");
        r.draw(&ctx, &mut s, Rop::Fill, None).unwrap();
        assert!(!r.has_changed());
        r.kind_mut().dirty = true;
        assert!(r.has_changed(), "kind substate");
    }

    #[test]
    fn fill_draw_writes_rows_directly() {
        let ctx = Context::new();
        let mut r = flat(0xffff_0000);
        let mut s = Surface::new(64, 64).unwrap();
        r.draw(&ctx, &mut s, Rop::Fill, None).unwrap();
        assert_eq!(s.pixel(10, 10).0, 0xffff_0000);
    }

    #[test]
    fn draw_clips_to_kind_bounds() {
        let ctx = Context::new();
        let mut r = flat(0xffff_0000);
        let mut s = Surface::new(128, 128).unwrap();
        r.draw(&ctx, &mut s, Rop::Fill, None).unwrap();
        assert_eq!(s.pixel(63, 63).0, 0xffff_0000);
        assert_eq!(s.pixel(64, 64).0, 0, "outside bounds untouched");
    }

    #[test]
    fn blend_rop_composites_over_existing_pixels() {
        let ctx = Context::new();
        let mut s = Surface::new(64, 64).unwrap();
        s.fill(Color(0xff00_00ff));
        // half transparent premultiplied red
        let mut r = flat(0x8080_0000);
        r.draw(&ctx, &mut s, Rop::Blend, None).unwrap();
        let px = s.pixel(5, 5).0;
        assert_eq!(px >> 24, 0xff);
        assert_eq!((px >> 16) & 0xff, 0x80);
        assert_eq!(px & 0xff, 0x7f);
    }

    #[test]
    fn renderer_color_modulates_output() {
        let ctx = Context::new();
        let mut s = Surface::new(64, 64).unwrap();
        let mut r = flat(0xffff_ffff);
        r.set_color(Argb::new(255, 255, 0, 0));
        r.draw(&ctx, &mut s, Rop::Fill, None).unwrap();
        assert_eq!(s.pixel(1, 1).0, 0xffff_0000);
    }

    #[test]
    fn alpha_mask_weights_the_output() {
        let ctx = Context::new();
        let mut s = Surface::new(64, 64).unwrap();
        let mask = flat(0x8080_8080);
        let mut r = flat(0xffff_0000);
        r.set_mask(Some(mask.into_shared()), MaskChannel::Alpha);
        r.draw(&ctx, &mut s, Rop::Blend, None).unwrap();
        assert_eq!(s.pixel(10, 10).0, 0x8080_0000, "half alpha mask halves the pixel");
    }

    #[test]
    fn luminance_mask_uses_brightness_not_alpha() {
        let ctx = Context::new();
        let mut s = Surface::new(64, 64).unwrap();
        // opaque black: full alpha but zero luminance
        let mask = flat(0xff00_0000);
        let mut r = flat(0xffff_0000);
        r.set_mask(Some(mask.into_shared()), MaskChannel::Luminance);
        r.draw(&ctx, &mut s, Rop::Blend, None).unwrap();
        assert_eq!(s.pixel(10, 10).0, 0, "black mask blocks everything");
    }

    #[test]
    fn invisible_renderer_draws_nothing() {
        let ctx = Context::new();
        let mut s = Surface::new(32, 32).unwrap();
        let mut r = flat(0xffff_0000);
        r.set_visible(false);
        r.draw(&ctx, &mut s, Rop::Fill, None).unwrap();
        assert_eq!(s.pixel(0, 0).0, 0);
    }

    #[test]
    fn damages_merge_past_and_current_bounds() {
        let ctx = Context::new();
        let mut r = flat(0xffff_0000);
        let mut s = Surface::new(64, 64).unwrap();
        let mut boxes = Vec::new();
        r.damages(&mut |b: &IRect| boxes.push(*b));
        assert_eq!(boxes.len(), 1, "first draw damages current bounds");
        r.draw(&ctx, &mut s, Rop::Fill, None).unwrap();
        boxes.clear();
        r.damages(&mut |b: &IRect| boxes.push(*b));
        assert!(boxes.is_empty(), "unchanged renderer reports nothing");
        r.set_color(Argb::new(128, 255, 255, 255));
        boxes.clear();
        r.damages(&mut |b: &IRect| boxes.push(*b));
        assert_eq!(boxes.len(), 2, "past and current");
    }
}
