//! Layered composition kind.
//!
//! A compound draws child renderers in order, each through its own raster
//! operation. During setup every child's transform is temporarily composed
//! with the compound's own, so moving the compound moves the whole stack;
//! cleanup restores the children untouched.
//!
//! A child that fails setup unwinds the children already set up, in
//! reverse, before the error surfaces.

use crate::color::Color;
use crate::compositor::{KernelKey, Rop, SpanFn};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::matrix::Matrix;
use crate::rect::{IRect, Rect};
use crate::renderer::{Features, Kind, RenderState, SharedRenderer};

pub struct Layer {
    pub renderer: SharedRenderer,
    pub rop: Rop,
}

type SavedTransform = (Matrix, (f64, f64), (f64, f64));

struct ActiveLayer {
    index: usize,
    kernel: SpanFn,
    saved: SavedTransform,
}

pub struct Compound {
    layers: Vec<Layer>,
    version: u64,
    committed: Option<u64>,
    active: Vec<ActiveLayer>,
    scratch: Vec<u32>,
}

impl Compound {
    pub fn new() -> Compound {
        Compound {
            layers: Vec::new(),
            version: 0,
            committed: None,
            active: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn add_layer(&mut self, renderer: SharedRenderer, rop: Rop) {
        self.layers.push(Layer { renderer, rop });
        self.version += 1;
    }

    pub fn clear_layers(&mut self) {
        self.layers.clear();
        self.version += 1;
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn unwind(&mut self) {
        for active in self.active.drain(..).rev() {
            let layer = &self.layers[active.index];
            layer.renderer.borrow_mut().cleanup();
            relative_unset(&layer.renderer, active.saved);
        }
    }
}

impl Default for Compound {
    fn default() -> Self {
        Compound::new()
    }
}

/// Fold the parent transform into a child's state, returning what to put
/// back afterwards.
fn relative_set(child: &SharedRenderer, parent: &Matrix) -> SavedTransform {
    let mut child = child.borrow_mut();
    let state = child.state_mut();
    let saved = (state.matrix, state.origin, state.scale);
    let composed = parent.compose(&state.full_matrix());
    state.matrix = composed;
    state.origin = (0.0, 0.0);
    state.scale = (1.0, 1.0);
    saved
}

fn relative_unset(child: &SharedRenderer, saved: SavedTransform) {
    let mut child = child.borrow_mut();
    let state = child.state_mut();
    state.matrix = saved.0;
    state.origin = saved.1;
    state.scale = saved.2;
}

impl Kind for Compound {
    fn name(&self) -> &'static str {
        "compound"
    }

    fn features(&self) -> Features {
        Features::AFFINE
            | Features::PROJECTIVE
            | Features::COLORIZE
            | Features::ARGB8888
            | Features::ROP
            | Features::MASK
    }

    fn bounds(&mut self, state: &RenderState) -> Rect {
        let full = state.full_matrix();
        let mut bounds = Rect::empty();
        for layer in &self.layers {
            if !layer.renderer.borrow().state().visible {
                continue;
            }
            let child = layer.renderer.borrow_mut().bounds();
            bounds = bounds.union(&full.map_rect(&child));
        }
        bounds
    }

    fn changed(&self) -> bool {
        self.committed != Some(self.version)
            || self
                .layers
                .iter()
                .any(|l| l.renderer.borrow().has_changed())
    }

    fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect) -> Result<()> {
        debug_assert!(self.active.is_empty(), "compound setup without cleanup");
        let parent = state.full_matrix();
        let d = Format::Argb8888Pre;
        for (index, layer) in self.layers.iter().enumerate() {
            {
                let child = layer.renderer.borrow();
                if !child.state().visible {
                    continue;
                }
                // Blending nothing is a no-op, skip the whole layer.
                if layer.rop == Rop::Blend && child.state().color.0 >> 24 == 0 {
                    continue;
                }
            }
            let rop = layer.rop;
            let Some(kernel) = ctx.compositor().span_for(KernelKey::new(rop, d).with_src(d))
            else {
                self.unwind();
                return Err(Error::MissingKernel { rop, dst: d });
            };
            let saved = relative_set(&layer.renderer, &parent);
            let set_up = layer.renderer.borrow_mut().setup(ctx, area);
            if let Err(e) = set_up {
                relative_unset(&layer.renderer, saved);
                self.unwind();
                return Err(e);
            }
            self.active.push(ActiveLayer {
                index,
                kernel,
                saved,
            });
        }
        self.scratch.resize(area.w as usize, 0);
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        dst.fill(0);
        let n = dst.len();
        for active in &self.active {
            let layer = &self.layers[active.index];
            layer.renderer.borrow_mut().span(y, x, &mut self.scratch[..n]);
            (active.kernel)(dst, Some(&self.scratch[..n]), Color::WHITE, None);
        }
    }

    fn cleanup(&mut self) {
        for active in self.active.drain(..) {
            let layer = &self.layers[active.index];
            layer.renderer.borrow_mut().cleanup();
            relative_unset(&layer.renderer, active.saved);
        }
        self.committed = Some(self.version);
    }

    fn is_inside(&mut self, state: &RenderState, x: f64, y: f64) -> bool {
        let Some(inv) = state.full_matrix().invert() else {
            return false;
        };
        let (lx, ly) = inv.transform(x, y);
        self.layers
            .iter()
            .any(|l| l.renderer.borrow_mut().is_inside(lx, ly))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Argb;
    use crate::gradient::LinearGradient;
    use crate::renderer::{Render, Renderer};
    use crate::shapes::Rectangle;
    use crate::surface::Surface;

    fn rect_child(x: f64, y: f64, w: f64, h: f64, color: Argb) -> SharedRenderer {
        let mut kind = Rectangle::new(x, y, w, h);
        kind.shape_mut().set_fill_color(color);
        Renderer::new(kind).into_shared()
    }

    #[test]
    fn layers_draw_in_order() {
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let mut compound = Compound::new();
        compound.add_layer(
            rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0x00, 0x00, 0xff)),
            Rop::Fill,
        );
        compound.add_layer(
            rect_child(0.0, 0.0, 4.0, 8.0, Argb::new(0xff, 0xff, 0x00, 0x00)),
            Rop::Blend,
        );
        let mut r = Renderer::new(compound);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(1, 4).0, 0xffff_0000);
        assert_eq!(surface.pixel(6, 4).0, 0xff00_00ff);
    }

    #[test]
    fn compound_transform_moves_children() {
        let ctx = Context::new();
        let mut surface = Surface::new(16, 16).unwrap();
        let mut compound = Compound::new();
        compound.add_layer(
            rect_child(0.0, 0.0, 4.0, 4.0, Argb::new(0xff, 0xff, 0x00, 0x00)),
            Rop::Fill,
        );
        let mut r = Renderer::new(compound);
        r.set_origin(8.0, 8.0);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(10, 10).0, 0xffff_0000);
        assert_eq!(surface.pixel(2, 2).0, 0);
    }

    #[test]
    fn child_transforms_restored_after_draw() {
        let ctx = Context::new();
        let mut surface = Surface::new(16, 16).unwrap();
        let child = rect_child(0.0, 0.0, 4.0, 4.0, Argb::new(0xff, 0xff, 0x00, 0x00));
        let before = child.borrow().state().matrix;
        let mut compound = Compound::new();
        compound.add_layer(child.clone(), Rop::Fill);
        let mut r = Renderer::new(compound);
        r.set_origin(4.0, 0.0);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(child.borrow().state().matrix, before);
        assert_eq!(child.borrow().state().origin, (0.0, 0.0));
    }

    #[test]
    fn failing_child_unwinds_earlier_layers() {
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let good = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0x00, 0xff, 0x00));
        // A gradient without stops refuses setup.
        let bad = Renderer::new(LinearGradient::new(0.0, 0.0, 8.0, 0.0)).into_shared();
        let mut compound = Compound::new();
        compound.add_layer(good.clone(), Rop::Fill);
        compound.add_layer(bad, Rop::Blend);
        let mut r = Renderer::new(compound);
        let err = r.draw(&ctx, &mut surface, Rop::Fill, None);
        assert!(err.is_err());
        // The good child's transform came back and the surface stayed put.
        assert_eq!(good.borrow().state().origin, (0.0, 0.0));
        assert_eq!(surface.pixel(4, 4).0, 0);
    }

    #[test]
    fn invisible_and_transparent_blend_layers_are_skipped() {
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let hidden = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0xff, 0x00, 0x00));
        hidden.borrow_mut().state_mut().visible = false;
        let clear = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0x00, 0xff, 0x00));
        clear.borrow_mut().state_mut().color = Argb(0);
        let mut compound = Compound::new();
        compound.add_layer(hidden, Rop::Fill);
        compound.add_layer(clear, Rop::Blend);
        let mut r = Renderer::new(compound);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(4, 4).0, 0);
    }

    #[test]
    fn change_in_child_propagates() {
        let child = rect_child(0.0, 0.0, 4.0, 4.0, Argb::new(0xff, 0xff, 0x00, 0x00));
        let mut compound = Compound::new();
        compound.add_layer(child.clone(), Rop::Fill);
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let mut r = Renderer::new(compound);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert!(!r.has_changed());
        child.borrow_mut().state_mut().color = Argb::new(0xff, 0x00, 0x00, 0xff);
        assert!(r.has_changed());
    }
}
