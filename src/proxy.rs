//! Indirection kinds: proxy, clipper, transition.
//!
//! None of these produce pixels of their own. A proxy forwards every call
//! to a swappable delegate, a clipper zeroes whatever its content draws
//! outside a rectangular window, and a transition cross-fades between two
//! renderers by a level in `0..=1`.
//!
//! These kinds do not compose their own transform onto their children the
//! way a compound does. The proxy and transition draw their children
//! as-is; the clipper's transform maps the window, not the content.

use std::rc::Rc;

use crate::color::interp_256;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::rect::{IRect, Rect};
use crate::renderer::{Features, Kind, RenderState, SharedRenderer};

/// Forwards everything to a delegate renderer. Consumers keep a stable
/// reference to the proxy while the target underneath gets swapped.
pub struct Proxy {
    delegate: Option<SharedRenderer>,
    committed: Option<SharedRenderer>,
}

impl Proxy {
    pub fn new() -> Proxy {
        Proxy {
            delegate: None,
            committed: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Option<SharedRenderer>) {
        self.delegate = delegate;
    }

    pub fn delegate(&self) -> Option<&SharedRenderer> {
        self.delegate.as_ref()
    }
}

impl Default for Proxy {
    fn default() -> Self {
        Proxy::new()
    }
}

impl Kind for Proxy {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn features(&self) -> Features {
        match &self.delegate {
            Some(d) => d.borrow().features(),
            None => Features::empty(),
        }
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        match &self.delegate {
            Some(d) => d.borrow_mut().bounds(),
            None => Rect::empty(),
        }
    }

    fn changed(&self) -> bool {
        match (&self.delegate, &self.committed) {
            (Some(d), Some(c)) => !Rc::ptr_eq(d, c) || d.borrow().has_changed(),
            (Some(_), None) => true,
            (None, committed) => committed.is_some(),
        }
    }

    fn setup(&mut self, ctx: &Context, _state: &RenderState, area: &IRect) -> Result<()> {
        let Some(delegate) = &self.delegate else {
            return Err(Error::MissingCapability {
                renderer: "proxy",
                missing: "delegate renderer",
            });
        };
        delegate.borrow_mut().setup(ctx, area)
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        match &self.delegate {
            Some(d) => d.borrow_mut().span(y, x, dst),
            None => dst.fill(0),
        }
    }

    fn cleanup(&mut self) {
        if let Some(delegate) = &self.delegate {
            delegate.borrow_mut().cleanup();
        }
        self.committed = self.delegate.clone();
    }

    fn is_inside(&mut self, _state: &RenderState, x: f64, y: f64) -> bool {
        match &self.delegate {
            Some(d) => d.borrow_mut().is_inside(x, y),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ClipState {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Restricts a content renderer to a rectangular window. The window lives
/// in the clipper's local space; under a transform the clip becomes the
/// mapped rectangle's bounding box.
pub struct Clipper {
    content: Option<SharedRenderer>,
    current: ClipState,
    committed: Option<(ClipState, SharedRenderer)>,
    device_clip: IRect,
    content_active: bool,
}

impl Clipper {
    pub fn new(width: f64, height: f64) -> Clipper {
        Clipper {
            content: None,
            current: ClipState {
                x: 0.0,
                y: 0.0,
                width,
                height,
            },
            committed: None,
            device_clip: IRect::empty(),
            content_active: false,
        }
    }

    pub fn set_content(&mut self, content: Option<SharedRenderer>) {
        self.content = content;
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.current.x = x;
        self.current.y = y;
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.current.width = width;
        self.current.height = height;
    }

    fn window(&self) -> Rect {
        Rect::new(
            self.current.x,
            self.current.y,
            self.current.width.max(0.0),
            self.current.height.max(0.0),
        )
    }
}

impl Kind for Clipper {
    fn name(&self) -> &'static str {
        "clipper"
    }

    fn features(&self) -> Features {
        Features::TRANSLATE
            | Features::SCALE
            | Features::AFFINE
            | Features::COLORIZE
            | Features::ARGB8888
            | Features::ROP
            | Features::MASK
    }

    fn bounds(&mut self, state: &RenderState) -> Rect {
        state.transform_bounds(&self.window())
    }

    fn changed(&self) -> bool {
        match (&self.content, &self.committed) {
            (Some(c), Some((state, past))) => {
                *state != self.current || !Rc::ptr_eq(c, past) || c.borrow().has_changed()
            }
            (Some(_), None) => true,
            (None, committed) => committed.is_some(),
        }
    }

    fn setup(&mut self, ctx: &Context, state: &RenderState, area: &IRect) -> Result<()> {
        let Some(content) = &self.content else {
            return Err(Error::MissingCapability {
                renderer: "clipper",
                missing: "content renderer",
            });
        };
        let window = state.transform_bounds(&self.window()).to_outer();
        self.device_clip = area.intersection(&window);
        self.content_active = false;
        // Nothing of the window overlaps the draw; spans come out empty
        // without the content ever being prepared.
        if !self.device_clip.is_empty() {
            content.borrow_mut().setup(ctx, &self.device_clip)?;
            self.content_active = true;
        }
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let clip = self.device_clip;
        if y < clip.y || y >= clip.bottom() {
            dst.fill(0);
            return;
        }
        let Some(content) = &self.content else {
            dst.fill(0);
            return;
        };
        // The content was only prepared over the window; hand it just the
        // overlapping segment and zero the rest ourselves.
        let x1 = x + dst.len() as i32;
        let lo = clip.x.clamp(x, x1);
        let hi = clip.right().clamp(x, x1);
        let (a, b) = ((lo - x) as usize, (hi - x) as usize);
        dst[..a].fill(0);
        dst[b..].fill(0);
        if a < b {
            content.borrow_mut().span(y, lo, &mut dst[a..b]);
        }
    }

    fn cleanup(&mut self) {
        if self.content_active {
            if let Some(content) = &self.content {
                content.borrow_mut().cleanup();
            }
        }
        self.content_active = false;
        self.committed = self
            .content
            .as_ref()
            .map(|c| (self.current.clone(), c.clone()));
    }

    fn is_inside(&mut self, state: &RenderState, x: f64, y: f64) -> bool {
        if !state.transform_bounds(&self.window()).contains(x, y) {
            return false;
        }
        match &self.content {
            Some(c) => c.borrow_mut().is_inside(x, y),
            None => false,
        }
    }
}

/// Cross-fade between two renderers. Level 0 shows `from`, level 1 shows
/// `to`, anything between interpolates the premultiplied pixels.
pub struct Transition {
    from: Option<SharedRenderer>,
    to: Option<SharedRenderer>,
    level: f64,
    committed: Option<(f64, SharedRenderer, SharedRenderer)>,
    interp: u32,
    scratch: Vec<u32>,
}

impl Transition {
    pub fn new() -> Transition {
        Transition {
            from: None,
            to: None,
            level: 0.0,
            committed: None,
            interp: 0,
            scratch: Vec::new(),
        }
    }

    pub fn set_renderers(&mut self, from: SharedRenderer, to: SharedRenderer) {
        self.from = Some(from);
        self.to = Some(to);
    }

    pub fn set_level(&mut self, level: f64) {
        self.level = level;
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}

impl Default for Transition {
    fn default() -> Self {
        Transition::new()
    }
}

impl Kind for Transition {
    fn name(&self) -> &'static str {
        "transition"
    }

    fn features(&self) -> Features {
        Features::COLORIZE | Features::ARGB8888 | Features::ROP | Features::MASK
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        let mut bounds = Rect::empty();
        if let Some(from) = &self.from {
            bounds = bounds.union(&from.borrow_mut().bounds());
        }
        if let Some(to) = &self.to {
            bounds = bounds.union(&to.borrow_mut().bounds());
        }
        bounds
    }

    fn changed(&self) -> bool {
        let (Some(from), Some(to)) = (&self.from, &self.to) else {
            return self.committed.is_some();
        };
        match &self.committed {
            Some((level, f, t)) => {
                *level != self.level
                    || !Rc::ptr_eq(from, f)
                    || !Rc::ptr_eq(to, t)
                    || from.borrow().has_changed()
                    || to.borrow().has_changed()
            }
            None => true,
        }
    }

    fn setup(&mut self, ctx: &Context, _state: &RenderState, area: &IRect) -> Result<()> {
        let (Some(from), Some(to)) = (&self.from, &self.to) else {
            return Err(Error::MissingCapability {
                renderer: "transition",
                missing: "from and to renderers",
            });
        };
        from.borrow_mut().setup(ctx, area)?;
        if let Err(e) = to.borrow_mut().setup(ctx, area) {
            from.borrow_mut().cleanup();
            return Err(e);
        }
        self.interp = (self.level.clamp(0.0, 1.0) * 256.0).round() as u32;
        self.scratch.resize(area.w as usize, 0);
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let (Some(from), Some(to)) = (&self.from, &self.to) else {
            dst.fill(0);
            return;
        };
        from.borrow_mut().span(y, x, dst);
        let n = dst.len();
        to.borrow_mut().span(y, x, &mut self.scratch[..n]);
        for (d, s) in dst.iter_mut().zip(&self.scratch[..n]) {
            *d = interp_256(self.interp, *s, *d);
        }
    }

    fn cleanup(&mut self) {
        if let Some(from) = &self.from {
            from.borrow_mut().cleanup();
        }
        if let Some(to) = &self.to {
            to.borrow_mut().cleanup();
        }
        if let (Some(from), Some(to)) = (&self.from, &self.to) {
            self.committed = Some((self.level, from.clone(), to.clone()));
        }
    }

    fn is_inside(&mut self, _state: &RenderState, x: f64, y: f64) -> bool {
        let from = self
            .from
            .as_ref()
            .is_some_and(|f| f.borrow_mut().is_inside(x, y));
        from || self
            .to
            .as_ref()
            .is_some_and(|t| t.borrow_mut().is_inside(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Argb;
    use crate::compositor::Rop;
    use crate::compound::Compound;
    use crate::renderer::{Render, Renderer};
    use crate::shapes::Rectangle;
    use crate::surface::Surface;

    fn rect_child(x: f64, y: f64, w: f64, h: f64, color: Argb) -> SharedRenderer {
        let mut kind = Rectangle::new(x, y, w, h);
        kind.shape_mut().set_fill_color(color);
        Renderer::new(kind).into_shared()
    }

    #[test]
    fn proxy_draws_its_delegate() {
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let mut proxy = Proxy::new();
        proxy.set_delegate(Some(rect_child(
            0.0,
            0.0,
            8.0,
            8.0,
            Argb::new(0xff, 0xff, 0x00, 0x00),
        )));
        let mut r = Renderer::new(proxy);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(4, 4).0, 0xffff_0000);
    }

    #[test]
    fn proxy_without_delegate_refuses_setup() {
        let ctx = Context::new();
        let mut r = Renderer::new(Proxy::new());
        // Empty bounds make draw() a no-op, so poke setup directly.
        let err = Render::setup(&mut r, &ctx, &IRect::new(0, 0, 8, 8));
        assert!(matches!(err, Err(Error::MissingCapability { .. })));
    }

    #[test]
    fn swapping_the_delegate_reports_change() {
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let red = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0xff, 0x00, 0x00));
        let blue = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0x00, 0x00, 0xff));
        let mut proxy = Proxy::new();
        proxy.set_delegate(Some(red));
        let mut r = Renderer::new(proxy);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert!(!r.has_changed());
        r.kind_mut().set_delegate(Some(blue));
        assert!(r.has_changed());
    }

    #[test]
    fn clipper_draw_stays_inside_the_window() {
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let mut clipper = Clipper::new(4.0, 4.0);
        clipper.set_position(2.0, 2.0);
        clipper.set_content(Some(rect_child(
            0.0,
            0.0,
            8.0,
            8.0,
            Argb::new(0xff, 0xff, 0x00, 0x00),
        )));
        let mut r = Renderer::new(clipper);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(3, 3).0, 0xffff_0000);
        assert_eq!(surface.pixel(1, 1).0, 0);
        assert_eq!(surface.pixel(6, 6).0, 0);
    }

    #[test]
    fn clipper_zeroes_spans_wider_than_the_window() {
        // Inside a compound the parent asks for full-width spans; pixels
        // outside the window must come back transparent, not stale.
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let mut clipper = Clipper::new(4.0, 4.0);
        clipper.set_position(2.0, 2.0);
        clipper.set_content(Some(rect_child(
            0.0,
            0.0,
            8.0,
            8.0,
            Argb::new(0xff, 0xff, 0x00, 0x00),
        )));
        let mut compound = Compound::new();
        compound.add_layer(
            rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0x00, 0x00, 0xff)),
            Rop::Fill,
        );
        compound.add_layer(Renderer::new(clipper).into_shared(), Rop::Blend);
        let mut r = Renderer::new(compound);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(3, 3).0, 0xffff_0000, "inside the window");
        assert_eq!(surface.pixel(1, 3).0, 0xff00_00ff, "left of the window");
        assert_eq!(surface.pixel(3, 7).0, 0xff00_00ff, "below the window");
    }

    #[test]
    fn clipper_window_follows_the_transform() {
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let mut clipper = Clipper::new(4.0, 4.0);
        clipper.set_content(Some(rect_child(
            0.0,
            0.0,
            8.0,
            8.0,
            Argb::new(0xff, 0xff, 0x00, 0x00),
        )));
        let mut r = Renderer::new(clipper);
        r.set_origin(2.0, 2.0);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(3, 3).0, 0xffff_0000);
        assert_eq!(surface.pixel(1, 1).0, 0);
    }

    #[test]
    fn clipper_resize_reports_change() {
        let ctx = Context::new();
        let mut surface = Surface::new(8, 8).unwrap();
        let mut clipper = Clipper::new(4.0, 4.0);
        clipper.set_content(Some(rect_child(
            0.0,
            0.0,
            8.0,
            8.0,
            Argb::new(0xff, 0xff, 0x00, 0x00),
        )));
        let mut r = Renderer::new(clipper);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert!(!r.has_changed());
        r.kind_mut().set_size(6.0, 6.0);
        assert!(r.has_changed());
    }

    #[test]
    fn transition_endpoints_show_through_at_the_extremes() {
        let ctx = Context::new();
        let from = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0xff, 0x00, 0x00));
        let to = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0x00, 0x00, 0xff));

        let mut surface = Surface::new(8, 8).unwrap();
        let mut t = Transition::new();
        t.set_renderers(from.clone(), to.clone());
        let mut r = Renderer::new(t);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(4, 4).0, 0xffff_0000, "level 0 is `from`");

        r.kind_mut().set_level(1.0);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert_eq!(surface.pixel(4, 4).0, 0xff00_00ff, "level 1 is `to`");
    }

    #[test]
    fn transition_midpoint_mixes_both() {
        let ctx = Context::new();
        let from = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0xff, 0x00, 0x00));
        let to = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0x00, 0x00, 0xff));
        let mut surface = Surface::new(8, 8).unwrap();
        let mut t = Transition::new();
        t.set_renderers(from, to);
        t.set_level(0.5);
        let mut r = Renderer::new(t);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        let px = surface.pixel(4, 4).0;
        assert_eq!(px >> 24, 0xff);
        assert!(((px >> 16) & 0xff) >= 0x70 && ((px >> 16) & 0xff) <= 0x90);
        assert!((px & 0xff) >= 0x70 && (px & 0xff) <= 0x90);
    }

    #[test]
    fn transition_level_change_flags_redraw() {
        let ctx = Context::new();
        let from = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0xff, 0x00, 0x00));
        let to = rect_child(0.0, 0.0, 8.0, 8.0, Argb::new(0xff, 0x00, 0x00, 0xff));
        let mut surface = Surface::new(8, 8).unwrap();
        let mut t = Transition::new();
        t.set_renderers(from, to);
        t.set_level(0.3);
        let mut r = Renderer::new(t);
        r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
        assert!(!r.has_changed());
        r.kind_mut().set_level(0.6);
        assert!(r.has_changed());
    }

    #[test]
    fn transition_without_endpoints_refuses_setup() {
        let ctx = Context::new();
        let mut r = Renderer::new(Transition::new());
        let err = Render::setup(&mut r, &ctx, &IRect::new(0, 0, 8, 8));
        assert!(matches!(err, Err(Error::MissingCapability { .. })));
    }
}
