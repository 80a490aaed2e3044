//! Surface-backed image kind.
//!
//! Draws a shared surface under the renderer transform. Fast quality picks
//! the nearest source pixel; Good and Best interpolate the four neighbors.
//! Everything outside the source rectangle is transparent.

use std::rc::Rc;

use crate::color::interp_256;
use crate::context::Context;
use crate::coord::{Fixed, RowSampler};
use crate::error::{Error, Result};
use crate::rect::{IRect, Rect};
use crate::renderer::{Features, Kind, Quality, RenderState};
use crate::surface::{SharedSurface, Surface};

pub struct Image {
    source: Option<SharedSurface>,
    x: f64,
    y: f64,
    dirty: bool,
    committed: Option<(SharedSurface, f64, f64)>,
    sampler: Option<RowSampler>,
    quality: Quality,
}

impl Image {
    pub fn new() -> Image {
        Image {
            source: None,
            x: 0.0,
            y: 0.0,
            dirty: false,
            committed: None,
            sampler: None,
            quality: Quality::default(),
        }
    }

    pub fn set_source(&mut self, source: Option<SharedSurface>) {
        self.source = source;
    }

    /// Local-space position of the source's top-left corner.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Tell the renderer the source pixels were edited in place. Sharing
    /// hides such edits from the snapshot diff, so they must be announced.
    pub fn touch(&mut self) {
        self.dirty = true;
    }

    fn committed_matches(&self) -> bool {
        match (&self.committed, &self.source) {
            (Some((c, cx, cy)), Some(s)) => Rc::ptr_eq(c, s) && *cx == self.x && *cy == self.y,
            (None, None) => true,
            _ => false,
        }
    }
}

impl Default for Image {
    fn default() -> Self {
        Image::new()
    }
}

fn nearest(src: &Surface, ix: i64, iy: i64) -> u32 {
    if ix < 0 || iy < 0 || ix >= src.width() as i64 || iy >= src.height() as i64 {
        return 0;
    }
    src.row(iy as usize)[ix as usize]
}

fn bilinear(src: &Surface, lx: Fixed, ly: Fixed) -> u32 {
    let ix = i64::from(lx.floor());
    let iy = i64::from(ly.floor());
    let ax = 256 - (lx.frac() >> 8);
    let ay = 256 - (ly.frac() >> 8);
    let top = interp_256(ax, nearest(src, ix, iy), nearest(src, ix + 1, iy));
    let bottom = interp_256(ax, nearest(src, ix, iy + 1), nearest(src, ix + 1, iy + 1));
    interp_256(ay, top, bottom)
}

impl Kind for Image {
    fn name(&self) -> &'static str {
        "image"
    }

    fn features(&self) -> Features {
        Features::TRANSLATE
            | Features::SCALE
            | Features::AFFINE
            | Features::PROJECTIVE
            | Features::COLORIZE
            | Features::ARGB8888
            | Features::ROP
            | Features::MASK
            | Features::QUALITY
    }

    fn bounds(&mut self, state: &RenderState) -> Rect {
        match &self.source {
            Some(s) => {
                let s = s.borrow();
                let local = Rect::new(self.x, self.y, s.width() as f64, s.height() as f64);
                state.transform_bounds(&local)
            }
            None => Rect::empty(),
        }
    }

    fn changed(&self) -> bool {
        self.dirty || !self.committed_matches()
    }

    fn setup(&mut self, _ctx: &Context, state: &RenderState, _area: &IRect) -> Result<()> {
        if self.source.is_none() {
            return Err(Error::MissingCapability {
                renderer: self.name(),
                missing: "source surface",
            });
        }
        self.sampler = Some(state.sampler(self.name())?);
        self.quality = state.quality;
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let (Some(sampler), Some(source)) = (&self.sampler, &self.source) else {
            dst.fill(0);
            return;
        };
        let src = source.borrow();
        let off_x = Fixed::from_f64(self.x);
        let off_y = Fixed::from_f64(self.y);
        match self.quality {
            Quality::Fast => {
                for (px, (lx, ly)) in dst.iter_mut().zip(sampler.row(x, y)) {
                    let sx = i64::from((lx - off_x).floor());
                    let sy = i64::from((ly - off_y).floor());
                    *px = nearest(&src, sx, sy);
                }
            }
            Quality::Good | Quality::Best => {
                for (px, (lx, ly)) in dst.iter_mut().zip(sampler.row(x, y)) {
                    *px = bilinear(&src, lx - off_x, ly - off_y);
                }
            }
        }
    }

    fn cleanup(&mut self) {
        self.sampler = None;
        self.dirty = false;
        self.committed = self.source.clone().map(|s| (s, self.x, self.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    fn two_by_two() -> SharedSurface {
        let mut s = Surface::new(2, 2).unwrap();
        s.row_mut(0).copy_from_slice(&[0xffff_0000, 0xff00_ff00]);
        s.row_mut(1).copy_from_slice(&[0xff00_00ff, 0xffff_ffff]);
        s.into_shared()
    }

    #[test]
    fn identity_reproduces_source_pixels() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut img = Image::new();
        img.set_source(Some(two_by_two()));
        img.setup(&ctx, &state, &IRect::new(0, 0, 2, 2)).unwrap();
        let mut row = vec![0u32; 2];
        img.span(0, 0, &mut row);
        assert_eq!(row, vec![0xffff_0000, 0xff00_ff00]);
        img.span(1, 0, &mut row);
        assert_eq!(row, vec![0xff00_00ff, 0xffff_ffff]);
        img.cleanup();
    }

    #[test]
    fn pixels_outside_source_are_transparent() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut img = Image::new();
        img.set_source(Some(two_by_two()));
        img.setup(&ctx, &state, &IRect::new(0, 0, 4, 4)).unwrap();
        let mut row = vec![0xdead_beefu32; 4];
        img.span(0, 0, &mut row);
        assert_eq!(&row[2..], &[0, 0]);
        img.span(3, 0, &mut row);
        assert!(row.iter().all(|&px| px == 0));
        img.cleanup();
    }

    #[test]
    fn position_moves_the_image() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut img = Image::new();
        img.set_source(Some(two_by_two()));
        img.set_position(2.0, 1.0);
        img.setup(&ctx, &state, &IRect::new(0, 0, 4, 4)).unwrap();
        let mut row = vec![0u32; 4];
        img.span(1, 0, &mut row);
        assert_eq!(row, vec![0, 0, 0xffff_0000, 0xff00_ff00]);
        img.cleanup();
    }

    #[test]
    fn bilinear_blends_between_pixels() {
        let ctx = Context::new();
        let mut state = RenderState::default();
        // Shift by half a pixel so the sample lands between columns.
        state.matrix = Matrix::translate(-0.5, 0.0);
        let mut img = Image::new();
        img.set_source(Some(two_by_two()));
        img.setup(&ctx, &state, &IRect::new(0, 0, 2, 2)).unwrap();
        let mut row = vec![0u32; 1];
        img.span(0, 0, &mut row);
        let r = (row[0] >> 16) & 0xff;
        let g = (row[0] >> 8) & 0xff;
        assert!(r > 0x60 && r < 0xa0, "r {r:#x}");
        assert!(g > 0x60 && g < 0xa0, "g {g:#x}");
        img.cleanup();
    }

    #[test]
    fn fast_quality_snaps_to_nearest() {
        let ctx = Context::new();
        let mut state = RenderState::default();
        state.matrix = Matrix::translate(-0.25, 0.0);
        state.quality = Quality::Fast;
        let mut img = Image::new();
        img.set_source(Some(two_by_two()));
        img.setup(&ctx, &state, &IRect::new(0, 0, 2, 2)).unwrap();
        let mut row = vec![0u32; 1];
        img.span(0, 0, &mut row);
        assert_eq!(row[0], 0xffff_0000);
        img.cleanup();
    }

    #[test]
    fn setup_without_source_fails() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut img = Image::new();
        assert!(img.setup(&ctx, &state, &IRect::new(0, 0, 2, 2)).is_err());
    }

    #[test]
    fn touch_reports_in_place_edits() {
        let mut img = Image::new();
        img.set_source(Some(two_by_two()));
        img.cleanup();
        assert!(!img.changed());
        img.touch();
        assert!(img.changed());
    }

    #[test]
    fn swapping_source_reports_change() {
        let mut img = Image::new();
        img.set_source(Some(two_by_two()));
        img.cleanup();
        assert!(!img.changed());
        img.set_source(Some(two_by_two()));
        assert!(img.changed());
    }
}
