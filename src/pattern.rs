//! Flat and tiling procedural paints.
//!
//! Background paints a single color. Stripes, checker and grid tile the
//! plane in local space and follow the renderer transform through the row
//! sampler. Stripes and checker soften the band edge over one local unit
//! with a linear mix; the grid keeps hard edges.

use crate::color::{interp_256, Argb, Color};
use crate::context::Context;
use crate::coord::RowSampler;
use crate::error::Result;
use crate::rect::{IRect, Rect};
use crate::renderer::{Features, Kind, RenderState};

fn pattern_features() -> Features {
    Features::AFFINE
        | Features::PROJECTIVE
        | Features::COLORIZE
        | Features::ARGB8888
        | Features::ROP
        | Features::MASK
}

/// One flat color over everything.
pub struct Background {
    color: Argb,
    committed: Option<Argb>,
    premul: Color,
}

impl Background {
    pub fn new(color: Argb) -> Background {
        Background {
            color,
            committed: None,
            premul: Color::WHITE,
        }
    }

    pub fn set_color(&mut self, color: Argb) {
        self.color = color;
    }

    pub fn color(&self) -> Argb {
        self.color
    }
}

impl Kind for Background {
    fn name(&self) -> &'static str {
        "background"
    }

    fn features(&self) -> Features {
        // Any transform maps a constant onto itself.
        pattern_features() | Features::TRANSLATE | Features::SCALE
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        Rect::infinite()
    }

    fn changed(&self) -> bool {
        self.committed != Some(self.color)
    }

    fn setup(&mut self, _ctx: &Context, _state: &RenderState, _area: &IRect) -> Result<()> {
        self.premul = Color::from(self.color);
        Ok(())
    }

    fn span(&mut self, _y: i32, _x: i32, dst: &mut [u32]) {
        dst.fill(self.premul.0);
    }

    fn cleanup(&mut self) {
        self.committed = Some(self.color);
    }
}

/// Two-color mix weighted by how far `edge` sits inside the band; within
/// one unit of the boundary the colors blend linearly.
fn edge_mix(edge: f64, inside: u32, outside: u32) -> u32 {
    if edge >= 1.0 {
        inside
    } else {
        interp_256((edge * 256.0).round() as u32, inside, outside)
    }
}

#[derive(Clone, Copy, PartialEq)]
struct StripesState {
    even: Argb,
    odd: Argb,
    even_thickness: f64,
    odd_thickness: f64,
}

/// Horizontal bands of two alternating colors in local space.
pub struct Stripes {
    current: StripesState,
    committed: Option<StripesState>,
    sampler: Option<RowSampler>,
    even: u32,
    odd: u32,
}

impl Stripes {
    pub fn new(even: Argb, odd: Argb, even_thickness: f64, odd_thickness: f64) -> Stripes {
        Stripes {
            current: StripesState {
                even,
                odd,
                even_thickness: even_thickness.max(1.0),
                odd_thickness: odd_thickness.max(1.0),
            },
            committed: None,
            sampler: None,
            even: 0,
            odd: 0,
        }
    }

    pub fn set_colors(&mut self, even: Argb, odd: Argb) {
        self.current.even = even;
        self.current.odd = odd;
    }

    /// Band heights in local units, floored at one.
    pub fn set_thickness(&mut self, even: f64, odd: f64) {
        self.current.even_thickness = even.max(1.0);
        self.current.odd_thickness = odd.max(1.0);
    }
}

impl Kind for Stripes {
    fn name(&self) -> &'static str {
        "stripes"
    }

    fn features(&self) -> Features {
        pattern_features()
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        Rect::infinite()
    }

    fn changed(&self) -> bool {
        self.committed != Some(self.current)
    }

    fn setup(&mut self, _ctx: &Context, state: &RenderState, _area: &IRect) -> Result<()> {
        self.sampler = Some(state.sampler(self.name())?);
        self.even = Color::from(self.current.even).0;
        self.odd = Color::from(self.current.odd).0;
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let Some(sampler) = &self.sampler else {
            dst.fill(0);
            return;
        };
        let t0 = self.current.even_thickness;
        let period = t0 + self.current.odd_thickness;
        for (px, (_, ly)) in dst.iter_mut().zip(sampler.row(x, y)) {
            let m = ly.to_f64().rem_euclid(period);
            *px = if m < t0 {
                edge_mix(t0 - m, self.even, self.odd)
            } else {
                edge_mix(period - m, self.odd, self.even)
            };
        }
    }

    fn cleanup(&mut self) {
        self.sampler = None;
        self.committed = Some(self.current);
    }
}

#[derive(Clone, Copy, PartialEq)]
struct CheckerState {
    even: Argb,
    odd: Argb,
    width: f64,
    height: f64,
}

/// Checkerboard of two colors, cells `width` by `height` in local space.
pub struct Checker {
    current: CheckerState,
    committed: Option<CheckerState>,
    sampler: Option<RowSampler>,
    even: u32,
    odd: u32,
}

impl Checker {
    pub fn new(even: Argb, odd: Argb, width: f64, height: f64) -> Checker {
        Checker {
            current: CheckerState {
                even,
                odd,
                width: width.max(1.0),
                height: height.max(1.0),
            },
            committed: None,
            sampler: None,
            even: 0,
            odd: 0,
        }
    }

    pub fn set_colors(&mut self, even: Argb, odd: Argb) {
        self.current.even = even;
        self.current.odd = odd;
    }

    pub fn set_cell_size(&mut self, width: f64, height: f64) {
        self.current.width = width.max(1.0);
        self.current.height = height.max(1.0);
    }
}

impl Kind for Checker {
    fn name(&self) -> &'static str {
        "checker"
    }

    fn features(&self) -> Features {
        pattern_features()
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        Rect::infinite()
    }

    fn changed(&self) -> bool {
        self.committed != Some(self.current)
    }

    fn setup(&mut self, _ctx: &Context, state: &RenderState, _area: &IRect) -> Result<()> {
        self.sampler = Some(state.sampler(self.name())?);
        self.even = Color::from(self.current.even).0;
        self.odd = Color::from(self.current.odd).0;
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let Some(sampler) = &self.sampler else {
            dst.fill(0);
            return;
        };
        let (w, h) = (self.current.width, self.current.height);
        for (px, (lx, ly)) in dst.iter_mut().zip(sampler.row(x, y)) {
            let gx = (lx.to_f64() / w).floor();
            let gy = (ly.to_f64() / h).floor();
            let (a, b) = if ((gx + gy) as i64) & 1 == 0 {
                (self.even, self.odd)
            } else {
                (self.odd, self.even)
            };
            // Soften each cell edge independently, then combine.
            let fxd = lx.to_f64() - gx * w;
            let fyd = ly.to_f64() - gy * h;
            let cx = edge_mix(fxd.min(w - fxd), a, b);
            let cy = edge_mix(fyd.min(h - fyd), a, b);
            *px = if fxd.min(w - fxd) < fyd.min(h - fyd) {
                cx
            } else {
                cy
            };
        }
    }

    fn cleanup(&mut self) {
        self.sampler = None;
        self.committed = Some(self.current);
    }
}

#[derive(Clone, Copy, PartialEq)]
struct GridState {
    cell: Argb,
    border: Argb,
    cell_width: f64,
    cell_height: f64,
    border_thickness: f64,
}

/// Cells separated by border lines. The border sits on the leading edge of
/// each cell in both axes.
pub struct Grid {
    current: GridState,
    committed: Option<GridState>,
    sampler: Option<RowSampler>,
    cell: u32,
    border: u32,
}

impl Grid {
    pub fn new(cell: Argb, border: Argb, cell_width: f64, cell_height: f64, border_thickness: f64) -> Grid {
        Grid {
            current: GridState {
                cell,
                border,
                cell_width: cell_width.max(1.0),
                cell_height: cell_height.max(1.0),
                border_thickness: border_thickness.max(1.0),
            },
            committed: None,
            sampler: None,
            cell: 0,
            border: 0,
        }
    }

    pub fn set_colors(&mut self, cell: Argb, border: Argb) {
        self.current.cell = cell;
        self.current.border = border;
    }

    pub fn set_geometry(&mut self, cell_width: f64, cell_height: f64, border_thickness: f64) {
        self.current.cell_width = cell_width.max(1.0);
        self.current.cell_height = cell_height.max(1.0);
        self.current.border_thickness = border_thickness.max(1.0);
    }
}

impl Kind for Grid {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn features(&self) -> Features {
        pattern_features()
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        Rect::infinite()
    }

    fn changed(&self) -> bool {
        self.committed != Some(self.current)
    }

    fn setup(&mut self, _ctx: &Context, state: &RenderState, _area: &IRect) -> Result<()> {
        self.sampler = Some(state.sampler(self.name())?);
        self.cell = Color::from(self.current.cell).0;
        self.border = Color::from(self.current.border).0;
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let Some(sampler) = &self.sampler else {
            dst.fill(0);
            return;
        };
        let t = self.current.border_thickness;
        let pw = self.current.cell_width + t;
        let ph = self.current.cell_height + t;
        for (px, (lx, ly)) in dst.iter_mut().zip(sampler.row(x, y)) {
            let mx = lx.to_f64().rem_euclid(pw);
            let my = ly.to_f64().rem_euclid(ph);
            *px = if mx < t || my < t {
                self.border
            } else {
                self.cell
            };
        }
    }

    fn cleanup(&mut self) {
        self.sampler = None;
        self.committed = Some(self.current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Argb = Argb(0xffff_0000);
    const BLUE: Argb = Argb(0xff00_00ff);

    #[test]
    fn background_paints_premultiplied_color() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut bg = Background::new(Argb::new(0x80, 0xff, 0x00, 0x00));
        bg.setup(&ctx, &state, &IRect::new(0, 0, 4, 1)).unwrap();
        let mut row = vec![0u32; 4];
        bg.span(0, 0, &mut row);
        assert!(row.iter().all(|&px| px == 0x8080_0000));
        bg.cleanup();
        assert!(!bg.changed());
        bg.set_color(RED);
        assert!(bg.changed());
    }

    #[test]
    fn stripes_alternate_with_band_heights() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut s = Stripes::new(RED, BLUE, 4.0, 2.0);
        s.setup(&ctx, &state, &IRect::new(0, 0, 1, 12)).unwrap();
        let mut px = [0u32; 1];
        // Band interiors are pure; y in the even band up to 4, odd to 6.
        s.span(1, 0, &mut px);
        assert_eq!(px[0], RED.0);
        s.span(4, 0, &mut px);
        assert_eq!(px[0], BLUE.0);
        s.span(7, 0, &mut px);
        assert_eq!(px[0], RED.0);
        s.cleanup();
    }

    #[test]
    fn stripes_blend_at_band_boundary() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut s = Stripes::new(RED, BLUE, 4.0, 4.0);
        s.setup(&ctx, &state, &IRect::new(0, 0, 1, 8)).unwrap();
        let mut px = [0u32; 1];
        // One unit before the edge the mix is still pure red; half a unit
        // in, red and blue share the pixel.
        s.span(3, 0, &mut px);
        assert_eq!(px[0], RED.0);
        s.cleanup();
        let mut shifted = Stripes::new(RED, BLUE, 3.5, 4.5);
        shifted.setup(&ctx, &state, &IRect::new(0, 0, 1, 8)).unwrap();
        shifted.span(3, 0, &mut px);
        let r = (px[0] >> 16) & 0xff;
        let b = px[0] & 0xff;
        assert!(r > 0 && b > 0, "expected a mix, got {:#010x}", px[0]);
        shifted.cleanup();
    }

    #[test]
    fn checker_cells_alternate_in_both_axes() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut c = Checker::new(RED, BLUE, 8.0, 8.0);
        c.setup(&ctx, &state, &IRect::new(0, 0, 32, 32)).unwrap();
        let mut row = vec![0u32; 32];
        c.span(4, 0, &mut row);
        assert_eq!(row[4], RED.0);
        assert_eq!(row[12], BLUE.0);
        assert_eq!(row[20], RED.0);
        c.span(12, 0, &mut row);
        assert_eq!(row[4], BLUE.0);
        assert_eq!(row[12], RED.0);
        c.cleanup();
    }

    #[test]
    fn grid_borders_on_both_axes() {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut g = Grid::new(RED, BLUE, 6.0, 6.0, 2.0);
        g.setup(&ctx, &state, &IRect::new(0, 0, 16, 16)).unwrap();
        let mut row = vec![0u32; 16];
        // Row inside the border band: everything is border color.
        g.span(1, 0, &mut row);
        assert!(row.iter().all(|&px| px == BLUE.0));
        // Row through the cells: border columns at the period boundaries.
        g.span(4, 0, &mut row);
        assert_eq!(row[0], BLUE.0);
        assert_eq!(row[4], RED.0);
        assert_eq!(row[8], BLUE.0);
        assert_eq!(row[12], RED.0);
        g.cleanup();
    }

    #[test]
    fn patterns_follow_translation() {
        let ctx = Context::new();
        let mut state = RenderState::default();
        state.origin = (0.0, 4.0);
        let mut s = Stripes::new(RED, BLUE, 4.0, 4.0);
        s.setup(&ctx, &state, &IRect::new(0, 0, 1, 8)).unwrap();
        let mut px = [0u32; 1];
        // Device y 5 maps back to local y 1: still the even band.
        s.span(5, 0, &mut px);
        assert_eq!(px[0], RED.0);
        s.cleanup();
    }
}
