//! Gradient paints.
//!
//! Both gradients resolve their stop list into a 256-entry premultiplied
//! table at setup time; per pixel they compute a position along the
//! gradient axis, fold it through the spread mode and index the table.
//! Positions come from the row sampler, so gradients follow any invertible
//! transform including projective ones.

use crate::color::{interp_256, Argb, Color};
use crate::context::Context;
use crate::coord::RowSampler;
use crate::error::{Error, Result};
use crate::rect::{IRect, Rect};
use crate::renderer::{Features, Kind, RenderState};

/// One color at a position along the gradient, `offset` in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Argb,
}

/// What happens outside the `0..=1` gradient range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Spread {
    /// Clamp to the end colors.
    #[default]
    Pad,
    /// Tile the gradient.
    Repeat,
    /// Tile with every other copy mirrored.
    Reflect,
    /// Transparent outside the range.
    Restrict,
}

const LUT_LEN: usize = 256;

/// Premultiplied color table resolved from sorted stops.
fn build_lut(stops: &[GradientStop], lut: &mut [u32; LUT_LEN]) {
    if stops.is_empty() {
        lut.fill(0);
        return;
    }
    let mut sorted: Vec<GradientStop> = stops.to_vec();
    sorted.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    for s in &mut sorted {
        s.offset = s.offset.clamp(0.0, 1.0);
    }

    let mut hi = 0;
    for (i, entry) in lut.iter_mut().enumerate() {
        let t = i as f64 / (LUT_LEN - 1) as f64;
        while hi < sorted.len() && sorted[hi].offset < t {
            hi += 1;
        }
        *entry = if hi == 0 {
            Color::from(sorted[0].color).0
        } else if hi == sorted.len() {
            Color::from(sorted[sorted.len() - 1].color).0
        } else {
            let s0 = sorted[hi - 1];
            let s1 = sorted[hi];
            let span = s1.offset - s0.offset;
            if span <= 0.0 {
                Color::from(s1.color).0
            } else {
                let u = (t - s0.offset) / span;
                let a = ((1.0 - u) * 256.0).round() as u32;
                interp_256(a, Color::from(s0.color).0, Color::from(s1.color).0)
            }
        };
    }
}

/// Table index for a gradient position, `None` when the spread mode makes
/// the pixel transparent.
fn spread_index(spread: Spread, t: f64) -> Option<usize> {
    let clamped = match spread {
        Spread::Pad => t.clamp(0.0, 1.0),
        Spread::Repeat => t.rem_euclid(1.0),
        Spread::Reflect => {
            let p = t.rem_euclid(2.0);
            if p > 1.0 {
                2.0 - p
            } else {
                p
            }
        }
        Spread::Restrict => {
            if !(0.0..=1.0).contains(&t) {
                return None;
            }
            t
        }
    };
    Some((clamped * (LUT_LEN - 1) as f64).round() as usize)
}

fn gradient_features() -> Features {
    Features::AFFINE
        | Features::PROJECTIVE
        | Features::COLORIZE
        | Features::ARGB8888
        | Features::ROP
        | Features::MASK
}

#[derive(Clone, PartialEq)]
struct LinearState {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    spread: Spread,
    stops: Vec<GradientStop>,
}

/// Linear gradient between two local-space points.
pub struct LinearGradient {
    current: LinearState,
    committed: Option<LinearState>,
    lut: [u32; LUT_LEN],
    sampler: Option<RowSampler>,
    // axis projection, set up per draw
    dx: f64,
    dy: f64,
    inv_len2: f64,
}

impl LinearGradient {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> LinearGradient {
        LinearGradient {
            current: LinearState {
                x0,
                y0,
                x1,
                y1,
                spread: Spread::default(),
                stops: Vec::new(),
            },
            committed: None,
            lut: [0; LUT_LEN],
            sampler: None,
            dx: 0.0,
            dy: 0.0,
            inv_len2: 0.0,
        }
    }

    pub fn set_axis(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.current.x0 = x0;
        self.current.y0 = y0;
        self.current.x1 = x1;
        self.current.y1 = y1;
    }

    pub fn set_spread(&mut self, spread: Spread) {
        self.current.spread = spread;
    }

    pub fn add_stop(&mut self, offset: f64, color: Argb) {
        self.current.stops.push(GradientStop { offset, color });
    }

    pub fn clear_stops(&mut self) {
        self.current.stops.clear();
    }
}

impl Kind for LinearGradient {
    fn name(&self) -> &'static str {
        "gradient_linear"
    }

    fn features(&self) -> Features {
        gradient_features()
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        Rect::infinite()
    }

    fn changed(&self) -> bool {
        self.committed.as_ref() != Some(&self.current)
    }

    fn setup(&mut self, _ctx: &Context, state: &RenderState, _area: &IRect) -> Result<()> {
        if self.current.stops.is_empty() {
            return Err(Error::MissingCapability {
                renderer: self.name(),
                missing: "gradient stops",
            });
        }
        let dx = self.current.x1 - self.current.x0;
        let dy = self.current.y1 - self.current.y0;
        let len2 = dx * dx + dy * dy;
        if len2 <= 0.0 {
            return Err(Error::MissingCapability {
                renderer: self.name(),
                missing: "nonzero gradient axis",
            });
        }
        build_lut(&self.current.stops, &mut self.lut);
        self.sampler = Some(state.sampler(self.name())?);
        self.dx = dx;
        self.dy = dy;
        self.inv_len2 = 1.0 / len2;
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let Some(sampler) = &self.sampler else {
            dst.fill(0);
            return;
        };
        let spread = self.current.spread;
        let (ox, oy) = (self.current.x0, self.current.y0);
        for (px, (lx, ly)) in dst.iter_mut().zip(sampler.row(x, y)) {
            let t = ((lx.to_f64() - ox) * self.dx + (ly.to_f64() - oy) * self.dy) * self.inv_len2;
            *px = match spread_index(spread, t) {
                Some(i) => self.lut[i],
                None => 0,
            };
        }
    }

    fn cleanup(&mut self) {
        self.sampler = None;
        self.committed = Some(self.current.clone());
    }
}

#[derive(Clone, PartialEq)]
struct RadialState {
    cx: f64,
    cy: f64,
    radius: f64,
    spread: Spread,
    stops: Vec<GradientStop>,
}

/// Radial gradient from a center out to `radius`.
pub struct RadialGradient {
    current: RadialState,
    committed: Option<RadialState>,
    lut: [u32; LUT_LEN],
    sampler: Option<RowSampler>,
    inv_radius: f64,
}

impl RadialGradient {
    pub fn new(cx: f64, cy: f64, radius: f64) -> RadialGradient {
        RadialGradient {
            current: RadialState {
                cx,
                cy,
                radius,
                spread: Spread::default(),
                stops: Vec::new(),
            },
            committed: None,
            lut: [0; LUT_LEN],
            sampler: None,
            inv_radius: 0.0,
        }
    }

    pub fn set_center(&mut self, cx: f64, cy: f64) {
        self.current.cx = cx;
        self.current.cy = cy;
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.current.radius = radius;
    }

    pub fn set_spread(&mut self, spread: Spread) {
        self.current.spread = spread;
    }

    pub fn add_stop(&mut self, offset: f64, color: Argb) {
        self.current.stops.push(GradientStop { offset, color });
    }

    pub fn clear_stops(&mut self) {
        self.current.stops.clear();
    }
}

impl Kind for RadialGradient {
    fn name(&self) -> &'static str {
        "gradient_radial"
    }

    fn features(&self) -> Features {
        gradient_features()
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        Rect::infinite()
    }

    fn changed(&self) -> bool {
        self.committed.as_ref() != Some(&self.current)
    }

    fn setup(&mut self, _ctx: &Context, state: &RenderState, _area: &IRect) -> Result<()> {
        if self.current.stops.is_empty() {
            return Err(Error::MissingCapability {
                renderer: self.name(),
                missing: "gradient stops",
            });
        }
        if self.current.radius <= 0.0 {
            return Err(Error::MissingCapability {
                renderer: self.name(),
                missing: "positive radius",
            });
        }
        build_lut(&self.current.stops, &mut self.lut);
        self.sampler = Some(state.sampler(self.name())?);
        self.inv_radius = 1.0 / self.current.radius;
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let Some(sampler) = &self.sampler else {
            dst.fill(0);
            return;
        };
        let spread = self.current.spread;
        let (cx, cy) = (self.current.cx, self.current.cy);
        for (px, (lx, ly)) in dst.iter_mut().zip(sampler.row(x, y)) {
            let ddx = lx.to_f64() - cx;
            let ddy = ly.to_f64() - cy;
            let t = (ddx * ddx + ddy * ddy).sqrt() * self.inv_radius;
            *px = match spread_index(spread, t) {
                Some(i) => self.lut[i],
                None => 0,
            };
        }
    }

    fn cleanup(&mut self) {
        self.sampler = None;
        self.committed = Some(self.current.clone());
    }
}
