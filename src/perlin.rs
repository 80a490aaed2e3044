//! Gradient noise paint.
//!
//! Classic permutation-table noise summed over octaves. The table is
//! shuffled from the seed at setup, so equal seeds give equal pictures and
//! a new seed gives a new one. Output is an opaque gray ramp; color comes
//! from the renderer color the wrapper applies.

use crate::context::Context;
use crate::coord::RowSampler;
use crate::error::Result;
use crate::rect::{IRect, Rect};
use crate::renderer::{Features, Kind, RenderState};

#[derive(Clone, Copy, PartialEq)]
struct PerlinState {
    seed: u64,
    octaves: u32,
    persistence: f64,
    xfreq: f64,
    yfreq: f64,
    amplitude: f64,
}

pub struct Perlin {
    current: PerlinState,
    committed: Option<PerlinState>,
    sampler: Option<RowSampler>,
    perm: [u8; 512],
}

impl Perlin {
    pub fn new(seed: u64) -> Perlin {
        Perlin {
            current: PerlinState {
                seed,
                octaves: 1,
                persistence: 0.5,
                xfreq: 0.05,
                yfreq: 0.05,
                amplitude: 1.0,
            },
            committed: None,
            sampler: None,
            perm: [0; 512],
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.current.seed = seed;
    }

    pub fn set_octaves(&mut self, octaves: u32) {
        self.current.octaves = octaves.clamp(1, 16);
    }

    pub fn set_persistence(&mut self, persistence: f64) {
        self.current.persistence = persistence;
    }

    pub fn set_frequency(&mut self, xfreq: f64, yfreq: f64) {
        self.current.xfreq = xfreq;
        self.current.yfreq = yfreq;
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.current.amplitude = amplitude;
    }

    fn shuffle(&mut self) {
        let mut table: [u8; 256] = [0; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        // xorshift* keeps the shuffle reproducible across platforms
        let mut s = self.current.seed | 1;
        let mut rand = move || {
            s ^= s >> 12;
            s ^= s << 25;
            s ^= s >> 27;
            s.wrapping_mul(0x2545_f491_4f6c_dd1d)
        };
        for i in (1..256).rev() {
            let j = (rand() % (i as u64 + 1)) as usize;
            table.swap(i, j);
        }
        for i in 0..256 {
            self.perm[i] = table[i];
            self.perm[i + 256] = table[i];
        }
    }

    fn noise2(&self, x: f64, y: f64) -> f64 {
        let xi = x.floor() as i64;
        let yi = y.floor() as i64;
        let xf = x - xi as f64;
        let yf = y - yi as f64;
        let xw = (xi & 255) as usize;
        let yw = (yi & 255) as usize;

        let u = fade(xf);
        let v = fade(yf);

        let p = &self.perm;
        let aa = p[p[xw] as usize + yw] as usize;
        let ab = p[p[xw] as usize + yw + 1] as usize;
        let ba = p[p[xw + 1] as usize + yw] as usize;
        let bb = p[p[xw + 1] as usize + yw + 1] as usize;

        let x1 = lerp(u, grad(aa, xf, yf), grad(ba, xf - 1.0, yf));
        let x2 = lerp(u, grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0));
        lerp(v, x1, x2)
    }

    fn fractal(&self, x: f64, y: f64) -> f64 {
        let mut total = 0.0;
        let mut freq = 1.0;
        let mut amp = self.current.amplitude;
        let mut norm = 0.0;
        for _ in 0..self.current.octaves {
            total += self.noise2(x * freq, y * freq) * amp;
            norm += amp;
            freq *= 2.0;
            amp *= self.current.persistence;
        }
        if norm > 0.0 {
            total / norm
        } else {
            0.0
        }
    }
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Hash-selected gradient dot product for one lattice corner.
fn grad(hash: usize, x: f64, y: f64) -> f64 {
    match hash & 3 {
        0 => x + y,
        1 => -x + y,
        2 => x - y,
        _ => -x - y,
    }
}

impl Kind for Perlin {
    fn name(&self) -> &'static str {
        "perlin"
    }

    fn features(&self) -> Features {
        Features::AFFINE
            | Features::PROJECTIVE
            | Features::COLORIZE
            | Features::ARGB8888
            | Features::ROP
            | Features::MASK
    }

    fn bounds(&mut self, _state: &RenderState) -> Rect {
        Rect::infinite()
    }

    fn changed(&self) -> bool {
        self.committed != Some(self.current)
    }

    fn setup(&mut self, _ctx: &Context, state: &RenderState, _area: &IRect) -> Result<()> {
        self.shuffle();
        self.sampler = Some(state.sampler(self.name())?);
        Ok(())
    }

    fn span(&mut self, y: i32, x: i32, dst: &mut [u32]) {
        let Some(sampler) = &self.sampler else {
            dst.fill(0);
            return;
        };
        let (fx, fy) = (self.current.xfreq, self.current.yfreq);
        for (px, (lx, ly)) in dst.iter_mut().zip(sampler.row(x, y)) {
            let n = self.fractal(lx.to_f64() * fx, ly.to_f64() * fy);
            // [-1, 1] onto an opaque gray ramp
            let v = (((n + 1.0) * 0.5).clamp(0.0, 1.0) * 255.0).round() as u32;
            *px = 0xff00_0000 | (v << 16) | (v << 8) | v;
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

    fn render_row(seed: u64, y: i32) -> Vec<u32> {
        let ctx = Context::new();
        let state = RenderState::default();
        let mut p = Perlin::new(seed);
        p.set_frequency(0.11, 0.11);
        p.setup(&ctx, &state, &IRect::new(0, 0, 64, 64)).unwrap();
        let mut row = vec![0u32; 64];
        p.span(y, 0, &mut row);
        p.cleanup();
        row
    }

    #[test]
    fn equal_seeds_reproduce_equal_noise() {
        assert_eq!(render_row(7, 10), render_row(7, 10));
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(render_row(7, 10), render_row(8, 10));
    }

    #[test]
    fn output_is_opaque_gray() {
        for px in render_row(3, 5) {
            assert_eq!(px >> 24, 0xff);
            let r = (px >> 16) & 0xff;
            let g = (px >> 8) & 0xff;
            let b = px & 0xff;
            assert!(r == g && g == b);
        }
    }

    #[test]
    fn noise_is_not_constant() {
        let row = render_row(3, 5);
        assert!(row.iter().any(|&px| px != row[0]));
    }

    #[test]
    fn lattice_points_are_zero() {
        let mut p = Perlin::new(42);
        p.shuffle();
        // Gradient noise vanishes on the integer lattice.
        assert!(p.noise2(3.0, 7.0).abs() < 1e-12);
        assert!(p.noise2(0.0, 0.0).abs() < 1e-12);
    }

    #[test]
    fn octave_change_flags_rerender() {
        let mut p = Perlin::new(1);
        assert!(p.changed());
        p.cleanup();
        assert!(!p.changed());
        p.set_octaves(4);
        assert!(p.changed());
    }
}
