//! 16.16 fixed-point coordinates and per-row source samplers
//!
//! Paint renderers walk every destination row through a [`RowSampler`],
//! which maps device pixels into the renderer's local space using the
//! *inverse* of the render-state transform. Three strategies exist:
//!
//! - identity: integer offsets only, no arithmetic per pixel
//! - affine: one fixed-point add per axis per pixel
//! - projective: fixed-point homogeneous accumulation and one 64-bit
//!   division per pixel
//!
//! Sampling happens at integer device coordinates. A pure translation by
//! whole pixels degrades to the identity strategy; a fractional one stays
//! affine so subpixel filtering keeps working.

use crate::matrix::{Matrix, MatrixKind};

pub const FIXED_SHIFT: i32 = 16;
pub const FIXED_ONE: i32 = 1 << FIXED_SHIFT;

/// Signed 16.16 fixed-point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fixed(pub i32);

impl Fixed {
    pub fn from_f64(v: f64) -> Fixed {
        Fixed((v * FIXED_ONE as f64).round() as i32)
    }
    pub fn from_int(v: i32) -> Fixed {
        Fixed(v << FIXED_SHIFT)
    }
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / FIXED_ONE as f64
    }
    /// Integer part, rounding toward negative infinity.
    pub fn floor(self) -> i32 {
        self.0 >> FIXED_SHIFT
    }
    /// Fractional part as 0..65536.
    pub fn frac(self) -> u32 {
        (self.0 & (FIXED_ONE - 1)) as u32
    }
    fn saturate(v: i64) -> Fixed {
        Fixed(v.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }
}

impl std::ops::Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(rhs.0))
    }
}

impl std::ops::Sub for Fixed {
    type Output = Fixed;
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(rhs.0))
    }
}

/// Device-to-local mapping for one renderer, fixed at setup time.
#[derive(Debug, Clone, Copy)]
pub enum RowSampler {
    Identity { ox: i32, oy: i32 },
    Affine(AffineStep),
    Projective(ProjectiveStep),
}

#[derive(Debug, Clone, Copy)]
pub struct AffineStep {
    xx: i64,
    xy: i64,
    xz: i64,
    yx: i64,
    yy: i64,
    yz: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectiveStep {
    xx: i64,
    xy: i64,
    xz: i64,
    yx: i64,
    yy: i64,
    yz: i64,
    zx: i64,
    zy: i64,
    zz: i64,
}

fn fx(v: f64) -> i64 {
    (v * FIXED_ONE as f64).round() as i64
}

impl RowSampler {
    /// Build from the inverse of the full device transform (origin folded
    /// in by the caller).
    pub fn from_inverse(inv: &Matrix) -> RowSampler {
        match inv.kind() {
            MatrixKind::Identity => RowSampler::Identity { ox: 0, oy: 0 },
            MatrixKind::Affine => {
                let translation_only = (inv.xx - 1.0).abs() < 1e-9
                    && inv.xy.abs() < 1e-9
                    && inv.yx.abs() < 1e-9
                    && (inv.yy - 1.0).abs() < 1e-9;
                let whole = (inv.xz - inv.xz.round()).abs() < 1e-9
                    && (inv.yz - inv.yz.round()).abs() < 1e-9;
                if translation_only && whole {
                    RowSampler::Identity {
                        ox: inv.xz.round() as i32,
                        oy: inv.yz.round() as i32,
                    }
                } else {
                    RowSampler::Affine(AffineStep {
                        xx: fx(inv.xx),
                        xy: fx(inv.xy),
                        xz: fx(inv.xz),
                        yx: fx(inv.yx),
                        yy: fx(inv.yy),
                        yz: fx(inv.yz),
                    })
                }
            }
            MatrixKind::Projective => RowSampler::Projective(ProjectiveStep {
                xx: fx(inv.xx),
                xy: fx(inv.xy),
                xz: fx(inv.xz),
                yx: fx(inv.yx),
                yy: fx(inv.yy),
                yz: fx(inv.yz),
                zx: fx(inv.zx),
                zy: fx(inv.zy),
                zz: fx(inv.zz),
            }),
        }
    }

    /// Iterator over local coordinates for the destination row starting at
    /// `(x, y)`, one item per destination pixel, never exhausted.
    pub fn row(&self, x: i32, y: i32) -> RowIter {
        match *self {
            RowSampler::Identity { ox, oy } => RowIter::Identity { sx: x + ox, sy: y + oy },
            RowSampler::Affine(a) => RowIter::Affine {
                x: a.xx * x as i64 + a.xy * y as i64 + a.xz,
                y: a.yx * x as i64 + a.yy * y as i64 + a.yz,
                dx: a.xx,
                dy: a.yx,
            },
            RowSampler::Projective(p) => RowIter::Projective {
                x: p.xx * x as i64 + p.xy * y as i64 + p.xz,
                y: p.yx * x as i64 + p.yy * y as i64 + p.yz,
                z: p.zx * x as i64 + p.zy * y as i64 + p.zz,
                dx: p.xx,
                dy: p.yx,
                dz: p.zx,
            },
        }
    }
}

pub enum RowIter {
    Identity { sx: i32, sy: i32 },
    Affine { x: i64, y: i64, dx: i64, dy: i64 },
    Projective { x: i64, y: i64, z: i64, dx: i64, dy: i64, dz: i64 },
}

impl Iterator for RowIter {
    type Item = (Fixed, Fixed);

    #[inline]
    fn next(&mut self) -> Option<(Fixed, Fixed)> {
        match self {
            RowIter::Identity { sx, sy } => {
                let out = (Fixed::from_int(*sx), Fixed::from_int(*sy));
                *sx += 1;
                Some(out)
            }
            RowIter::Affine { x, y, dx, dy } => {
                let out = (Fixed::saturate(*x), Fixed::saturate(*y));
                *x += *dx;
                *y += *dy;
                Some(out)
            }
            RowIter::Projective { x, y, z, dx, dy, dz } => {
                // One division per pixel; z near zero saturates instead of
                // dividing by it.
                let out = if *z == 0 {
                    (Fixed(i32::MAX), Fixed(i32::MAX))
                } else {
                    (
                        Fixed::saturate((*x << FIXED_SHIFT) / *z),
                        Fixed::saturate((*y << FIXED_SHIFT) / *z),
                    )
                };
                *x += *dx;
                *y += *dy;
                *z += *dz;
                Some(out)
            }
        }
    }
}
