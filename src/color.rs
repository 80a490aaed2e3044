//! Colors and fixed-point channel arithmetic
//!
//! Two color types cross the API: [`Argb`] is straight (non-premultiplied)
//! and is what callers hand to property setters; [`Color`] is premultiplied
//! and is what surfaces store and compositor kernels consume.
//!
//! Channel math never divides. Multiplication by an 8-bit factor uses the
//! `(t + (t >> 8)) >> 8` trick on `t = c * m + 0x80`, which computes
//! `round(c * m / 255)` exactly, and interpolation uses a 1..=256 scale so
//! that a factor of 256 is the exact identity.

/// Straight ARGB color, 8 bits per channel, alpha in the top byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argb(pub u32);

impl Argb {
    pub const TRANSPARENT: Argb = Argb(0x0000_0000);
    pub const BLACK: Argb = Argb(0xff00_0000);
    pub const WHITE: Argb = Argb(0xffff_ffff);
    pub const RED: Argb = Argb(0xffff_0000);
    pub const GREEN: Argb = Argb(0xff00_ff00);
    pub const BLUE: Argb = Argb(0xff00_00ff);

    /// Create a color from straight components.
    pub fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Argb((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }
    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }
    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }
    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }
    pub fn b(self) -> u8 {
        self.0 as u8
    }

    /// Convert to the premultiplied form used everywhere past the property
    /// boundary. Each channel becomes `round(c * a / 255)`.
    pub fn premultiply(self) -> Color {
        let a = self.0 >> 24;
        match a {
            0 => Color(0),
            255 => Color(self.0),
            _ => Color((a << 24) | (mul_sym(a, self.0) & 0x00ff_ffff)),
        }
    }
}

/// Premultiplied ARGB pixel, the native currency of surfaces and kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0);
    pub const WHITE: Color = Color(0xffff_ffff);

    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Back to straight alpha. Channels of a fully transparent color are
    /// unrecoverable and come back as zero.
    pub fn unpremultiply(self) -> Argb {
        let a = self.0 >> 24;
        match a {
            0 => Argb(0),
            255 => Argb(self.0),
            _ => {
                let r = ((self.0 >> 16) & 0xff) * 255 / a;
                let g = ((self.0 >> 8) & 0xff) * 255 / a;
                let b = (self.0 & 0xff) * 255 / a;
                Argb((a << 24) | (r.min(255) << 16) | (g.min(255) << 8) | b.min(255))
            }
        }
    }
}

impl From<Argb> for Color {
    fn from(c: Argb) -> Color {
        c.premultiply()
    }
}

/// `round(x * y / 255)` for two 8-bit values.
#[inline]
pub fn mul_u8(x: u32, y: u32) -> u32 {
    let t = x * y + 0x80;
    (t + (t >> 8)) >> 8
}

/// Scale all four channels of a packed pixel by `m` in 0..=255 with exact
/// rounding: `m == 255` is the identity, `m == 0` yields zero.
///
/// Works on two channels at a time; each 16-bit lane holds `c * m + 0x80`
/// which never overflows into its neighbour.
#[inline]
pub fn mul_sym(m: u32, c: u32) -> u32 {
    let t0 = (c & 0x00ff_00ff) * m + 0x0080_0080;
    let rb = ((t0 + ((t0 >> 8) & 0x00ff_00ff)) >> 8) & 0x00ff_00ff;
    let t1 = ((c >> 8) & 0x00ff_00ff) * m + 0x0080_0080;
    let ag = (t1 + ((t1 >> 8) & 0x00ff_00ff)) & 0xff00_ff00;
    ag | rb
}

/// Scale all four channels by `a` in 0..=256. A factor of 256 is the exact
/// identity, which is what keeps fully opaque and fully transparent inputs
/// lossless through the blend formula.
#[inline]
pub fn mul_256(a: u32, c: u32) -> u32 {
    let rb = (((c & 0x00ff_00ff) * a + 0x0080_0080) >> 8) & 0x00ff_00ff;
    let ag = ((((c >> 8) & 0x00ff_00ff) * a) + 0x0080_0080) & 0xff00_ff00;
    ag | rb
}

/// Channelwise product of two packed pixels, `round(x * y / 255)` each.
/// Multiplying by opaque white is the identity.
#[inline]
pub fn mul4_sym(x: u32, y: u32) -> u32 {
    let a = mul_u8(x >> 24, y >> 24);
    let r = mul_u8((x >> 16) & 0xff, (y >> 16) & 0xff);
    let g = mul_u8((x >> 8) & 0xff, (y >> 8) & 0xff);
    let b = mul_u8(x & 0xff, y & 0xff);
    (a << 24) | (r << 16) | (g << 8) | b
}

/// Interpolate between two packed pixels: 256 selects `c1`, 0 selects `c2`.
#[inline]
pub fn interp_256(a: u32, c1: u32, c2: u32) -> u32 {
    let ch = |s1: u32, s2: u32| -> u32 {
        let d = (s1 as i32 - s2 as i32) * a as i32;
        (s2 as i32 + (d >> 8)) as u32
    };
    let aa = ch(c1 >> 24, c2 >> 24);
    let r = ch((c1 >> 16) & 0xff, (c2 >> 16) & 0xff);
    let g = ch((c1 >> 8) & 0xff, (c2 >> 8) & 0xff);
    let b = ch(c1 & 0xff, c2 & 0xff);
    (aa << 24) | (r << 16) | (g << 8) | b
}

/// Map an 8-bit alpha onto the 1..=256 scale: 0 stays 0, otherwise `a + 1`.
/// `256 - a256(a)` is then an exact "remaining" factor for the over operator.
#[inline]
pub fn a256(a: u32) -> u32 {
    if a == 0 {
        0
    } else {
        a + 1
    }
}

/// Rec. 709 luminance of a packed pixel, in 0..=255. Weights sum to 256.
#[inline]
pub fn luminance(c: u32) -> u32 {
    let r = (c >> 16) & 0xff;
    let g = (c >> 8) & 0xff;
    let b = c & 0xff;
    (r * 54 + g * 183 + b * 19) >> 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_u8_matches_exact_rounding() {
        for x in 0..=255u32 {
            for y in [0u32, 1, 127, 128, 200, 254, 255] {
                let exact = ((x * y) as f64 / 255.0).round() as u32;
                assert_eq!(mul_u8(x, y), exact, "x={x} y={y}");
            }
        }
    }

    #[test]
    fn mul_sym_identity_and_zero() {
        for c in [0x0012_3456u32, 0xff00_00ff, 0x8040_c020, 0xffff_ffff] {
            assert_eq!(mul_sym(255, c), c);
            assert_eq!(mul_sym(0, c), 0);
        }
    }

    #[test]
    fn mul_sym_matches_channelwise() {
        for m in [1u32, 63, 128, 254] {
            let c = 0x8040_c020u32;
            let want = (mul_u8(m, 0x80) << 24)
                | (mul_u8(m, 0x40) << 16)
                | (mul_u8(m, 0xc0) << 8)
                | mul_u8(m, 0x20);
            assert_eq!(mul_sym(m, c), want, "m={m}");
        }
    }

    #[test]
    fn mul_256_full_scale_is_identity() {
        for c in [0u32, 0x0000_0001, 0x0120_3455, 0xffff_ffff, 0x8000_0080] {
            assert_eq!(mul_256(256, c), c);
            assert_eq!(mul_256(0, c), 0);
        }
    }

    #[test]
    fn mul4_sym_white_is_identity() {
        for c in [0x0012_3456u32, 0xffff_ffff, 0x8040_c020, 0x0100_0001] {
            assert_eq!(mul4_sym(0xffff_ffff, c), c);
            assert_eq!(mul4_sym(c, 0xffff_ffff), c);
            assert_eq!(mul4_sym(0, c), 0);
        }
    }

    #[test]
    fn interp_256_endpoints() {
        let c1 = 0x8040_c020u32;
        let c2 = 0x1022_3344u32;
        assert_eq!(interp_256(256, c1, c2), c1);
        assert_eq!(interp_256(0, c1, c2), c2);
    }

    #[test]
    fn premultiply_rounds_and_round_trips() {
        let c = Argb::new(128, 255, 64, 0);
        let p = c.premultiply();
        // 255 * 128 / 255 = 128, 64 * 128 / 255 rounds to 32
        assert_eq!(p.0, 0x8080_2000);
        let back = p.unpremultiply();
        assert_eq!(back.a(), 128);
        assert!((back.r() as i32 - 255).abs() <= 1);
        assert!((back.g() as i32 - 64).abs() <= 1);
        assert_eq!(back.b(), 0);
    }

    #[test]
    fn opaque_and_transparent_premultiply_lossless() {
        assert_eq!(Argb::RED.premultiply().0, 0xffff_0000);
        assert_eq!(Argb::TRANSPARENT.premultiply().0, 0);
        assert_eq!(Color(0xffff_0000).unpremultiply(), Argb::RED);
    }

    #[test]
    fn luminance_weights() {
        assert_eq!(luminance(0xffff_ffff), 255);
        assert_eq!(luminance(0xff00_0000), 0);
        // green dominates
        assert!(luminance(0xff00_ff00) > luminance(0xffff_0000));
        assert!(luminance(0xffff_0000) > luminance(0xff00_00ff));
    }
}
