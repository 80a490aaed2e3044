//! SIMD speedups for x86-64
//!
//! SSE2 is part of the x86-64 baseline, so these kernels are installed
//! unconditionally when the `simd` feature is on. Each one computes exactly
//! what its scalar counterpart computes for premultiplied inputs: the same
//! `(c * a + 0x80) >> 8` rounding in 16-bit lanes, two pixels per step,
//! with a scalar tail for odd spans.

use core::arch::x86_64::*;

use crate::color::{a256, mul_256, Color};
use crate::compositor::{over, tinted, MaskSpan};

pub(crate) fn sse2_blend_color(
    dst: &mut [u32],
    _src: Option<&[u32]>,
    color: Color,
    _mask: Option<MaskSpan>,
) {
    let s = color.0;
    let a = s >> 24;
    if a == 0xff {
        dst.fill(s);
        return;
    }
    if s == 0 {
        return;
    }
    let rem = 256 - a256(a);
    let split = dst.len() & !1;
    let (pairs, tail) = dst.split_at_mut(split);
    // SAFETY: SSE2 is always available on x86_64
    unsafe {
        let zero = _mm_setzero_si128();
        let round = _mm_set1_epi16(0x80);
        let vrem = _mm_set1_epi16(rem as i16);
        let vsrc = _mm_set1_epi32(s as i32);
        for px in pairs.chunks_exact_mut(2) {
            let d = _mm_loadl_epi64(px.as_ptr() as *const __m128i);
            let d16 = _mm_unpacklo_epi8(d, zero);
            let t = _mm_add_epi16(_mm_mullo_epi16(d16, vrem), round);
            let scaled = _mm_packus_epi16(_mm_srli_epi16::<8>(t), zero);
            let out = _mm_add_epi8(vsrc, scaled);
            _mm_storel_epi64(px.as_mut_ptr() as *mut __m128i, out);
        }
    }
    for d in tail {
        *d = s.wrapping_add(mul_256(rem, *d));
    }
}

pub(crate) fn sse2_blend_src(
    dst: &mut [u32],
    src: Option<&[u32]>,
    color: Color,
    _mask: Option<MaskSpan>,
) {
    let Some(src) = src else { return };
    debug_assert_eq!(src.len(), dst.len());
    let split = dst.len() & !1;
    let tint = color != Color::WHITE;
    // SAFETY: SSE2 is always available on x86_64
    unsafe {
        let zero = _mm_setzero_si128();
        let round = _mm_set1_epi16(0x80);
        let v255 = _mm_set1_epi16(255);
        let v256 = _mm_set1_epi16(256);
        let c16 = _mm_unpacklo_epi8(_mm_set1_epi32(color.0 as i32), zero);
        for i in (0..split).step_by(2) {
            let sp = _mm_loadl_epi64(src.as_ptr().add(i) as *const __m128i);
            let mut s16 = _mm_unpacklo_epi8(sp, zero);
            if tint {
                // round(s * c / 255) per lane: t + (t >> 8) then >> 8
                let t = _mm_add_epi16(_mm_mullo_epi16(s16, c16), round);
                s16 = _mm_srli_epi16::<8>(_mm_add_epi16(t, _mm_srli_epi16::<8>(t)));
            }
            // alpha sits in lanes 3 and 7 for little-endian ARGB pixels
            let a_lo = _mm_shufflelo_epi16::<0xff>(s16);
            let alpha = _mm_shufflehi_epi16::<0xff>(a_lo);
            let bump = _mm_srli_epi16::<8>(_mm_add_epi16(alpha, v255));
            let rem = _mm_sub_epi16(v256, _mm_add_epi16(alpha, bump));
            let dp = _mm_loadl_epi64(dst.as_ptr().add(i) as *const __m128i);
            let d16 = _mm_unpacklo_epi8(dp, zero);
            let t = _mm_add_epi16(_mm_mullo_epi16(d16, rem), round);
            let out16 = _mm_add_epi16(s16, _mm_srli_epi16::<8>(t));
            let out = _mm_packus_epi16(out16, zero);
            _mm_storel_epi64(dst.as_mut_ptr().add(i) as *mut __m128i, out);
        }
    }
    for i in split..dst.len() {
        dst[i] = over(tinted(color, src[i]), dst[i]);
    }
}

pub(crate) fn sse2_fill_src(
    dst: &mut [u32],
    src: Option<&[u32]>,
    color: Color,
    _mask: Option<MaskSpan>,
) {
    let Some(src) = src else { return };
    debug_assert_eq!(src.len(), dst.len());
    if color == Color::WHITE {
        dst.copy_from_slice(src);
        return;
    }
    let split = dst.len() & !1;
    // SAFETY: SSE2 is always available on x86_64
    unsafe {
        let zero = _mm_setzero_si128();
        let round = _mm_set1_epi16(0x80);
        let c16 = _mm_unpacklo_epi8(_mm_set1_epi32(color.0 as i32), zero);
        for i in (0..split).step_by(2) {
            let sp = _mm_loadl_epi64(src.as_ptr().add(i) as *const __m128i);
            let s16 = _mm_unpacklo_epi8(sp, zero);
            let t = _mm_add_epi16(_mm_mullo_epi16(s16, c16), round);
            let out16 = _mm_srli_epi16::<8>(_mm_add_epi16(t, _mm_srli_epi16::<8>(t)));
            let out = _mm_packus_epi16(out16, zero);
            _mm_storel_epi64(dst.as_mut_ptr().add(i) as *mut __m128i, out);
        }
    }
    for i in split..dst.len() {
        dst[i] = tinted(color, src[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels() -> Vec<u32> {
        let mut v = Vec::new();
        for a in [0u32, 1, 127, 128, 254, 255] {
            for c in [0u32, 1, 63, 127, 128, 200] {
                let ch = c.min(a);
                v.push((a << 24) | (ch << 16) | ((ch / 2) << 8) | (a.saturating_sub(c) & 0xff).min(a));
            }
        }
        v
    }

    #[test]
    fn blend_color_matches_scalar() {
        for color in [Color(0x8040_2010), Color(0x0100_0001), Color(0xffff_0000), Color(0)] {
            let base = pixels();
            // odd length exercises the tail
            let mut fast = base[..base.len() - 1].to_vec();
            let mut slow = fast.clone();
            sse2_blend_color(&mut fast, None, color, None);
            for d in slow.iter_mut() {
                *d = over(color.0, *d);
            }
            assert_eq!(fast, slow, "color {:08x}", color.0);
        }
    }

    #[test]
    fn blend_src_matches_scalar() {
        let src = pixels();
        for color in [Color::WHITE, Color(0x8040_2010), Color(0xff80_ff00)] {
            let mut fast: Vec<u32> = (0..src.len() as u32)
                .map(|i| (i * 0x0101_0101).wrapping_mul(3) & 0x7f3f_3f3f)
                .collect();
            let mut slow = fast.clone();
            sse2_blend_src(&mut fast, Some(&src), color, None);
            for (d, s) in slow.iter_mut().zip(&src) {
                *d = over(tinted(color, *s), *d);
            }
            assert_eq!(fast, slow, "color {:08x}", color.0);
        }
    }

    #[test]
    fn fill_src_matches_scalar() {
        let src = pixels();
        for color in [Color::WHITE, Color(0x8040_2010)] {
            let mut fast = vec![0xdead_beefu32; src.len()];
            let mut slow = fast.clone();
            sse2_fill_src(&mut fast, Some(&src), color, None);
            for (d, s) in slow.iter_mut().zip(&src) {
                *d = tinted(color, *s);
            }
            assert_eq!(fast, slow);
        }
    }
}
