//! Pixel compositing kernels
//!
//! A [`Compositor`] is a table of span and point kernels keyed by raster
//! operation, destination format, optional source format and optional mask
//! format. Renderer setup resolves the kernels it needs once; the per-row
//! loops then run straight through function pointers.
//!
//! All kernels assume premultiplied sources and destinations. The over
//! operator is `dst' = src + dst * (256 - a256(alpha)) / 256`, which keeps
//! fully opaque and fully transparent inputs exact; see [`crate::color`]
//! for the channel arithmetic.

use std::collections::HashMap;

use crate::color::{a256, luminance, mul4_sym, mul_256, mul_sym, Color};
use crate::format::Format;

/// What a renderer does to the destination pixels it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rop {
    /// Source-over compositing.
    Blend,
    /// Replace the destination, coverage included.
    Fill,
}

/// Which part of a mask renderer's output weights the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaskChannel {
    /// The mask's alpha channel.
    #[default]
    Alpha,
    /// The mask's luminance; premultiplication folds its alpha in.
    Luminance,
}

impl MaskChannel {
    /// The mask format a kernel key carries for this channel choice.
    pub fn format(self) -> Format {
        match self {
            MaskChannel::Alpha => Format::A8,
            MaskChannel::Luminance => Format::Argb8888Pre,
        }
    }
}

/// Per-pixel mask input handed to a kernel.
#[derive(Clone, Copy)]
pub enum MaskSpan<'a> {
    /// Coverage weights, one byte per destination pixel.
    Alpha(&'a [u8]),
    /// Full pixels whose luminance becomes the weight.
    Luminance(&'a [u32]),
}

/// Span kernel. The length comes from `dst`; when the key names a source
/// or mask format the matching argument is present and the same length.
pub type SpanFn =
    fn(dst: &mut [u32], src: Option<&[u32]>, color: Color, mask: Option<MaskSpan<'_>>);

/// Single-pixel kernel with the same contract as [`SpanFn`]. The raw mask
/// value is a coverage byte or a full pixel depending on the key.
pub type PointFn = fn(dst: &mut u32, src: Option<u32>, color: Color, mask: Option<u32>);

/// Lookup key for one kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelKey {
    pub rop: Rop,
    pub dst: Format,
    pub src: Option<Format>,
    pub mask: Option<Format>,
}

impl KernelKey {
    pub fn new(rop: Rop, dst: Format) -> Self {
        KernelKey {
            rop,
            dst,
            src: None,
            mask: None,
        }
    }
    pub fn with_src(mut self, src: Format) -> Self {
        self.src = Some(src);
        self
    }
    pub fn with_mask(mut self, mask: Format) -> Self {
        self.mask = Some(mask);
        self
    }
}

/// Kernel registry. One per [`crate::context::Context`]; no globals.
pub struct Compositor {
    spans: HashMap<KernelKey, SpanFn>,
    points: HashMap<KernelKey, PointFn>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    /// Table with every built-in kernel installed, vector variants on top
    /// of the scalar ones where the target supports them.
    pub fn new() -> Compositor {
        let mut c = Compositor {
            spans: HashMap::new(),
            points: HashMap::new(),
        };
        c.install_scalar();
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        c.install_sse2();
        c
    }

    /// Register a span kernel. Registering the same key twice is a
    /// programming error.
    pub fn register_span(&mut self, key: KernelKey, f: SpanFn) {
        let prev = self.spans.insert(key, f);
        debug_assert!(prev.is_none(), "duplicate span kernel for {key:?}");
    }

    /// Register a point kernel. Registering the same key twice is a
    /// programming error.
    pub fn register_point(&mut self, key: KernelKey, f: PointFn) {
        let prev = self.points.insert(key, f);
        debug_assert!(prev.is_none(), "duplicate point kernel for {key:?}");
    }

    pub fn span_for(&self, key: KernelKey) -> Option<SpanFn> {
        self.spans.get(&key).copied()
    }

    pub fn point_for(&self, key: KernelKey) -> Option<PointFn> {
        self.points.get(&key).copied()
    }

    fn install_scalar(&mut self) {
        use Format::{Argb8888Pre, A8};
        let d = Argb8888Pre;
        let key = |rop: Rop| KernelKey::new(rop, d);

        self.register_span(key(Rop::Fill), sp_fill_color);
        self.register_span(key(Rop::Fill).with_src(d), sp_fill_src);
        self.register_span(key(Rop::Fill).with_mask(A8), sp_fill_color_a8);
        self.register_span(key(Rop::Fill).with_mask(d), sp_fill_color_lum);
        self.register_span(key(Rop::Fill).with_src(d).with_mask(A8), sp_fill_src_a8);
        self.register_span(key(Rop::Fill).with_src(d).with_mask(d), sp_fill_src_lum);

        self.register_span(key(Rop::Blend), sp_blend_color);
        self.register_span(key(Rop::Blend).with_src(d), sp_blend_src);
        self.register_span(key(Rop::Blend).with_mask(A8), sp_blend_color_a8);
        self.register_span(key(Rop::Blend).with_mask(d), sp_blend_color_lum);
        self.register_span(key(Rop::Blend).with_src(d).with_mask(A8), sp_blend_src_a8);
        self.register_span(key(Rop::Blend).with_src(d).with_mask(d), sp_blend_src_lum);

        self.register_point(key(Rop::Fill), pt_fill_color);
        self.register_point(key(Rop::Fill).with_src(d), pt_fill_src);
        self.register_point(key(Rop::Fill).with_mask(A8), pt_fill_color_a8);
        self.register_point(key(Rop::Fill).with_mask(d), pt_fill_color_lum);
        self.register_point(key(Rop::Fill).with_src(d).with_mask(A8), pt_fill_src_a8);
        self.register_point(key(Rop::Fill).with_src(d).with_mask(d), pt_fill_src_lum);

        self.register_point(key(Rop::Blend), pt_blend_color);
        self.register_point(key(Rop::Blend).with_src(d), pt_blend_src);
        self.register_point(key(Rop::Blend).with_mask(A8), pt_blend_color_a8);
        self.register_point(key(Rop::Blend).with_mask(d), pt_blend_color_lum);
        self.register_point(key(Rop::Blend).with_src(d).with_mask(A8), pt_blend_src_a8);
        self.register_point(key(Rop::Blend).with_src(d).with_mask(d), pt_blend_src_lum);
    }

    /// Swap the hottest spans for SSE2 versions. Same keys, bit-identical
    /// results; plain `insert` because replacing the scalar entry is the
    /// point.
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    fn install_sse2(&mut self) {
        use Format::Argb8888Pre as D;
        self.spans.insert(
            KernelKey::new(Rop::Blend, D),
            crate::simd::sse2_blend_color,
        );
        self.spans.insert(
            KernelKey::new(Rop::Blend, D).with_src(D),
            crate::simd::sse2_blend_src,
        );
        self.spans.insert(
            KernelKey::new(Rop::Fill, D).with_src(D),
            crate::simd::sse2_fill_src,
        );
    }
}

/// Source-over for one premultiplied pixel.
#[inline]
pub fn over(s: u32, d: u32) -> u32 {
    s.wrapping_add(mul_256(256 - a256(s >> 24), d))
}

/// Source pixel after the colorize step; opaque white skips the multiply.
#[inline]
pub(crate) fn tinted(color: Color, s: u32) -> u32 {
    if color == Color::WHITE {
        s
    } else {
        mul4_sym(color.0, s)
    }
}

/// Weight a source pixel by an 8-bit factor; the 0 and 255 ends are exact.
#[inline]
pub(crate) fn weighted(m: u32, s: u32) -> u32 {
    match m {
        0 => 0,
        255 => s,
        _ => mul_sym(m, s),
    }
}

fn sp_fill_color(dst: &mut [u32], _src: Option<&[u32]>, color: Color, _mask: Option<MaskSpan>) {
    dst.fill(color.0);
}

fn sp_fill_src(dst: &mut [u32], src: Option<&[u32]>, color: Color, _mask: Option<MaskSpan>) {
    let Some(src) = src else { return };
    debug_assert_eq!(src.len(), dst.len());
    if color == Color::WHITE {
        dst.copy_from_slice(src);
    } else {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = mul4_sym(color.0, *s);
        }
    }
}

fn sp_fill_color_a8(dst: &mut [u32], _src: Option<&[u32]>, color: Color, mask: Option<MaskSpan>) {
    let Some(MaskSpan::Alpha(m)) = mask else { return };
    debug_assert_eq!(m.len(), dst.len());
    for (d, m) in dst.iter_mut().zip(m) {
        *d = weighted(*m as u32, color.0);
    }
}

fn sp_fill_color_lum(dst: &mut [u32], _src: Option<&[u32]>, color: Color, mask: Option<MaskSpan>) {
    let Some(MaskSpan::Luminance(m)) = mask else { return };
    debug_assert_eq!(m.len(), dst.len());
    for (d, m) in dst.iter_mut().zip(m) {
        *d = weighted(luminance(*m), color.0);
    }
}

fn sp_fill_src_a8(dst: &mut [u32], src: Option<&[u32]>, color: Color, mask: Option<MaskSpan>) {
    let (Some(src), Some(MaskSpan::Alpha(m))) = (src, mask) else { return };
    debug_assert_eq!(src.len(), dst.len());
    debug_assert_eq!(m.len(), dst.len());
    for ((d, s), m) in dst.iter_mut().zip(src).zip(m) {
        *d = weighted(*m as u32, tinted(color, *s));
    }
}

fn sp_fill_src_lum(dst: &mut [u32], src: Option<&[u32]>, color: Color, mask: Option<MaskSpan>) {
    let (Some(src), Some(MaskSpan::Luminance(m))) = (src, mask) else { return };
    debug_assert_eq!(src.len(), dst.len());
    debug_assert_eq!(m.len(), dst.len());
    for ((d, s), m) in dst.iter_mut().zip(src).zip(m) {
        *d = weighted(luminance(*m), tinted(color, *s));
    }
}

fn sp_blend_color(dst: &mut [u32], _src: Option<&[u32]>, color: Color, _mask: Option<MaskSpan>) {
    let s = color.0;
    if s >> 24 == 0xff {
        dst.fill(s);
        return;
    }
    let rem = 256 - a256(s >> 24);
    for d in dst.iter_mut() {
        *d = s.wrapping_add(mul_256(rem, *d));
    }
}

fn sp_blend_src(dst: &mut [u32], src: Option<&[u32]>, color: Color, _mask: Option<MaskSpan>) {
    let Some(src) = src else { return };
    debug_assert_eq!(src.len(), dst.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d = over(tinted(color, *s), *d);
    }
}

fn sp_blend_color_a8(dst: &mut [u32], _src: Option<&[u32]>, color: Color, mask: Option<MaskSpan>) {
    let Some(MaskSpan::Alpha(m)) = mask else { return };
    debug_assert_eq!(m.len(), dst.len());
    for (d, m) in dst.iter_mut().zip(m) {
        if *m != 0 {
            *d = over(weighted(*m as u32, color.0), *d);
        }
    }
}

fn sp_blend_color_lum(dst: &mut [u32], _src: Option<&[u32]>, color: Color, mask: Option<MaskSpan>) {
    let Some(MaskSpan::Luminance(m)) = mask else { return };
    debug_assert_eq!(m.len(), dst.len());
    for (d, m) in dst.iter_mut().zip(m) {
        let w = luminance(*m);
        if w != 0 {
            *d = over(weighted(w, color.0), *d);
        }
    }
}

fn sp_blend_src_a8(dst: &mut [u32], src: Option<&[u32]>, color: Color, mask: Option<MaskSpan>) {
    let (Some(src), Some(MaskSpan::Alpha(m))) = (src, mask) else { return };
    debug_assert_eq!(src.len(), dst.len());
    debug_assert_eq!(m.len(), dst.len());
    for ((d, s), m) in dst.iter_mut().zip(src).zip(m) {
        if *m != 0 {
            *d = over(weighted(*m as u32, tinted(color, *s)), *d);
        }
    }
}

fn sp_blend_src_lum(dst: &mut [u32], src: Option<&[u32]>, color: Color, mask: Option<MaskSpan>) {
    let (Some(src), Some(MaskSpan::Luminance(m))) = (src, mask) else { return };
    debug_assert_eq!(src.len(), dst.len());
    debug_assert_eq!(m.len(), dst.len());
    for ((d, s), m) in dst.iter_mut().zip(src).zip(m) {
        let w = luminance(*m);
        if w != 0 {
            *d = over(weighted(w, tinted(color, *s)), *d);
        }
    }
}

fn pt_fill_color(dst: &mut u32, _src: Option<u32>, color: Color, _mask: Option<u32>) {
    *dst = color.0;
}

fn pt_fill_src(dst: &mut u32, src: Option<u32>, color: Color, _mask: Option<u32>) {
    let Some(s) = src else { return };
    *dst = tinted(color, s);
}

fn pt_fill_color_a8(dst: &mut u32, _src: Option<u32>, color: Color, mask: Option<u32>) {
    let Some(m) = mask else { return };
    *dst = weighted(m & 0xff, color.0);
}

fn pt_fill_color_lum(dst: &mut u32, _src: Option<u32>, color: Color, mask: Option<u32>) {
    let Some(m) = mask else { return };
    *dst = weighted(luminance(m), color.0);
}

fn pt_fill_src_a8(dst: &mut u32, src: Option<u32>, color: Color, mask: Option<u32>) {
    let (Some(s), Some(m)) = (src, mask) else { return };
    *dst = weighted(m & 0xff, tinted(color, s));
}

fn pt_fill_src_lum(dst: &mut u32, src: Option<u32>, color: Color, mask: Option<u32>) {
    let (Some(s), Some(m)) = (src, mask) else { return };
    *dst = weighted(luminance(m), tinted(color, s));
}

fn pt_blend_color(dst: &mut u32, _src: Option<u32>, color: Color, _mask: Option<u32>) {
    *dst = over(color.0, *dst);
}

fn pt_blend_src(dst: &mut u32, src: Option<u32>, color: Color, _mask: Option<u32>) {
    let Some(s) = src else { return };
    *dst = over(tinted(color, s), *dst);
}

fn pt_blend_color_a8(dst: &mut u32, _src: Option<u32>, color: Color, mask: Option<u32>) {
    let Some(m) = mask else { return };
    *dst = over(weighted(m & 0xff, color.0), *dst);
}

fn pt_blend_color_lum(dst: &mut u32, _src: Option<u32>, color: Color, mask: Option<u32>) {
    let Some(m) = mask else { return };
    *dst = over(weighted(luminance(m), color.0), *dst);
}

fn pt_blend_src_a8(dst: &mut u32, src: Option<u32>, color: Color, mask: Option<u32>) {
    let (Some(s), Some(m)) = (src, mask) else { return };
    *dst = over(weighted(m & 0xff, tinted(color, s)), *dst);
}

fn pt_blend_src_lum(dst: &mut u32, src: Option<u32>, color: Color, mask: Option<u32>) {
    let (Some(s), Some(m)) = (src, mask) else { return };
    *dst = over(weighted(luminance(m), tinted(color, s)), *dst);
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: Format = Format::Argb8888Pre;

    #[test]
    fn over_transparent_black_is_identity() {
        for d in [0u32, 0x8040_2010, 0xffff_ffff, 0xff12_3456] {
            assert_eq!(over(0, d), d);
        }
    }

    #[test]
    fn over_opaque_replaces() {
        for d in [0u32, 0x8040_2010, 0xffff_ffff] {
            assert_eq!(over(0xff11_2233, d), 0xff11_2233);
        }
    }

    #[test]
    fn blend_span_with_zero_mask_leaves_dst() {
        let c = Compositor::new();
        let f = c
            .span_for(KernelKey::new(Rop::Blend, D).with_mask(Format::A8))
            .unwrap();
        let mut dst = [0x8040_2010u32; 5];
        let mask = [0u8; 5];
        f(&mut dst, None, Color::WHITE, Some(MaskSpan::Alpha(&mask)));
        assert_eq!(dst, [0x8040_2010; 5]);
    }

    #[test]
    fn fill_span_copies_source_exactly() {
        let c = Compositor::new();
        let f = c
            .span_for(KernelKey::new(Rop::Fill, D).with_src(D))
            .unwrap();
        let src = [0x0102_0304u32, 0xffff_ffff, 0];
        let mut dst = [0xdead_beefu32; 3];
        f(&mut dst, Some(&src), Color::WHITE, None);
        assert_eq!(dst, src);
    }

    #[test]
    fn blend_src_tints_through_color() {
        let c = Compositor::new();
        let f = c
            .span_for(KernelKey::new(Rop::Blend, D).with_src(D))
            .unwrap();
        let src = [0xffff_ffffu32];
        let mut dst = [0u32];
        f(&mut dst, Some(&src), Color(0x8080_0000), None);
        // white source tinted by half-opaque red is the tint itself
        assert_eq!(dst, [0x8080_0000]);
    }

    #[test]
    fn luminance_mask_weights_by_brightness() {
        let c = Compositor::new();
        let f = c
            .span_for(KernelKey::new(Rop::Fill, D).with_mask(D))
            .unwrap();
        let mask = [0xffff_ffffu32, 0xff00_0000, 0];
        let mut dst = [0u32; 3];
        f(&mut dst, None, Color(0xffff_0000), Some(MaskSpan::Luminance(&mask)));
        assert_eq!(dst[0], 0xffff_0000);
        assert_eq!(dst[1], 0);
        assert_eq!(dst[2], 0);
    }

    #[test]
    fn unknown_destination_has_no_kernel() {
        let c = Compositor::new();
        assert!(c.span_for(KernelKey::new(Rop::Blend, Format::Rgb565)).is_none());
    }

    #[test]
    fn point_and_span_agree() {
        let c = Compositor::new();
        let sp = c.span_for(KernelKey::new(Rop::Blend, D)).unwrap();
        let pt = c.point_for(KernelKey::new(Rop::Blend, D)).unwrap();
        let color = Color(0x6633_2211);
        let mut a = [0x8040_2010u32];
        let mut b = a[0];
        sp(&mut a, None, color, None);
        pt(&mut b, None, color, None);
        assert_eq!(a[0], b);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "duplicate span kernel")]
    fn duplicate_registration_asserts() {
        let mut c = Compositor::new();
        c.register_span(KernelKey::new(Rop::Blend, D), sp_blend_color);
    }
}
