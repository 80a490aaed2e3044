//! Buffer format conversion
//!
//! Every conversion runs through the native format: one endpoint must be
//! [`Format::Argb8888Pre`]. Conversions are straight pixel rewrites, no
//! blending and no dithering; what cannot be represented (alpha in RGB
//! formats, color in A8) is dropped.

use crate::buffer::Buffer;
use crate::color::{luminance, Argb, Color};
use crate::error::{Error, Result};
use crate::format::Format;

/// Convert `src` into `dst`, which must have identical dimensions.
pub fn convert(src: &Buffer, dst: &mut Buffer) -> Result<()> {
    src.check_same_size(dst)?;
    let (sf, df) = (src.format(), dst.format());
    if sf == df {
        for y in 0..src.height() {
            let tight = sf.stride_for(src.width());
            dst.row_mut(y).copy_from_slice(&src.row(y)[..tight]);
        }
        return Ok(());
    }
    match (sf, df) {
        (Format::Argb8888Pre, _) => {
            for y in 0..src.height() {
                row_from_native(df, src.row_u32(y), dst.row_mut(y));
            }
            Ok(())
        }
        (_, Format::Argb8888Pre) => {
            for y in 0..src.height() {
                row_to_native(sf, src.row(y), dst.row_u32_mut(y));
            }
            Ok(())
        }
        _ => Err(Error::FormatMismatch {
            expected: Format::Argb8888Pre,
            got: sf,
        }),
    }
}

/// One row of native pixels into `fmt`.
pub fn row_from_native(fmt: Format, src: &[u32], dst: &mut [u8]) {
    match fmt {
        Format::Argb8888Pre => {
            for (s, d) in src.iter().zip(dst.chunks_exact_mut(4)) {
                d.copy_from_slice(&s.to_le_bytes());
            }
        }
        Format::Argb8888 => {
            for (s, d) in src.iter().zip(dst.chunks_exact_mut(4)) {
                d.copy_from_slice(&Color(*s).unpremultiply().0.to_le_bytes());
            }
        }
        Format::Rgb565 => {
            for (s, d) in src.iter().zip(dst.chunks_exact_mut(2)) {
                let c = Color(*s).unpremultiply().0;
                let p = ((c >> 8 & 0xf800) | (c >> 5 & 0x07e0) | (c >> 3 & 0x001f)) as u16;
                d.copy_from_slice(&p.to_le_bytes());
            }
        }
        Format::Rgb888 => {
            for (s, d) in src.iter().zip(dst.chunks_exact_mut(3)) {
                let c = Color(*s).unpremultiply();
                d[0] = c.r();
                d[1] = c.g();
                d[2] = c.b();
            }
        }
        Format::Bgr888 => {
            for (s, d) in src.iter().zip(dst.chunks_exact_mut(3)) {
                let c = Color(*s).unpremultiply();
                d[0] = c.b();
                d[1] = c.g();
                d[2] = c.r();
            }
        }
        Format::A8 => {
            for (s, d) in src.iter().zip(dst.iter_mut()) {
                *d = (s >> 24) as u8;
            }
        }
        Format::Gray8 => {
            for (s, d) in src.iter().zip(dst.iter_mut()) {
                *d = luminance(Color(*s).unpremultiply().0) as u8;
            }
        }
        Format::Cmyk => {
            for (s, d) in src.iter().zip(dst.chunks_exact_mut(4)) {
                let c = Color(*s).unpremultiply();
                let (ci, mi, yi, ki) = rgb_to_cmyk(c.r(), c.g(), c.b());
                d.copy_from_slice(&[ci, mi, yi, ki]);
            }
        }
        Format::CmykAdobe => {
            for (s, d) in src.iter().zip(dst.chunks_exact_mut(4)) {
                let c = Color(*s).unpremultiply();
                let (ci, mi, yi, ki) = rgb_to_cmyk(c.r(), c.g(), c.b());
                d.copy_from_slice(&[255 - ci, 255 - mi, 255 - yi, 255 - ki]);
            }
        }
    }
}

/// One row of `fmt` pixels into native.
pub fn row_to_native(fmt: Format, src: &[u8], dst: &mut [u32]) {
    match fmt {
        Format::Argb8888Pre => {
            for (s, d) in src.chunks_exact(4).zip(dst.iter_mut()) {
                *d = u32::from_le_bytes([s[0], s[1], s[2], s[3]]);
            }
        }
        Format::Argb8888 => {
            for (s, d) in src.chunks_exact(4).zip(dst.iter_mut()) {
                *d = Argb(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
                    .premultiply()
                    .0;
            }
        }
        Format::Rgb565 => {
            for (s, d) in src.chunks_exact(2).zip(dst.iter_mut()) {
                let p = u16::from_le_bytes([s[0], s[1]]) as u32;
                // expand by bit replication
                let r = (p >> 11) & 0x1f;
                let g = (p >> 5) & 0x3f;
                let b = p & 0x1f;
                let r = (r << 3) | (r >> 2);
                let g = (g << 2) | (g >> 4);
                let b = (b << 3) | (b >> 2);
                *d = 0xff00_0000 | (r << 16) | (g << 8) | b;
            }
        }
        Format::Rgb888 => {
            for (s, d) in src.chunks_exact(3).zip(dst.iter_mut()) {
                *d = 0xff00_0000 | ((s[0] as u32) << 16) | ((s[1] as u32) << 8) | s[2] as u32;
            }
        }
        Format::Bgr888 => {
            for (s, d) in src.chunks_exact(3).zip(dst.iter_mut()) {
                *d = 0xff00_0000 | ((s[2] as u32) << 16) | ((s[1] as u32) << 8) | s[0] as u32;
            }
        }
        Format::A8 => {
            for (s, d) in src.iter().zip(dst.iter_mut()) {
                *d = (*s as u32) << 24;
            }
        }
        Format::Gray8 => {
            for (s, d) in src.iter().zip(dst.iter_mut()) {
                let g = *s as u32;
                *d = 0xff00_0000 | (g << 16) | (g << 8) | g;
            }
        }
        Format::Cmyk => {
            for (s, d) in src.chunks_exact(4).zip(dst.iter_mut()) {
                *d = cmyk_to_argb(255 - s[0], 255 - s[1], 255 - s[2], 255 - s[3]);
            }
        }
        Format::CmykAdobe => {
            for (s, d) in src.chunks_exact(4).zip(dst.iter_mut()) {
                *d = cmyk_to_argb(s[0], s[1], s[2], s[3]);
            }
        }
    }
}

/// Plain ink split: k from the brightest channel, inks relative to it.
fn rgb_to_cmyk(r: u8, g: u8, b: u8) -> (u8, u8, u8, u8) {
    let k_inv = r.max(g).max(b) as u32;
    if k_inv == 0 {
        return (0, 0, 0, 255);
    }
    let c = 255 - (r as u32 * 255 / k_inv) as u8;
    let m = 255 - (g as u32 * 255 / k_inv) as u8;
    let y = 255 - (b as u32 * 255 / k_inv) as u8;
    (c, m, y, 255 - k_inv as u8)
}

/// Inverted-ink inputs, as stored by the Adobe convention.
fn cmyk_to_argb(ci: u8, mi: u8, yi: u8, ki: u8) -> u32 {
    let k = ki as u32;
    let r = ci as u32 * k / 255;
    let g = mi as u32 * k / 255;
    let b = yi as u32 * k / 255;
    0xff00_0000 | (r << 16) | (g << 8) | b
}
