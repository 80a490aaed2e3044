//! Pixel formats

use std::fmt;

/// Every buffer layout the engine can hold and convert.
///
/// Surfaces always render in [`Format::Argb8888Pre`]; the other formats
/// exist for buffers exchanged with decoders, encoders and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Straight (non-premultiplied) ARGB, 8 bits per channel.
    Argb8888,
    /// Premultiplied ARGB, the native rendering format.
    Argb8888Pre,
    /// 16-bit packed 5-6-5 RGB.
    Rgb565,
    /// 24-bit RGB, byte order R, G, B.
    Rgb888,
    /// 24-bit RGB, byte order B, G, R.
    Bgr888,
    /// 8-bit alpha only.
    A8,
    /// 8-bit luminance only.
    Gray8,
    /// 32-bit CMYK as written by most encoders.
    Cmyk,
    /// 32-bit CMYK with Adobe's inverted convention.
    CmykAdobe,
}

impl Format {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Format::Argb8888 | Format::Argb8888Pre => 4,
            Format::Rgb565 => 2,
            Format::Rgb888 | Format::Bgr888 => 3,
            Format::A8 | Format::Gray8 => 1,
            Format::Cmyk | Format::CmykAdobe => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Format::Argb8888 | Format::Argb8888Pre | Format::A8)
    }

    /// Tightly packed stride for a row of `width` pixels.
    pub fn stride_for(self, width: usize) -> usize {
        width * self.bytes_per_pixel()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Argb8888 => "argb8888",
            Format::Argb8888Pre => "argb8888_pre",
            Format::Rgb565 => "rgb565",
            Format::Rgb888 => "rgb888",
            Format::Bgr888 => "bgr888",
            Format::A8 => "a8",
            Format::Gray8 => "gray8",
            Format::Cmyk => "cmyk",
            Format::CmykAdobe => "cmyk_adobe",
        };
        f.write_str(name)
    }
}
