//! Image codec providers.
//!
//! A [`Provider`] knows how to decode one encoded image format into a
//! premultiplied ARGB buffer and how to encode a surface back out. Providers
//! live in a [`ProviderRegistry`]; lookup walks the registry in registration
//! order and picks the first provider whose predicate accepts the input, so
//! registering earlier means higher priority.

use std::fs;
use std::path::Path as FsPath;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::surface::Surface;

/// Free-form `key=value;key=value` option string, already split into pairs.
///
/// Providers pick out the keys they understand and ignore the rest. Entries
/// without a `=` are dropped during parsing.
#[derive(Debug, Default, Clone)]
pub struct Options {
    pairs: Vec<(String, String)>,
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    pub fn parse(raw: &str) -> Options {
        let mut pairs = Vec::new();
        for entry in raw.split(';') {
            if let Some((key, value)) = entry.split_once('=') {
                let key = key.trim();
                if !key.is_empty() {
                    pairs.push((key.to_string(), value.trim().to_string()));
                }
            }
        }
        Options { pairs }
    }

    /// Last value wins when a key repeats.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Dimensions and pixel format of an encoded image, read without a full
/// decode where the codec allows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    pub format: Format,
}

/// One codec. `loadable` sniffs the encoded bytes, `saveable` judges the
/// destination path, and `load` decodes into a caller-allocated buffer whose
/// dimensions come from a prior [`Provider::info`] call.
pub trait Provider {
    fn name(&self) -> &'static str;

    /// Does the encoded data look like this provider's format?
    fn loadable(&self, data: &[u8]) -> bool;

    /// Would this provider encode to the given destination path?
    fn saveable(&self, path: &FsPath) -> bool;

    fn info(&self, data: &[u8], options: &Options) -> Result<ImageInfo>;

    /// Decode `data` into `dst`. The buffer must match the dimensions
    /// reported by [`Provider::info`] and be `Argb8888Pre`.
    fn load(&self, data: &[u8], dst: &mut Buffer, options: &Options) -> Result<()>;

    fn save(&self, surface: &Surface, path: &FsPath, options: &Options) -> Result<()>;
}

/// Ordered collection of providers. First registered, first asked.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider + Send + Sync>>,
}

impl ProviderRegistry {
    /// An empty registry. Use [`ProviderRegistry::with_defaults`] to get the
    /// built-in codecs.
    pub fn new() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    /// A registry with every codec compiled into this build.
    pub fn with_defaults() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        #[cfg(feature = "png")]
        registry.register(Box::new(png::PngProvider));
        #[cfg(feature = "jpeg")]
        registry.register(Box::new(jpeg::JpegProvider));
        registry
    }

    pub fn register(&mut self, provider: Box<dyn Provider + Send + Sync>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// First provider that recognises the encoded bytes.
    pub fn find_loader(&self, data: &[u8]) -> Result<&dyn Provider> {
        self.providers
            .iter()
            .map(|p| p.as_ref() as &dyn Provider)
            .find(|p| p.loadable(data))
            .ok_or_else(|| Error::NoProvider("unrecognised image data".to_string()))
    }

    /// First provider willing to encode to the given path.
    pub fn find_saver(&self, path: &FsPath) -> Result<&dyn Provider> {
        self.providers
            .iter()
            .map(|p| p.as_ref() as &dyn Provider)
            .find(|p| p.saveable(path))
            .ok_or_else(|| Error::NoProvider(path.display().to_string()))
    }

    pub fn info(&self, data: &[u8], options: &Options) -> Result<ImageInfo> {
        self.find_loader(data)?.info(data, options)
    }

    /// Decode in-memory data into a fresh surface.
    pub fn load_data(&self, data: &[u8], options: &Options) -> Result<Surface> {
        let provider = self.find_loader(data)?;
        let info = provider.info(data, options)?;
        let mut buffer = Buffer::new(Format::Argb8888Pre, info.width, info.height)?;
        provider.load(data, &mut buffer, options)?;
        Surface::from_buffer(buffer)
    }

    /// Read and decode a file.
    pub fn load_file(&self, path: &FsPath, options: &Options) -> Result<Surface> {
        let data = fs::read(path).map_err(|_| Error::NotFound(path.to_path_buf()))?;
        self.load_data(&data, options)
    }

    /// Encode a surface to a file, picking the codec from the path.
    pub fn save_file(&self, surface: &Surface, path: &FsPath, options: &Options) -> Result<()> {
        self.find_saver(path)?.save(surface, path, options)
    }
}

#[cfg(any(feature = "png", feature = "jpeg"))]
mod codec {
    use super::*;
    use crate::color::{Argb, Color};

    pub fn check_dst(dst: &Buffer, width: usize, height: usize) -> Result<()> {
        if dst.format() != Format::Argb8888Pre {
            return Err(Error::FormatMismatch {
                expected: Format::Argb8888Pre,
                got: dst.format(),
            });
        }
        if dst.width() != width || dst.height() != height {
            return Err(Error::SizeMismatch {
                expected: (width, height),
                got: (dst.width(), dst.height()),
            });
        }
        Ok(())
    }

    /// Straight RGBA bytes from the decoder to premultiplied ARGB words.
    pub fn rgba_to_premul(rgba: &[u8], dst: &mut Buffer) {
        let width = dst.width();
        for y in 0..dst.height() {
            let row = dst.row_u32_mut(y);
            let src = &rgba[y * width * 4..(y + 1) * width * 4];
            for (px, chunk) in row.iter_mut().zip(src.chunks_exact(4)) {
                *px = Argb::new(chunk[3], chunk[0], chunk[1], chunk[2]).premultiply().0;
            }
        }
    }

    /// Premultiplied surface rows back to straight RGBA bytes.
    pub fn premul_to_rgba(surface: &Surface) -> Vec<u8> {
        let mut out = Vec::with_capacity(surface.width() * surface.height() * 4);
        for y in 0..surface.height() {
            for px in surface.row(y) {
                let argb = Color(*px).unpremultiply();
                let [a, r, g, b] = argb.0.to_be_bytes();
                out.extend_from_slice(&[r, g, b, a]);
            }
        }
        out
    }

    pub fn extension_is(path: &FsPath, candidates: &[&str]) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| candidates.iter().any(|c| e.eq_ignore_ascii_case(c)))
            .unwrap_or(false)
    }
}

#[cfg(feature = "png")]
mod png {
    use std::io::Cursor;

    use image::{ImageFormat, ImageReader};

    use super::codec;
    use super::*;

    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    pub struct PngProvider;

    impl Provider for PngProvider {
        fn name(&self) -> &'static str {
            "png"
        }

        fn loadable(&self, data: &[u8]) -> bool {
            data.starts_with(&SIGNATURE)
        }

        fn saveable(&self, path: &FsPath) -> bool {
            codec::extension_is(path, &["png"])
        }

        fn info(&self, data: &[u8], _options: &Options) -> Result<ImageInfo> {
            let reader = ImageReader::with_format(Cursor::new(data), ImageFormat::Png);
            let (width, height) = reader
                .into_dimensions()
                .map_err(|e| Error::DecodeFailure(e.to_string()))?;
            Ok(ImageInfo {
                width: width as usize,
                height: height as usize,
                format: Format::Argb8888Pre,
            })
        }

        fn load(&self, data: &[u8], dst: &mut Buffer, _options: &Options) -> Result<()> {
            let decoded = image::load_from_memory_with_format(data, ImageFormat::Png)
                .map_err(|e| Error::DecodeFailure(e.to_string()))?;
            let rgba = decoded.to_rgba8();
            codec::check_dst(dst, rgba.width() as usize, rgba.height() as usize)?;
            codec::rgba_to_premul(rgba.as_raw(), dst);
            Ok(())
        }

        fn save(&self, surface: &Surface, path: &FsPath, _options: &Options) -> Result<()> {
            let rgba = codec::premul_to_rgba(surface);
            image::save_buffer_with_format(
                path,
                &rgba,
                surface.width() as u32,
                surface.height() as u32,
                image::ExtendedColorType::Rgba8,
                ImageFormat::Png,
            )
            .map_err(|e| Error::EncodeFailure(e.to_string()))
        }
    }
}

#[cfg(feature = "jpeg")]
mod jpeg {
    use std::io::Cursor;

    use image::{ImageFormat, ImageReader};

    use super::codec;
    use super::*;

    pub struct JpegProvider;

    impl Provider for JpegProvider {
        fn name(&self) -> &'static str {
            "jpeg"
        }

        fn loadable(&self, data: &[u8]) -> bool {
            data.starts_with(&[0xff, 0xd8, 0xff])
        }

        fn saveable(&self, path: &FsPath) -> bool {
            codec::extension_is(path, &["jpg", "jpeg"])
        }

        fn info(&self, data: &[u8], _options: &Options) -> Result<ImageInfo> {
            let reader = ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg);
            let (width, height) = reader
                .into_dimensions()
                .map_err(|e| Error::DecodeFailure(e.to_string()))?;
            Ok(ImageInfo {
                width: width as usize,
                height: height as usize,
                format: Format::Argb8888Pre,
            })
        }

        fn load(&self, data: &[u8], dst: &mut Buffer, _options: &Options) -> Result<()> {
            let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
                .map_err(|e| Error::DecodeFailure(e.to_string()))?;
            let rgba = decoded.to_rgba8();
            codec::check_dst(dst, rgba.width() as usize, rgba.height() as usize)?;
            codec::rgba_to_premul(rgba.as_raw(), dst);
            Ok(())
        }

        fn save(&self, surface: &Surface, path: &FsPath, options: &Options) -> Result<()> {
            // JPEG has no alpha channel. Drop it after unpremultiplying.
            let rgba = codec::premul_to_rgba(surface);
            let rgb: Vec<u8> = rgba
                .chunks_exact(4)
                .flat_map(|c| [c[0], c[1], c[2]])
                .collect();
            let quality: u8 = options
                .get("quality")
                .and_then(|q| q.parse().ok())
                .unwrap_or(90);
            let file = fs::File::create(path).map_err(|e| Error::EncodeFailure(e.to_string()))?;
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(file, quality.clamp(1, 100));
            encoder
                .encode(
                    &rgb,
                    surface.width() as u32,
                    surface.height() as u32,
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| Error::EncodeFailure(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Solid(u32);

    impl Provider for Solid {
        fn name(&self) -> &'static str {
            "solid"
        }
        fn loadable(&self, data: &[u8]) -> bool {
            data.starts_with(b"SOLID")
        }
        fn saveable(&self, _path: &FsPath) -> bool {
            false
        }
        fn info(&self, _data: &[u8], _options: &Options) -> Result<ImageInfo> {
            Ok(ImageInfo {
                width: 2,
                height: 2,
                format: Format::Argb8888Pre,
            })
        }
        fn load(&self, _data: &[u8], dst: &mut Buffer, _options: &Options) -> Result<()> {
            for y in 0..dst.height() {
                dst.row_u32_mut(y).fill(self.0);
            }
            Ok(())
        }
        fn save(&self, _surface: &Surface, _path: &FsPath, _options: &Options) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn options_parse_pairs() {
        let opts = Options::parse("quality=90;progressive=yes");
        assert_eq!(opts.get("quality"), Some("90"));
        assert_eq!(opts.get("progressive"), Some("yes"));
        assert_eq!(opts.get("missing"), None);
    }

    #[test]
    fn options_skip_malformed_entries() {
        let opts = Options::parse("broken;=nokey; quality = 75 ;");
        assert_eq!(opts.get("quality"), Some("75"));
        assert_eq!(opts.iter().count(), 1);
    }

    #[test]
    fn options_last_value_wins() {
        let opts = Options::parse("quality=10;quality=95");
        assert_eq!(opts.get("quality"), Some("95"));
    }

    #[test]
    fn registry_picks_first_matching_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(Solid(0xff00_0000)));
        registry.register(Box::new(Solid(0xffff_ffff)));
        let surface = registry
            .load_data(b"SOLID!", &Options::new())
            .unwrap();
        assert_eq!(surface.row(0)[0], 0xff00_0000);
    }

    #[test]
    fn registry_rejects_unknown_data() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.find_loader(b"????"),
            Err(Error::NoProvider(_))
        ));
    }

    #[test]
    fn load_data_allocates_from_info() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(Solid(0x8040_2010)));
        let surface = registry.load_data(b"SOLID", &Options::new()).unwrap();
        assert_eq!((surface.width(), surface.height()), (2, 2));
        assert!(surface.row(1).iter().all(|&px| px == 0x8040_2010));
    }

    #[cfg(feature = "png")]
    #[test]
    fn png_provider_sniffs_signature() {
        let registry = ProviderRegistry::with_defaults();
        let sig = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        assert_eq!(registry.find_loader(&sig).unwrap().name(), "png");
    }

    #[cfg(feature = "jpeg")]
    #[test]
    fn jpeg_provider_sniffs_signature() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(
            registry.find_loader(&[0xff, 0xd8, 0xff, 0xe0]).unwrap().name(),
            "jpeg"
        );
    }
}
