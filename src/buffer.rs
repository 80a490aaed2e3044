//! Pixel buffers
//!
//! A [`Buffer`] is format-tagged pixel storage in row-major order, allocated
//! through a [`Pool`]. Rows may be padded; `stride` is always in bytes.
//! 32-bit formats additionally expose rows as `u32` slices, which requires
//! the stride to stay a multiple of four (every pool guarantees that for
//! 4-byte formats).

use bytemuck::{cast_slice, cast_slice_mut};

use crate::error::{Error, Result};
use crate::format::Format;
use crate::pool::{HeapPool, Plane, Pool};

#[derive(Debug, Clone)]
pub struct Buffer {
    format: Format,
    width: usize,
    height: usize,
    stride: usize,
    pool: &'static str,
    plane: Plane,
}

impl Buffer {
    /// Allocate a zeroed buffer from the default heap pool.
    pub fn new(format: Format, width: usize, height: usize) -> Result<Buffer> {
        Buffer::new_from(&HeapPool, format, width, height)
    }

    /// Allocate a zeroed buffer with the stride and alignment policy of `pool`.
    pub fn new_from(pool: &dyn Pool, format: Format, width: usize, height: usize) -> Result<Buffer> {
        if width == 0 || height == 0 {
            return Err(Error::SizeMismatch {
                expected: (1, 1),
                got: (width, height),
            });
        }
        let stride = pool.stride_for(format, width);
        debug_assert!(format.bytes_per_pixel() != 4 || stride % 4 == 0);
        let plane = pool.alloc(stride * height)?;
        Ok(Buffer {
            format,
            width,
            height,
            stride,
            pool: pool.name(),
            plane,
        })
    }

    /// Wrap caller-provided bytes; `data` must hold `height` tightly packed
    /// rows. The bytes are copied into pool storage so alignment holds.
    pub fn from_bytes(format: Format, width: usize, height: usize, data: &[u8]) -> Result<Buffer> {
        let tight = format.stride_for(width);
        if data.len() < tight * height {
            return Err(Error::SizeMismatch {
                expected: (width, height),
                got: (width, data.len() / tight.max(1)),
            });
        }
        let mut buf = Buffer::new(format, width, height)?;
        for y in 0..height {
            let src = &data[y * tight..y * tight + tight];
            buf.row_mut(y)[..tight].copy_from_slice(src);
        }
        Ok(buf)
    }

    pub fn format(&self) -> Format {
        self.format
    }
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn height(&self) -> usize {
        self.height
    }
    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }
    /// Name of the pool strategy that allocated this buffer.
    pub fn pool_name(&self) -> &'static str {
        self.pool
    }

    pub fn bytes(&self) -> &[u8] {
        self.plane.as_bytes()
    }
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.plane.as_bytes_mut()
    }

    /// One row of pixels, `width * bpp` bytes, padding excluded.
    pub fn row(&self, y: usize) -> &[u8] {
        debug_assert!(y < self.height);
        let start = y * self.stride;
        &self.plane.as_bytes()[start..start + self.format.stride_for(self.width)]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        debug_assert!(y < self.height);
        let start = y * self.stride;
        let end = start + self.format.stride_for(self.width);
        &mut self.plane.as_bytes_mut()[start..end]
    }

    /// Row as packed 32-bit pixels. Only valid for 4-byte formats.
    pub fn row_u32(&self, y: usize) -> &[u32] {
        debug_assert_eq!(self.format.bytes_per_pixel(), 4);
        cast_slice(self.row(y))
    }

    pub fn row_u32_mut(&mut self, y: usize) -> &mut [u32] {
        debug_assert_eq!(self.format.bytes_per_pixel(), 4);
        cast_slice_mut(self.row_mut(y))
    }

    /// Reset every byte to zero.
    pub fn clear(&mut self) {
        self.plane.as_bytes_mut().fill(0);
    }

    /// Fail unless `other` has identical dimensions.
    pub fn check_same_size(&self, other: &Buffer) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(Error::SizeMismatch {
                expected: (self.width, self.height),
                got: (other.width, other.height),
            });
        }
        Ok(())
    }
}
