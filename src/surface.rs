//! Render targets
//!
//! A [`Surface`] is a buffer fixed to the premultiplied ARGB format, the
//! only layout renderers draw into. Any other format goes through the
//! converter on its way in or out.

use std::cell::RefCell;
use std::rc::Rc;

use crate::buffer::Buffer;
use crate::color::Color;
use crate::converter;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::pool::Pool;
use crate::rect::IRect;

/// Surfaces referenced by renderers are shared by reference count.
pub type SharedSurface = Rc<RefCell<Surface>>;

#[derive(Debug, Clone)]
pub struct Surface {
    buffer: Buffer,
}

impl Surface {
    /// Zeroed (fully transparent) surface from the default heap pool.
    pub fn new(width: usize, height: usize) -> Result<Surface> {
        Ok(Surface {
            buffer: Buffer::new(Format::Argb8888Pre, width, height)?,
        })
    }

    pub fn new_from(pool: &dyn Pool, width: usize, height: usize) -> Result<Surface> {
        Ok(Surface {
            buffer: Buffer::new_from(pool, Format::Argb8888Pre, width, height)?,
        })
    }

    pub fn into_shared(self) -> SharedSurface {
        Rc::new(RefCell::new(self))
    }

    /// Adopt an existing buffer, which must already be premultiplied ARGB.
    pub fn from_buffer(buffer: Buffer) -> Result<Surface> {
        if buffer.format() != Format::Argb8888Pre {
            return Err(Error::FormatMismatch {
                expected: Format::Argb8888Pre,
                got: buffer.format(),
            });
        }
        Ok(Surface { buffer })
    }

    /// Copy a buffer of any format into a fresh native surface.
    pub fn from_foreign(buffer: &Buffer) -> Result<Surface> {
        let mut native = Buffer::new(Format::Argb8888Pre, buffer.width(), buffer.height())?;
        converter::convert(buffer, &mut native)?;
        Surface::from_buffer(native)
    }

    pub fn width(&self) -> usize {
        self.buffer.width()
    }
    pub fn height(&self) -> usize {
        self.buffer.height()
    }
    pub fn rect(&self) -> IRect {
        IRect::of_surface(self.width(), self.height())
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }
    pub fn into_buffer(self) -> Buffer {
        self.buffer
    }

    pub fn row(&self, y: usize) -> &[u32] {
        self.buffer.row_u32(y)
    }
    pub fn row_mut(&mut self, y: usize) -> &mut [u32] {
        self.buffer.row_u32_mut(y)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Color {
        Color(self.row(y)[x])
    }

    /// Overwrite every pixel with `color`, no blending.
    pub fn fill(&mut self, color: Color) {
        for y in 0..self.height() {
            self.row_mut(y).fill(color.0);
        }
    }
}
