//! Allocation pools for pixel storage
//!
//! A [`Pool`] decides two things: how row strides are padded and how the
//! backing bytes are aligned. [`HeapPool`] packs rows tightly; [`AlignedPool`]
//! pads strides and bases to a cache line so vector kernels can run full
//! width without scalar edges.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::format::Format;

/// Owned, zero-initialized byte storage with a known base alignment.
pub struct Plane {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
}

impl Plane {
    /// Allocate `len` zeroed bytes aligned to `align` (a power of two).
    /// Zero-length planes are rejected; the global allocator cannot hand
    /// them out.
    pub fn alloc(len: usize, align: usize) -> Result<Plane> {
        if len == 0 {
            return Err(Error::AllocationFailure(len));
        }
        let layout =
            Layout::from_size_align(len, align).map_err(|_| Error::AllocationFailure(len))?;
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(Error::AllocationFailure(len))?;
        Ok(Plane { ptr, len, align })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn align(&self) -> usize {
        self.align
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for Plane {
    fn drop(&mut self) {
        // alloc succeeded with this exact layout
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.len, self.align);
            dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

impl Clone for Plane {
    fn clone(&self) -> Plane {
        let mut copy = Plane::alloc(self.len, self.align)
            .unwrap_or_else(|_| panic!("allocation of {} bytes failed", self.len));
        copy.as_bytes_mut().copy_from_slice(self.as_bytes());
        copy
    }
}

impl fmt::Debug for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plane")
            .field("len", &self.len)
            .field("align", &self.align)
            .finish()
    }
}

// Exclusive ownership of the allocation; no interior sharing.
unsafe impl Send for Plane {}
unsafe impl Sync for Plane {}

/// Allocation strategy used by buffers and surfaces.
pub trait Pool {
    /// Strategy name, recorded on buffers for diagnostics.
    fn name(&self) -> &'static str;
    /// Row stride in bytes for `width` pixels of `fmt` under this policy.
    fn stride_for(&self, fmt: Format, width: usize) -> usize;
    /// Allocate one zeroed plane of `len` bytes.
    fn alloc(&self, len: usize) -> Result<Plane>;
}

/// Plain heap allocations with tightly packed rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapPool;

impl Pool for HeapPool {
    fn name(&self) -> &'static str {
        "heap"
    }
    fn stride_for(&self, fmt: Format, width: usize) -> usize {
        fmt.stride_for(width)
    }
    fn alloc(&self, len: usize) -> Result<Plane> {
        Plane::alloc(len, std::mem::align_of::<u64>())
    }
}

/// Heap allocations with base and stride rounded to a cache line.
#[derive(Debug, Clone, Copy)]
pub struct AlignedPool {
    line: usize,
}

impl AlignedPool {
    pub fn new(line: usize) -> Self {
        assert!(line.is_power_of_two());
        Self { line }
    }
}

impl Default for AlignedPool {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Pool for AlignedPool {
    fn name(&self) -> &'static str {
        "aligned"
    }
    fn stride_for(&self, fmt: Format, width: usize) -> usize {
        let tight = fmt.stride_for(width);
        (tight + self.line - 1) & !(self.line - 1)
    }
    fn alloc(&self, len: usize) -> Result<Plane> {
        Plane::alloc(len, self.line)
    }
}
