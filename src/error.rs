//! Engine error type

use std::path::PathBuf;

use thiserror::Error;

use crate::compositor::Rop;
use crate::format::Format;

/// Everything that can go wrong while setting up or drawing.
///
/// Renderer setup and the image providers report through this one enum so
/// callers can match on the failure class instead of a string.
#[derive(Debug, Error)]
pub enum Error {
    /// The named file does not exist or could not be opened.
    #[error("no such file: {}", .0.display())]
    NotFound(PathBuf),
    /// No registered provider recognises the data.
    #[error("no provider for {0}")]
    NoProvider(String),
    /// An operation was handed a buffer of the wrong pixel format.
    #[error("format mismatch: expected {expected:?}, got {got:?}")]
    FormatMismatch { expected: Format, got: Format },
    /// An operation was handed a buffer of the wrong dimensions.
    #[error("size mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, got.0, got.1)]
    SizeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// The pool refused or failed the requested allocation.
    #[error("allocation of {0} bytes failed")]
    AllocationFailure(usize),
    #[error("decode failed: {0}")]
    DecodeFailure(String),
    #[error("encode failed: {0}")]
    EncodeFailure(String),
    /// A renderer was asked to draw under a state it does not support,
    /// e.g. a projective matrix on a renderer that only claims affine.
    #[error("renderer '{renderer}' does not support {missing}")]
    MissingCapability {
        renderer: &'static str,
        missing: &'static str,
    },
    /// The compositor table has no kernel for the requested combination.
    #[error("no compositor kernel for {rop:?} onto {dst:?}")]
    MissingKernel { rop: Rop, dst: Format },
}

pub type Result<T> = std::result::Result<T, Error>;
