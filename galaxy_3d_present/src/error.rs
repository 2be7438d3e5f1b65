//! Error types for the Galaxy3D presentation core
//!
//! This module defines the error types used throughout the frame presentation
//! pipeline: device initialization, image chain construction and the
//! per-frame submit/present protocol.
//!
//! Transient surface staleness (out-of-date / suboptimal) is NOT an error:
//! it is reported as a [`SurfaceStatus`](crate::device::SurfaceStatus) and
//! handled by image chain recreation.

use std::fmt;
use crate::device::{ChainFormats, DepthFormat};

/// Result type for Galaxy3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D errors
///
/// Every variant is fatal for the frame loop: the host is expected to log it
/// and shut down, since continuing would operate on invalid GPU state.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU or host memory
    OutOfMemory,

    /// Invalid resource (handle, index, etc.)
    InvalidResource(String),

    /// Initialization failed (device, surface, window, subsystems)
    InitializationFailed(String),

    /// The logical device was lost (driver reset, hung GPU)
    DeviceLost,

    /// The presentation surface is no longer usable
    SurfaceLost,

    /// The surface reports no usable format
    NoSurfaceFormat,

    /// None of the candidate depth formats supports depth/stencil attachment
    UnsupportedDepthFormat(Vec<DepthFormat>),

    /// Recreating the image chain changed its color or depth format
    IncompatibleChainFormat {
        /// Formats of the chain that was replaced
        previous: ChainFormats,
        /// Formats of the new chain
        current: ChainFormats,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost => write!(f, "Graphics device lost"),
            Error::SurfaceLost => write!(f, "Presentation surface lost"),
            Error::NoSurfaceFormat => write!(f, "Surface reports no supported format"),
            Error::UnsupportedDepthFormat(candidates) => {
                write!(f, "No supported depth format among candidates {:?}", candidates)
            }
            Error::IncompatibleChainFormat { previous, current } => write!(
                f,
                "Image chain format changed on recreation (color {:?} -> {:?}, depth {:?} -> {:?})",
                previous.color, current.color, previous.depth, current.depth
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
