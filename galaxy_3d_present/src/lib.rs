/*!
# Galaxy 3D Present

Backend-agnostic frame presentation pipeline for Galaxy 3D.

This crate owns the per-frame protocol between a host window and a GPU:
acquiring a presentable image, recording into a per-frame command buffer,
submitting and presenting with at most two frames in flight, and rebuilding
the image chain when the window is resized or the surface goes stale.

## Architecture

- **GraphicsDevice**: Backend seam (Vulkan, ...) exposing opaque handles
- **PresentableSurface**: Host window (extent, resize flag, event wait)
- **ImageChain**: Swapchain images, depth targets, render pass, framebuffers and sync
- **FrameOrchestrator**: begin_frame / render pass scope / end_frame protocol
- **RenderSystemList**: Ordered render systems fed a FrameDescriptor each frame
- **Camera**: View and projection matrices (glam)

Backend implementations provide a concrete `GraphicsDevice`.
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod device;
pub mod surface;
pub mod chain;
pub mod frame;
pub mod camera;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::*;

    // Logging sub-module (types and global logger controls, NOT macros)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger,
            set_logger, reset_logger, set_min_severity, min_severity, log,
        };
    }

    // Backend seam, handles and formats
    pub mod device {
        pub use crate::device::*;
    }

    // Host window
    pub mod surface {
        pub use crate::surface::*;
    }

    // Image chain and surface negotiation
    pub mod chain {
        pub use crate::chain::*;
    }

    // Frame protocol, render systems and timing
    pub mod frame {
        pub use crate::frame::*;
    }

    pub use crate::camera::Camera;
}

// Re-export math library at crate root
pub use glam;
