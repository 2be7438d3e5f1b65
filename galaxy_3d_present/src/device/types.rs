//! Backend-agnostic formats, geometry and surface description types

use super::handles::{FramebufferHandle, ImageHandle, ImageViewHandle, RenderPassHandle};

/// Color format of presentable images
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    /// Backend format the core does not name (raw backend value)
    Other(i32),
}

impl ColorFormat {
    pub fn is_srgb(&self) -> bool {
        matches!(self, ColorFormat::B8G8R8A8_SRGB | ColorFormat::R8G8B8A8_SRGB)
    }
}

/// Color space of presentable images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    Other(i32),
}

/// Depth attachment format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthFormat {
    D32Float,
    D32FloatS8Uint,
    D24UnormS8Uint,
    D16Unorm,
}

impl DepthFormat {
    /// True if the format carries a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(self, DepthFormat::D32FloatS8Uint | DepthFormat::D24UnormS8Uint)
    }
}

/// Presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, may tear
    Immediate,
    /// Triple-buffered, newest image replaces the queued one
    Mailbox,
    /// Vsync queue (always supported)
    Fifo,
    /// Vsync, late images present immediately
    FifoRelaxed,
}

/// Format + color space pair reported by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: ColorFormat,
    pub color_space: ColorSpace,
}

/// 2D size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero (minimized window)
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width / height (0.0 for a zero-height extent)
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering the whole extent with depth range [0, 1]
    pub fn full(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Rectangle covering the whole extent
    pub fn full(extent: Extent2D) -> Self {
        Self { x: 0, y: 0, width: extent.width, height: extent.height }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Surface limits reported by the presentation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    /// `width == u32::MAX` means the window decides the extent
    pub current_extent: Extent2D,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
}

impl SurfaceCapabilities {
    /// True if the surface lets the application choose the extent
    pub fn extent_is_undefined(&self) -> bool {
        self.current_extent.width == u32::MAX
    }
}

/// Everything the surface supports for the current device
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSupport {
    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
}

/// Outcome of acquire and present
///
/// Staleness is not an error: the frame orchestrator answers it by recreating
/// the image chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Optimal,
    /// The chain still works but no longer matches the surface exactly
    Suboptimal,
    /// The chain can no longer present to the surface
    OutOfDate,
}

impl SurfaceStatus {
    /// True for Suboptimal and OutOfDate
    pub fn is_stale(&self) -> bool {
        !matches!(self, SurfaceStatus::Optimal)
    }
}

/// Color and depth formats of an image chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFormats {
    pub color: ColorFormat,
    pub depth: DepthFormat,
}

impl ChainFormats {
    /// Two chains are compatible when render passes and pipelines built
    /// against one can be used with the other
    pub fn is_compatible(&self, other: &ChainFormats) -> bool {
        self == other
    }
}

/// Swapchain creation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapchainDesc {
    pub image_count: u32,
    pub surface_format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub extent: Extent2D,
}

/// Depth image and its view (memory is owned by the backend)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthAttachment {
    pub image: ImageHandle,
    pub view: ImageViewHandle,
}

/// Render pass begin parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassBeginDesc {
    pub render_pass: RenderPassHandle,
    pub framebuffer: FramebufferHandle,
    pub extent: Extent2D,
    /// Color then depth
    pub clear_values: [ClearValue; 2],
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
