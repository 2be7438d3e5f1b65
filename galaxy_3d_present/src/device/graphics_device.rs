/// GraphicsDevice trait - the low-level operations the image chain and frame orchestrator drive

use crate::device::{
    ColorFormat, CommandBufferHandle, DepthAttachment, DepthFormat, Extent2D, FenceHandle,
    FramebufferHandle, ImageHandle, ImageViewHandle, Rect2D, RenderPassBeginDesc,
    RenderPassHandle, SemaphoreHandle, SurfaceStatus, SurfaceSupport, SwapchainDesc,
    SwapchainHandle, Viewport,
};
use crate::error::Result;

/// Graphics device bound to one presentation surface
///
/// Implemented by backend-specific devices (e.g., VulkanGraphicsDevice).
/// All objects are referred to by opaque handles; the device owns the
/// backend resources and the caller is responsible for destroying what it creates.
///
/// Recording methods (`cmd_*`) cannot fail: invalid usage is a contract violation
/// reported by the backend's validation layer.
pub trait GraphicsDevice: Send + Sync {
    // ===== SURFACE =====

    /// Query capabilities, formats and present modes of the bound surface
    fn surface_support(&self) -> Result<SurfaceSupport>;

    /// True if `format` supports optimal-tiling depth/stencil attachment
    fn supports_depth_attachment(&self, format: DepthFormat) -> bool;

    // ===== SWAPCHAIN =====

    /// Create a swapchain
    ///
    /// # Arguments
    ///
    /// * `desc` - Negotiated image count, format, present mode and extent
    /// * `old` - Swapchain being replaced (`SwapchainHandle::NULL` if none).
    ///   The old swapchain stays valid and must still be destroyed by its owner.
    fn create_swapchain(&self, desc: &SwapchainDesc, old: SwapchainHandle) -> Result<SwapchainHandle>;

    /// Images owned by the swapchain (destroyed with it)
    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>>;

    fn destroy_swapchain(&self, swapchain: SwapchainHandle);

    // ===== VIEWS & ATTACHMENTS =====

    /// Create a 2D color view over a swapchain image
    fn create_color_view(&self, image: ImageHandle, format: ColorFormat) -> Result<ImageViewHandle>;

    fn destroy_image_view(&self, view: ImageViewHandle);

    /// Create a device-local depth image, its memory and its view
    fn create_depth_attachment(&self, format: DepthFormat, extent: Extent2D) -> Result<DepthAttachment>;

    /// Destroy the view, the image and release its memory
    fn destroy_depth_attachment(&self, attachment: DepthAttachment);

    /// Create a single-subpass render pass
    ///
    /// Color is cleared, stored and left ready for presentation;
    /// depth is cleared and its contents discarded.
    fn create_render_pass(&self, color: ColorFormat, depth: DepthFormat) -> Result<RenderPassHandle>;

    fn destroy_render_pass(&self, render_pass: RenderPassHandle);

    /// Create a framebuffer
    ///
    /// # Arguments
    ///
    /// * `render_pass` - Render pass the framebuffer is compatible with
    /// * `attachments` - Color view then depth view
    /// * `extent` - Framebuffer size
    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        extent: Extent2D,
    ) -> Result<FramebufferHandle>;

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle);

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Result<SemaphoreHandle>;

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<FenceHandle>;

    fn destroy_fence(&self, fence: FenceHandle);

    /// Block until the fence is signaled (no timeout)
    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()>;

    fn reset_fence(&self, fence: FenceHandle) -> Result<()>;

    // ===== QUEUE =====

    /// Acquire the next presentable image
    ///
    /// # Arguments
    ///
    /// * `swapchain` - Swapchain to acquire from
    /// * `signal` - Semaphore signaled when the image is ready to be rendered to
    ///
    /// # Returns
    ///
    /// The image index and the surface status. The index is meaningless
    /// when the status is `OutOfDate`.
    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
    ) -> Result<(u32, SurfaceStatus)>;

    /// Submit command buffers to the graphics queue
    ///
    /// Execution waits on `wait` at the color-attachment-output stage;
    /// `signal` and `fence` are signaled on completion.
    fn submit(
        &self,
        command_buffers: &[CommandBufferHandle],
        wait: SemaphoreHandle,
        signal: SemaphoreHandle,
        fence: FenceHandle,
    ) -> Result<()>;

    /// Queue presentation of an image once `wait` is signaled
    fn present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<SurfaceStatus>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;

    // ===== COMMAND BUFFERS =====

    /// Allocate primary command buffers
    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<CommandBufferHandle>>;

    fn free_command_buffers(&self, command_buffers: &[CommandBufferHandle]);

    /// Begin one-time-submit recording (previous contents are discarded)
    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, desc: &RenderPassBeginDesc);

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle);

    fn cmd_set_viewport(&self, command_buffer: CommandBufferHandle, viewport: Viewport);

    fn cmd_set_scissor(&self, command_buffer: CommandBufferHandle, scissor: Rect2D);
}
