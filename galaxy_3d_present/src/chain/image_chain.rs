/// ImageChain - presentable images, their attachments and per-frame synchronization
///
/// A chain is immutable once built: resizing builds a new chain that consumes
/// the previous one (its swapchain is handed to the driver as "old") and drops
/// it once the new resources are live.

use std::sync::Arc;

use crate::chain::negotiation::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, find_depth_format,
};
use crate::config::ChainConfig;
use crate::device::{
    ChainFormats, ColorFormat, CommandBufferHandle, DepthAttachment, DepthFormat, Extent2D,
    FenceHandle, FramebufferHandle, GraphicsDevice, ImageHandle, ImageViewHandle, PresentMode,
    RenderPassHandle, SemaphoreHandle, SurfaceFormat, SurfaceStatus, SwapchainDesc, SwapchainHandle,
};
use crate::error::Result;
use crate::{engine_bail, engine_debug, engine_info, engine_trace};

/// Maximum number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Chain of presentable images
pub struct ImageChain {
    device: Arc<dyn GraphicsDevice>,

    swapchain: SwapchainHandle,
    surface_format: SurfaceFormat,
    depth_format: DepthFormat,
    present_mode: PresentMode,
    extent: Extent2D,

    /// Owned by the swapchain (not destroyed individually)
    images: Vec<ImageHandle>,
    image_views: Vec<ImageViewHandle>,
    depth_attachments: Vec<DepthAttachment>,
    render_pass: RenderPassHandle,
    framebuffers: Vec<FramebufferHandle>,

    /// One per frame-in-flight
    image_available_semaphores: Vec<SemaphoreHandle>,
    render_finished_semaphores: Vec<SemaphoreHandle>,
    in_flight_fences: Vec<FenceHandle>,

    /// In-flight fence that last rendered to each image (NULL = none yet)
    images_in_flight: Vec<FenceHandle>,

    current_frame: usize,
}

impl ImageChain {
    /// Build the first chain for the device's surface
    ///
    /// # Arguments
    ///
    /// * `device` - Device bound to the presentation surface
    /// * `window_extent` - Current drawable size, used when the surface lets the application choose
    /// * `config` - Present mode preference and depth candidates
    pub fn new(device: Arc<dyn GraphicsDevice>, window_extent: Extent2D, config: &ChainConfig) -> Result<Self> {
        Self::build(device, window_extent, config, None)
    }

    /// Build a chain replacing `previous`
    ///
    /// The previous swapchain is passed to the driver so in-flight presentation
    /// can complete, then `previous` is dropped once the new chain is complete.
    /// The caller must make sure the device is idle.
    pub fn with_previous(
        device: Arc<dyn GraphicsDevice>,
        window_extent: Extent2D,
        config: &ChainConfig,
        previous: ImageChain,
    ) -> Result<Self> {
        Self::build(device, window_extent, config, Some(previous))
    }

    fn build(
        device: Arc<dyn GraphicsDevice>,
        window_extent: Extent2D,
        config: &ChainConfig,
        previous: Option<ImageChain>,
    ) -> Result<Self> {
        let support = device.surface_support()?;
        let surface_format = choose_surface_format(&support.formats)?;
        let present_mode = choose_present_mode(&support.present_modes, config.present_mode_preference);
        let extent = choose_extent(&support.capabilities, window_extent);
        let image_count = choose_image_count(&support.capabilities);
        let depth_format = find_depth_format(device.as_ref(), &config.depth_format_candidates)?;

        engine_debug!(
            "galaxy3d::ImageChain",
            "Negotiated {:?} / {:?}, {:?}, {}x{}, {} images, depth {:?}",
            surface_format.format, surface_format.color_space, present_mode,
            extent.width, extent.height, image_count, depth_format
        );

        // Every handle starts NULL so Drop can release a partially built chain
        let mut chain = Self {
            device,
            swapchain: SwapchainHandle::NULL,
            surface_format,
            depth_format,
            present_mode,
            extent,
            images: Vec::new(),
            image_views: Vec::new(),
            depth_attachments: Vec::new(),
            render_pass: RenderPassHandle::NULL,
            framebuffers: Vec::new(),
            image_available_semaphores: Vec::new(),
            render_finished_semaphores: Vec::new(),
            in_flight_fences: Vec::new(),
            images_in_flight: Vec::new(),
            current_frame: 0,
        };

        let old_swapchain = previous.as_ref().map_or(SwapchainHandle::NULL, |p| p.swapchain);
        chain.create_swapchain(image_count, old_swapchain)?;
        chain.create_image_views()?;
        chain.create_depth_attachments()?;
        chain.create_render_pass()?;
        chain.create_framebuffers()?;
        chain.create_sync_objects()?;

        // The retired chain goes away only now that its replacement is live
        drop(previous);

        engine_info!(
            "galaxy3d::ImageChain",
            "Created image chain: {} images {}x{} ({:?}, {:?})",
            chain.images.len(), extent.width, extent.height, surface_format.format, present_mode
        );

        Ok(chain)
    }

    fn create_swapchain(&mut self, image_count: u32, old: SwapchainHandle) -> Result<()> {
        let desc = SwapchainDesc {
            image_count,
            surface_format: self.surface_format,
            present_mode: self.present_mode,
            extent: self.extent,
        };
        self.swapchain = self.device.create_swapchain(&desc, old)?;
        // The driver may create more images than requested, never fewer
        self.images = self.device.swapchain_images(self.swapchain)?;
        if self.images.len() < image_count as usize {
            engine_bail!(
                "galaxy3d::ImageChain",
                "Swapchain returned {} image(s), {} requested",
                self.images.len(), image_count
            );
        }
        self.images_in_flight = vec![FenceHandle::NULL; self.images.len()];
        Ok(())
    }

    fn create_image_views(&mut self) -> Result<()> {
        for i in 0..self.images.len() {
            let view = self.device.create_color_view(self.images[i], self.surface_format.format)?;
            self.image_views.push(view);
        }
        Ok(())
    }

    fn create_depth_attachments(&mut self) -> Result<()> {
        for _ in 0..self.images.len() {
            let attachment = self.device.create_depth_attachment(self.depth_format, self.extent)?;
            self.depth_attachments.push(attachment);
        }
        Ok(())
    }

    fn create_render_pass(&mut self) -> Result<()> {
        self.render_pass = self.device.create_render_pass(self.surface_format.format, self.depth_format)?;
        Ok(())
    }

    fn create_framebuffers(&mut self) -> Result<()> {
        for i in 0..self.images.len() {
            let attachments = [self.image_views[i], self.depth_attachments[i].view];
            let framebuffer = self.device.create_framebuffer(self.render_pass, &attachments, self.extent)?;
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn create_sync_objects(&mut self) -> Result<()> {
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let image_available = self.device.create_semaphore()?;
            self.image_available_semaphores.push(image_available);
            let render_finished = self.device.create_semaphore()?;
            self.render_finished_semaphores.push(render_finished);
            // Signaled so the first wait on each frame slot returns immediately
            let fence = self.device.create_fence(true)?;
            self.in_flight_fences.push(fence);
        }
        Ok(())
    }

    // ===== FRAME PROTOCOL =====

    /// Wait for the current frame slot to be free, then acquire the next image
    ///
    /// Signals the current frame's image-available semaphore. The returned
    /// index is meaningless when the status is `OutOfDate`.
    pub fn acquire_next_image(&self) -> Result<(u32, SurfaceStatus)> {
        self.device.wait_for_fence(self.in_flight_fences[self.current_frame])?;
        let (image_index, status) = self
            .device
            .acquire_next_image(self.swapchain, self.image_available_semaphores[self.current_frame])?;
        engine_trace!(
            "galaxy3d::ImageChain",
            "Frame {} acquired image {} ({:?})",
            self.current_frame, image_index, status
        );
        Ok((image_index, status))
    }

    /// Submit recorded command buffers for the acquired image and queue its presentation
    ///
    /// Waits for the fence of whichever frame last rendered to this image,
    /// then submits with the current frame's fence. Advances to the next
    /// frame slot when the image was presented (`Optimal` or `Suboptimal`);
    /// `OutOfDate` and fatal errors leave the slot unchanged.
    ///
    /// # Panics
    ///
    /// If `image_index` is not an image of this chain.
    pub fn submit_command_buffers(
        &mut self,
        command_buffers: &[CommandBufferHandle],
        image_index: u32,
    ) -> Result<SurfaceStatus> {
        let image = image_index as usize;
        assert!(image < self.images.len(), "Image index {} out of range ({} images)", image_index, self.images.len());

        let frame = self.current_frame;
        let fence = self.in_flight_fences[frame];

        let previous_fence = self.images_in_flight[image];
        if !previous_fence.is_null() {
            self.device.wait_for_fence(previous_fence)?;
        }
        self.images_in_flight[image] = fence;

        self.device.reset_fence(fence)?;
        self.device.submit(
            command_buffers,
            self.image_available_semaphores[frame],
            self.render_finished_semaphores[frame],
            fence,
        )?;

        let status = self
            .device
            .present(self.swapchain, image_index, self.render_finished_semaphores[frame])?;

        if status != SurfaceStatus::OutOfDate {
            self.current_frame = (frame + 1) % MAX_FRAMES_IN_FLIGHT;
        }
        Ok(status)
    }

    // ===== ACCESSORS =====

    pub fn render_pass(&self) -> RenderPassHandle {
        self.render_pass
    }

    pub fn framebuffer(&self, index: usize) -> FramebufferHandle {
        self.framebuffers[index]
    }

    pub fn image_view(&self, index: usize) -> ImageViewHandle {
        self.image_views[index]
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn extent_aspect_ratio(&self) -> f32 {
        self.extent.aspect_ratio()
    }

    pub fn color_format(&self) -> ColorFormat {
        self.surface_format.format
    }

    pub fn depth_format(&self) -> DepthFormat {
        self.depth_format
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    pub fn formats(&self) -> ChainFormats {
        ChainFormats {
            color: self.surface_format.format,
            depth: self.depth_format,
        }
    }

    /// Current frame-in-flight slot in `[0, MAX_FRAMES_IN_FLIGHT)`
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }
}

impl Drop for ImageChain {
    fn drop(&mut self) {
        let device = &self.device;

        for view in self.image_views.drain(..) {
            device.destroy_image_view(view);
        }

        if !self.swapchain.is_null() {
            device.destroy_swapchain(self.swapchain);
            self.swapchain = SwapchainHandle::NULL;
        }

        for attachment in self.depth_attachments.drain(..) {
            device.destroy_depth_attachment(attachment);
        }

        for framebuffer in self.framebuffers.drain(..) {
            device.destroy_framebuffer(framebuffer);
        }

        if !self.render_pass.is_null() {
            device.destroy_render_pass(self.render_pass);
            self.render_pass = RenderPassHandle::NULL;
        }

        for semaphore in self.image_available_semaphores.drain(..) {
            device.destroy_semaphore(semaphore);
        }
        for semaphore in self.render_finished_semaphores.drain(..) {
            device.destroy_semaphore(semaphore);
        }
        for fence in self.in_flight_fences.drain(..) {
            device.destroy_fence(fence);
        }

        engine_debug!("galaxy3d::ImageChain", "Destroyed image chain ({} images)", self.images.len());
        self.images.clear();
    }
}

#[cfg(test)]
#[path = "image_chain_tests.rs"]
mod tests;
