/// FrameOrchestrator - begin/end frame protocol and image chain recreation
///
/// States: IDLE -> (begin_frame) -> FRAME_OPEN -> (end_frame) -> IDLE.
/// Calling an operation in the wrong state is a programming error and panics.
/// Surface staleness (out-of-date, suboptimal, resized window) is handled here
/// by recreating the image chain; only fatal device errors reach the host.

use std::sync::Arc;

use crate::chain::{ImageChain, MAX_FRAMES_IN_FLIGHT};
use crate::config::{ChainConfig, FormatChangePolicy};
use crate::device::{
    ClearValue, CommandBufferHandle, Extent2D, GraphicsDevice, Rect2D, RenderPassBeginDesc,
    RenderPassHandle, SurfaceStatus, Viewport,
};
use crate::error::{Error, Result};
use crate::surface::PresentableSurface;
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

/// Drives the per-frame command buffers and the image chain
pub struct FrameOrchestrator {
    device: Arc<dyn GraphicsDevice>,
    config: ChainConfig,

    /// None only after a failed recreation (the orchestrator is then unusable)
    image_chain: Option<ImageChain>,

    /// One per frame-in-flight slot
    command_buffers: Vec<CommandBufferHandle>,

    current_image_index: u32,
    current_frame_index: usize,
    is_frame_started: bool,

    recreation_count: u64,
    format_generation: u64,
}

impl FrameOrchestrator {
    /// Build the first image chain and allocate the per-frame command buffers
    ///
    /// Blocks while the surface is minimized.
    ///
    /// # Arguments
    ///
    /// * `device` - Device bound to `surface`
    /// * `surface` - Host window
    /// * `config` - Image chain configuration
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        surface: &mut dyn PresentableSurface,
        config: ChainConfig,
    ) -> Result<Self> {
        let extent = Self::wait_for_drawable_extent(surface);
        let image_chain = ImageChain::new(device.clone(), extent, &config)?;
        surface.reset_resized_flag();
        let command_buffers = device.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;

        engine_info!(
            "galaxy3d::FrameOrchestrator",
            "Frame orchestrator ready ({} frames in flight)",
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            device,
            config,
            image_chain: Some(image_chain),
            command_buffers,
            current_image_index: 0,
            current_frame_index: 0,
            is_frame_started: false,
            recreation_count: 0,
            format_generation: 0,
        })
    }

    // ===== FRAME PROTOCOL =====

    /// Acquire the next image and open the current frame's command buffer
    ///
    /// # Returns
    ///
    /// The open command buffer, or `None` when the chain was out of date and
    /// has been recreated (the caller skips this tick).
    ///
    /// # Panics
    ///
    /// If a frame is already in progress.
    pub fn begin_frame(&mut self, surface: &mut dyn PresentableSurface) -> Result<Option<CommandBufferHandle>> {
        assert!(!self.is_frame_started, "Can't call begin_frame while a frame is already in progress");

        let (image_index, status) = self.chain().acquire_next_image()?;
        if status == SurfaceStatus::OutOfDate {
            engine_debug!("galaxy3d::FrameOrchestrator", "Image chain out of date on acquire");
            self.recreate_image_chain(surface)?;
            return Ok(None);
        }

        self.current_image_index = image_index;
        let command_buffer = self.command_buffers[self.current_frame_index];
        self.device.begin_command_buffer(command_buffer)?;
        self.is_frame_started = true;

        engine_trace!(
            "galaxy3d::FrameOrchestrator",
            "Begin frame {} (image {})",
            self.current_frame_index, image_index
        );
        Ok(Some(command_buffer))
    }

    /// Close the command buffer, submit it and queue presentation
    ///
    /// Recreates the image chain when presentation reports a stale chain or
    /// the surface was resized.
    ///
    /// # Panics
    ///
    /// If no frame is in progress.
    pub fn end_frame(&mut self, surface: &mut dyn PresentableSurface) -> Result<()> {
        assert!(self.is_frame_started, "Can't call end_frame while frame is not in progress");

        let command_buffer = self.command_buffers[self.current_frame_index];
        self.device.end_command_buffer(command_buffer)?;

        let image_index = self.current_image_index;
        let status = self.chain_mut().submit_command_buffers(&[command_buffer], image_index)?;
        self.is_frame_started = false;

        if status.is_stale() || surface.was_resized() {
            engine_debug!(
                "galaxy3d::FrameOrchestrator",
                "Image chain stale after present ({:?}, resized: {})",
                status, surface.was_resized()
            );
            self.recreate_image_chain(surface)?;
        }

        self.current_frame_index = (self.current_frame_index + 1) % MAX_FRAMES_IN_FLIGHT;
        Ok(())
    }

    /// Begin the render pass on the acquired image, with full-surface viewport and scissor
    ///
    /// # Panics
    ///
    /// If no frame is in progress or `command_buffer` is not the current frame's.
    pub fn begin_render_pass_scope(&self, command_buffer: CommandBufferHandle) {
        assert!(self.is_frame_started, "Can't begin render pass when frame not in progress");
        assert!(
            command_buffer == self.current_command_buffer(),
            "Can't begin render pass on command buffer from a different frame"
        );

        let chain = self.chain();
        let extent = chain.extent();
        let desc = RenderPassBeginDesc {
            render_pass: chain.render_pass(),
            framebuffer: chain.framebuffer(self.current_image_index as usize),
            extent,
            clear_values: [
                ClearValue::Color(self.config.clear_color),
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            ],
        };

        self.device.cmd_begin_render_pass(command_buffer, &desc);
        self.device.cmd_set_viewport(command_buffer, Viewport::full(extent));
        self.device.cmd_set_scissor(command_buffer, Rect2D::full(extent));
    }

    /// End the render pass begun by `begin_render_pass_scope`
    ///
    /// # Panics
    ///
    /// If no frame is in progress or `command_buffer` is not the current frame's.
    pub fn end_render_pass_scope(&self, command_buffer: CommandBufferHandle) {
        assert!(self.is_frame_started, "Can't end render pass when frame not in progress");
        assert!(
            command_buffer == self.current_command_buffer(),
            "Can't end render pass on command buffer from a different frame"
        );

        self.device.cmd_end_render_pass(command_buffer);
    }

    // ===== RECREATION =====

    /// Rebuild the image chain for the surface's current extent and clear its resize flag
    fn recreate_image_chain(&mut self, surface: &mut dyn PresentableSurface) -> Result<()> {
        let extent = Self::wait_for_drawable_extent(surface);
        self.device.wait_idle()?;

        let previous = match self.image_chain.take() {
            Some(chain) => chain,
            None => panic!("FrameOrchestrator used after a failed image chain recreation"),
        };
        let previous_formats = previous.formats();

        let chain = ImageChain::with_previous(self.device.clone(), extent, &self.config, previous)?;
        let current_formats = chain.formats();
        self.image_chain = Some(chain);
        self.recreation_count += 1;
        // Covers resizes seen before the rebuild and during the minimize wait
        surface.reset_resized_flag();

        if !previous_formats.is_compatible(&current_formats) {
            match self.config.format_change_policy {
                FormatChangePolicy::Fatal => {
                    engine_error!(
                        "galaxy3d::FrameOrchestrator",
                        "Image chain format changed on recreation: {:?} -> {:?}",
                        previous_formats, current_formats
                    );
                    return Err(Error::IncompatibleChainFormat {
                        previous: previous_formats,
                        current: current_formats,
                    });
                }
                FormatChangePolicy::Notify => {
                    self.format_generation += 1;
                    engine_warn!(
                        "galaxy3d::FrameOrchestrator",
                        "Image chain format changed on recreation: {:?} -> {:?} (generation {})",
                        previous_formats, current_formats, self.format_generation
                    );
                }
            }
        }

        engine_info!(
            "galaxy3d::FrameOrchestrator",
            "Recreated image chain {}x{} (recreation #{})",
            extent.width, extent.height, self.recreation_count
        );
        Ok(())
    }

    /// Block on OS events while the surface has no drawable area (minimized)
    fn wait_for_drawable_extent(surface: &mut dyn PresentableSurface) -> Extent2D {
        let mut extent = surface.extent();
        while extent.is_zero() {
            surface.wait_events();
            extent = surface.extent();
        }
        extent
    }

    // ===== ACCESSORS =====

    fn chain(&self) -> &ImageChain {
        match &self.image_chain {
            Some(chain) => chain,
            None => panic!("FrameOrchestrator used after a failed image chain recreation"),
        }
    }

    fn chain_mut(&mut self) -> &mut ImageChain {
        match &mut self.image_chain {
            Some(chain) => chain,
            None => panic!("FrameOrchestrator used after a failed image chain recreation"),
        }
    }

    pub fn is_frame_in_progress(&self) -> bool {
        self.is_frame_started
    }

    /// # Panics
    ///
    /// If no frame is in progress.
    pub fn current_command_buffer(&self) -> CommandBufferHandle {
        assert!(self.is_frame_started, "Cannot get command buffer when frame not in progress");
        self.command_buffers[self.current_frame_index]
    }

    /// Frame-in-flight slot of the open frame, in `[0, MAX_FRAMES_IN_FLIGHT)`
    ///
    /// # Panics
    ///
    /// If no frame is in progress.
    pub fn frame_index(&self) -> usize {
        assert!(self.is_frame_started, "Cannot get frame index when frame not in progress");
        self.current_frame_index
    }

    pub fn render_pass(&self) -> RenderPassHandle {
        self.chain().render_pass()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.chain().extent_aspect_ratio()
    }

    pub fn extent(&self) -> Extent2D {
        self.chain().extent()
    }

    /// Number of image chain recreations since construction
    pub fn recreation_count(&self) -> u64 {
        self.recreation_count
    }

    /// Bumped each time a recreation changes the chain formats (`FormatChangePolicy::Notify`)
    ///
    /// Renderers compare it with the value their pipelines were built for.
    pub fn format_generation(&self) -> u64 {
        self.format_generation
    }

    pub fn image_chain(&self) -> &ImageChain {
        self.chain()
    }
}

impl Drop for FrameOrchestrator {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            engine_error!("galaxy3d::FrameOrchestrator", "Failed to wait idle on shutdown: {}", e);
        }
        self.device.free_command_buffers(&self.command_buffers);
        self.command_buffers.clear();
        self.image_chain = None;
    }
}

#[cfg(test)]
#[path = "frame_orchestrator_tests.rs"]
mod tests;
