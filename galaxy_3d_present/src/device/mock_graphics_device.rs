/// Mock graphics device for unit tests (no GPU required)
///
/// Records every call, hands out unique handles and simulates fences:
/// a submitted fence stays pending until someone waits on it (or on the device).
/// Ordering mistakes that would be undefined behavior on a real GPU are
/// collected as violations instead of crashing:
/// - resetting or destroying a fence whose work was never observed
/// - submitting with a fence that was not reset
/// - rendering to an image whose previous fence was never observed
/// - recording into a command buffer that is not recording
///
/// Surface support, acquire/present statuses and failures are scriptable.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::device::*;
use crate::error::{Error, Result};

/// Simulated fence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFenceState {
    /// Reset (or created unsignaled), no work attached
    Unsignaled,
    /// Submitted, completion not yet observed by the CPU
    Pending,
    /// Signaled and observed (or created signaled)
    Signaled,
}

#[derive(Debug)]
struct MockSwapchain {
    images: Vec<ImageHandle>,
    next_image: u32,
}

#[derive(Debug)]
struct MockState {
    next_handle: u64,
    calls: Vec<String>,
    violations: Vec<String>,

    // Surface
    capabilities: SurfaceCapabilities,
    formats: Vec<SurfaceFormat>,
    present_modes: Vec<PresentMode>,
    supported_depth_formats: Vec<DepthFormat>,
    /// Images actually created per swapchain, regardless of the requested count
    created_image_count: Option<u32>,

    // Scripts
    acquire_script: VecDeque<SurfaceStatus>,
    present_script: VecDeque<SurfaceStatus>,
    failures: HashMap<&'static str, Error>,

    // Objects
    live: HashMap<u64, &'static str>,
    swapchains: HashMap<u64, MockSwapchain>,
    fences: HashMap<u64, MockFenceState>,
    recording: HashSet<u64>,
    image_fences: HashMap<(u64, u32), FenceHandle>,
    last_acquired: Option<(SwapchainHandle, u32)>,

    // Recorded parameters
    swapchain_descs: Vec<(SwapchainDesc, SwapchainHandle)>,
    acquired_images: Vec<u32>,
    submitted_fences: Vec<FenceHandle>,
    fence_waits: Vec<FenceHandle>,
    render_pass_begins: Vec<RenderPassBeginDesc>,
    viewports: Vec<Viewport>,
    scissors: Vec<Rect2D>,
}

/// Mock graphics device
#[derive(Debug)]
pub struct MockGraphicsDevice {
    state: Mutex<MockState>,
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGraphicsDevice {
    /// 1280x720 surface, 2..8 images, B8G8R8A8_SRGB + UNORM, mailbox + FIFO,
    /// every depth format supported
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_handle: 1,
                calls: Vec::new(),
                violations: Vec::new(),
                capabilities: SurfaceCapabilities {
                    min_image_count: 2,
                    max_image_count: 8,
                    current_extent: Extent2D::new(1280, 720),
                    min_image_extent: Extent2D::new(1, 1),
                    max_image_extent: Extent2D::new(4096, 4096),
                },
                formats: vec![
                    SurfaceFormat { format: ColorFormat::B8G8R8A8_UNORM, color_space: ColorSpace::SrgbNonlinear },
                    SurfaceFormat { format: ColorFormat::B8G8R8A8_SRGB, color_space: ColorSpace::SrgbNonlinear },
                ],
                present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
                supported_depth_formats: vec![
                    DepthFormat::D32Float,
                    DepthFormat::D32FloatS8Uint,
                    DepthFormat::D24UnormS8Uint,
                    DepthFormat::D16Unorm,
                ],
                created_image_count: None,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                failures: HashMap::new(),
                live: HashMap::new(),
                swapchains: HashMap::new(),
                fences: HashMap::new(),
                recording: HashSet::new(),
                image_fences: HashMap::new(),
                last_acquired: None,
                swapchain_descs: Vec::new(),
                acquired_images: Vec::new(),
                submitted_fences: Vec::new(),
                fence_waits: Vec::new(),
                render_pass_begins: Vec::new(),
                viewports: Vec::new(),
                scissors: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    // ===== SCRIPTING =====

    pub fn set_surface_extent(&self, extent: Extent2D) {
        self.lock().capabilities.current_extent = extent;
    }

    pub fn set_capabilities(&self, capabilities: SurfaceCapabilities) {
        self.lock().capabilities = capabilities;
    }

    pub fn set_image_count_limits(&self, min: u32, max: u32) {
        let mut state = self.lock();
        state.capabilities.min_image_count = min;
        state.capabilities.max_image_count = max;
    }

    pub fn set_surface_formats(&self, formats: Vec<SurfaceFormat>) {
        self.lock().formats = formats;
    }

    pub fn set_present_modes(&self, present_modes: Vec<PresentMode>) {
        self.lock().present_modes = present_modes;
    }

    pub fn set_supported_depth_formats(&self, formats: Vec<DepthFormat>) {
        self.lock().supported_depth_formats = formats;
    }

    /// Create `count` images per swapchain instead of the requested number
    pub fn set_created_image_count(&self, count: Option<u32>) {
        self.lock().created_image_count = count;
    }

    /// Status returned by the next acquire calls, in order (then Optimal)
    pub fn push_acquire_status(&self, status: SurfaceStatus) {
        self.lock().acquire_script.push_back(status);
    }

    /// Status returned by the next present calls, in order (then Optimal)
    pub fn push_present_status(&self, status: SurfaceStatus) {
        self.lock().present_script.push_back(status);
    }

    /// Make the next call to `operation` fail with `error`
    pub fn fail_next(&self, operation: &'static str, error: Error) {
        self.lock().failures.insert(operation, error);
    }

    // ===== INSPECTION =====

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|call| call.as_str() == operation).count()
    }

    pub fn violations(&self) -> Vec<String> {
        self.lock().violations.clone()
    }

    /// Number of objects created and not yet destroyed
    pub fn live_object_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn live_count_of(&self, kind: &str) -> usize {
        self.lock().live.values().filter(|k| **k == kind).count()
    }

    pub fn fence_state(&self, fence: FenceHandle) -> Option<MockFenceState> {
        self.lock().fences.get(&fence.as_raw()).copied()
    }

    /// Every swapchain creation with the `old` handle it received
    pub fn swapchain_descs(&self) -> Vec<(SwapchainDesc, SwapchainHandle)> {
        self.lock().swapchain_descs.clone()
    }

    pub fn acquired_images(&self) -> Vec<u32> {
        self.lock().acquired_images.clone()
    }

    pub fn submitted_fences(&self) -> Vec<FenceHandle> {
        self.lock().submitted_fences.clone()
    }

    pub fn fence_waits(&self) -> Vec<FenceHandle> {
        self.lock().fence_waits.clone()
    }

    pub fn render_pass_begins(&self) -> Vec<RenderPassBeginDesc> {
        self.lock().render_pass_begins.clone()
    }

    pub fn viewports(&self) -> Vec<Viewport> {
        self.lock().viewports.clone()
    }

    pub fn scissors(&self) -> Vec<Rect2D> {
        self.lock().scissors.clone()
    }
}

impl MockState {
    fn call(&mut self, operation: &'static str) -> Result<()> {
        self.calls.push(operation.to_string());
        match self.failures.remove(operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn alloc(&mut self, kind: &'static str) -> u64 {
        let raw = self.next_handle;
        self.next_handle += 1;
        self.live.insert(raw, kind);
        raw
    }

    fn release(&mut self, raw: u64, kind: &'static str) {
        match self.live.remove(&raw) {
            Some(k) if k == kind => {}
            Some(k) => self.violations.push(format!("destroy_{} called on a {} handle {}", kind, k, raw)),
            None => self.violations.push(format!("destroy_{} called on unknown handle {}", kind, raw)),
        }
    }

    fn check_recording(&mut self, command_buffer: CommandBufferHandle, operation: &str) {
        if !self.recording.contains(&command_buffer.as_raw()) {
            self.violations.push(format!(
                "{} on command buffer {} which is not recording",
                operation,
                command_buffer.as_raw()
            ));
        }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn surface_support(&self) -> Result<SurfaceSupport> {
        let mut state = self.lock();
        state.call("surface_support")?;
        Ok(SurfaceSupport {
            capabilities: state.capabilities,
            formats: state.formats.clone(),
            present_modes: state.present_modes.clone(),
        })
    }

    fn supports_depth_attachment(&self, format: DepthFormat) -> bool {
        let mut state = self.lock();
        state.calls.push("supports_depth_attachment".to_string());
        state.supported_depth_formats.contains(&format)
    }

    fn create_swapchain(&self, desc: &SwapchainDesc, old: SwapchainHandle) -> Result<SwapchainHandle> {
        let mut state = self.lock();
        state.call("create_swapchain")?;
        if !old.is_null() && !state.swapchains.contains_key(&old.as_raw()) {
            state.violations.push(format!("create_swapchain with dead old swapchain {}", old.as_raw()));
        }
        let raw = state.alloc("swapchain");
        let image_count = state.created_image_count.unwrap_or(desc.image_count);
        let images = (0..image_count)
            .map(|_| {
                let image = ImageHandle::from_raw(state.next_handle);
                state.next_handle += 1;
                image
            })
            .collect();
        state.swapchains.insert(raw, MockSwapchain { images, next_image: 0 });
        state.swapchain_descs.push((*desc, old));
        Ok(SwapchainHandle::from_raw(raw))
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        let mut state = self.lock();
        state.call("swapchain_images")?;
        state
            .swapchains
            .get(&swapchain.as_raw())
            .map(|s| s.images.clone())
            .ok_or_else(|| Error::InvalidResource(format!("unknown swapchain {}", swapchain.as_raw())))
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        let mut state = self.lock();
        state.calls.push("destroy_swapchain".to_string());
        state.swapchains.remove(&swapchain.as_raw());
        state.release(swapchain.as_raw(), "swapchain");
    }

    fn create_color_view(&self, image: ImageHandle, _format: ColorFormat) -> Result<ImageViewHandle> {
        let mut state = self.lock();
        state.call("create_color_view")?;
        if image.is_null() {
            state.violations.push("create_color_view on a null image".to_string());
        }
        Ok(ImageViewHandle::from_raw(state.alloc("image_view")))
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        let mut state = self.lock();
        state.calls.push("destroy_image_view".to_string());
        state.release(view.as_raw(), "image_view");
    }

    fn create_depth_attachment(&self, format: DepthFormat, _extent: Extent2D) -> Result<DepthAttachment> {
        let mut state = self.lock();
        state.call("create_depth_attachment")?;
        if !state.supported_depth_formats.contains(&format) {
            state.violations.push(format!("create_depth_attachment with unsupported {:?}", format));
        }
        let image = ImageHandle::from_raw(state.alloc("depth_image"));
        let view = ImageViewHandle::from_raw(state.alloc("depth_view"));
        Ok(DepthAttachment { image, view })
    }

    fn destroy_depth_attachment(&self, attachment: DepthAttachment) {
        let mut state = self.lock();
        state.calls.push("destroy_depth_attachment".to_string());
        state.release(attachment.view.as_raw(), "depth_view");
        state.release(attachment.image.as_raw(), "depth_image");
    }

    fn create_render_pass(&self, _color: ColorFormat, _depth: DepthFormat) -> Result<RenderPassHandle> {
        let mut state = self.lock();
        state.call("create_render_pass")?;
        Ok(RenderPassHandle::from_raw(state.alloc("render_pass")))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        let mut state = self.lock();
        state.calls.push("destroy_render_pass".to_string());
        state.release(render_pass.as_raw(), "render_pass");
    }

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        _extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let mut state = self.lock();
        state.call("create_framebuffer")?;
        if !state.live.contains_key(&render_pass.as_raw()) {
            state.violations.push("create_framebuffer with a dead render pass".to_string());
        }
        if attachments.iter().any(|view| !state.live.contains_key(&view.as_raw())) {
            state.violations.push("create_framebuffer with a dead attachment".to_string());
        }
        Ok(FramebufferHandle::from_raw(state.alloc("framebuffer")))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut state = self.lock();
        state.calls.push("destroy_framebuffer".to_string());
        state.release(framebuffer.as_raw(), "framebuffer");
    }

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let mut state = self.lock();
        state.call("create_semaphore")?;
        Ok(SemaphoreHandle::from_raw(state.alloc("semaphore")))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        let mut state = self.lock();
        state.calls.push("destroy_semaphore".to_string());
        state.release(semaphore.as_raw(), "semaphore");
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let mut state = self.lock();
        state.call("create_fence")?;
        let raw = state.alloc("fence");
        let initial = if signaled { MockFenceState::Signaled } else { MockFenceState::Unsignaled };
        state.fences.insert(raw, initial);
        Ok(FenceHandle::from_raw(raw))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        let mut state = self.lock();
        state.calls.push("destroy_fence".to_string());
        if state.fences.remove(&fence.as_raw()) == Some(MockFenceState::Pending) {
            state.violations.push(format!("fence {} destroyed while its work is pending", fence.as_raw()));
        }
        state.release(fence.as_raw(), "fence");
    }

    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut state = self.lock();
        state.call("wait_for_fence")?;
        state.fence_waits.push(fence);
        match state.fences.get(&fence.as_raw()).copied() {
            Some(MockFenceState::Pending) | Some(MockFenceState::Signaled) => {
                state.fences.insert(fence.as_raw(), MockFenceState::Signaled);
            }
            Some(MockFenceState::Unsignaled) => {
                state.violations.push(format!("wait on fence {} that will never signal", fence.as_raw()));
            }
            None => {
                state.violations.push(format!("wait on unknown fence {}", fence.as_raw()));
            }
        }
        Ok(())
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut state = self.lock();
        state.call("reset_fence")?;
        if state.fences.get(&fence.as_raw()) == Some(&MockFenceState::Pending) {
            state.violations.push(format!("reset of fence {} whose work was never observed", fence.as_raw()));
        }
        state.fences.insert(fence.as_raw(), MockFenceState::Unsignaled);
        Ok(())
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        _signal: SemaphoreHandle,
    ) -> Result<(u32, SurfaceStatus)> {
        let mut state = self.lock();
        state.call("acquire_next_image")?;
        let status = state.acquire_script.pop_front().unwrap_or(SurfaceStatus::Optimal);
        if status == SurfaceStatus::OutOfDate {
            return Ok((0, status));
        }
        let index = match state.swapchains.get_mut(&swapchain.as_raw()) {
            Some(chain) => {
                let index = chain.next_image;
                chain.next_image = (index + 1) % chain.images.len() as u32;
                index
            }
            None => return Err(Error::InvalidResource(format!("unknown swapchain {}", swapchain.as_raw()))),
        };
        state.last_acquired = Some((swapchain, index));
        state.acquired_images.push(index);
        Ok((index, status))
    }

    fn submit(
        &self,
        command_buffers: &[CommandBufferHandle],
        _wait: SemaphoreHandle,
        _signal: SemaphoreHandle,
        fence: FenceHandle,
    ) -> Result<()> {
        let mut state = self.lock();
        state.call("submit")?;
        for cb in command_buffers {
            if state.recording.contains(&cb.as_raw()) {
                state.violations.push(format!("submit of command buffer {} still recording", cb.as_raw()));
            }
        }
        if state.fences.get(&fence.as_raw()) != Some(&MockFenceState::Unsignaled) {
            state.violations.push(format!("submit with fence {} that was not reset", fence.as_raw()));
        }
        match state.last_acquired.take() {
            Some((swapchain, image)) => {
                let key = (swapchain.as_raw(), image);
                if let Some(previous) = state.image_fences.get(&key).copied() {
                    if state.fences.get(&previous.as_raw()) == Some(&MockFenceState::Pending) {
                        state.violations.push(format!(
                            "image {} reused before fence {} was observed",
                            image,
                            previous.as_raw()
                        ));
                    }
                }
                state.image_fences.insert(key, fence);
            }
            None => state.violations.push("submit without an acquired image".to_string()),
        }
        state.fences.insert(fence.as_raw(), MockFenceState::Pending);
        state.submitted_fences.push(fence);
        Ok(())
    }

    fn present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        _wait: SemaphoreHandle,
    ) -> Result<SurfaceStatus> {
        let mut state = self.lock();
        state.call("present")?;
        let image_count = state.swapchains.get(&swapchain.as_raw()).map(|s| s.images.len() as u32);
        match image_count {
            Some(count) if image_index < count => {}
            _ => state.violations.push(format!("present of invalid image {}", image_index)),
        }
        Ok(state.present_script.pop_front().unwrap_or(SurfaceStatus::Optimal))
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.lock();
        state.call("wait_idle")?;
        for fence_state in state.fences.values_mut() {
            if *fence_state == MockFenceState::Pending {
                *fence_state = MockFenceState::Signaled;
            }
        }
        Ok(())
    }

    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<CommandBufferHandle>> {
        let mut state = self.lock();
        state.call("allocate_command_buffers")?;
        Ok((0..count)
            .map(|_| CommandBufferHandle::from_raw(state.alloc("command_buffer")))
            .collect())
    }

    fn free_command_buffers(&self, command_buffers: &[CommandBufferHandle]) {
        let mut state = self.lock();
        state.calls.push("free_command_buffers".to_string());
        for cb in command_buffers {
            state.recording.remove(&cb.as_raw());
            state.release(cb.as_raw(), "command_buffer");
        }
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut state = self.lock();
        state.call("begin_command_buffer")?;
        if !state.recording.insert(command_buffer.as_raw()) {
            state.violations.push(format!("begin of command buffer {} already recording", command_buffer.as_raw()));
        }
        Ok(())
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut state = self.lock();
        state.call("end_command_buffer")?;
        if !state.recording.remove(&command_buffer.as_raw()) {
            state.violations.push(format!("end of command buffer {} not recording", command_buffer.as_raw()));
        }
        Ok(())
    }

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, desc: &RenderPassBeginDesc) {
        let mut state = self.lock();
        state.calls.push("cmd_begin_render_pass".to_string());
        state.check_recording(command_buffer, "cmd_begin_render_pass");
        state.render_pass_begins.push(*desc);
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        let mut state = self.lock();
        state.calls.push("cmd_end_render_pass".to_string());
        state.check_recording(command_buffer, "cmd_end_render_pass");
    }

    fn cmd_set_viewport(&self, command_buffer: CommandBufferHandle, viewport: Viewport) {
        let mut state = self.lock();
        state.calls.push("cmd_set_viewport".to_string());
        state.check_recording(command_buffer, "cmd_set_viewport");
        state.viewports.push(viewport);
    }

    fn cmd_set_scissor(&self, command_buffer: CommandBufferHandle, scissor: Rect2D) {
        let mut state = self.lock();
        state.calls.push("cmd_set_scissor".to_string());
        state.check_recording(command_buffer, "cmd_set_scissor");
        state.scissors.push(scissor);
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
