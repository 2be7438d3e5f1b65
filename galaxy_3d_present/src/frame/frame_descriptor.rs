/// FrameDescriptor and render systems
///
/// A render system records its draw commands into the open command buffer
/// of the current frame, inside the render pass scope. Systems are stored in
/// an ordered list and run in registration order every frame.

use crate::camera::Camera;
use crate::device::{CommandBufferHandle, DescriptorSetHandle};
use crate::error::Result;

/// Everything a render system needs to record one frame
///
/// Borrowed for the duration of the frame only.
pub struct FrameDescriptor<'a, S> {
    /// Frame-in-flight slot, selects per-frame resources (uniform buffers, ...)
    pub frame_index: usize,

    /// Seconds since the previous frame
    pub frame_time: f32,

    /// Command buffer being recorded
    pub command_buffer: CommandBufferHandle,

    pub camera: &'a Camera,

    /// Descriptor set holding the global (per-frame) uniforms
    pub global_descriptor_set: DescriptorSetHandle,

    /// Live scene objects, mutable so systems can update per-frame state
    pub scene_objects: &'a mut S,
}

/// A component that records rendering commands for each frame
pub trait RenderSystem<S> {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Record this system's commands into `frame.command_buffer`
    fn record(&mut self, frame: &mut FrameDescriptor<'_, S>) -> Result<()>;
}

/// Ordered collection of render systems
pub struct RenderSystemList<S> {
    systems: Vec<Box<dyn RenderSystem<S>>>,
}

impl<S> Default for RenderSystemList<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RenderSystemList<S> {
    pub fn new() -> Self {
        Self { systems: Vec::new() }
    }

    /// Append a system; it runs after every system registered before it
    pub fn register(&mut self, system: Box<dyn RenderSystem<S>>) {
        crate::engine_debug!("galaxy3d::RenderSystemList", "Registered render system '{}'", system.name());
        self.systems.push(system);
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Record every system in registration order, stopping at the first error
    pub fn record_all(&mut self, frame: &mut FrameDescriptor<'_, S>) -> Result<()> {
        for system in &mut self.systems {
            system.record(frame).map_err(|e| {
                crate::engine_error!(
                    "galaxy3d::RenderSystemList",
                    "Render system '{}' failed: {}",
                    system.name(), e
                );
                e
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_descriptor_tests.rs"]
mod tests;
