/*!
# Galaxy 3D Present - Vulkan Backend

Vulkan implementation of the Galaxy 3D presentation pipeline.

This crate provides `VulkanGraphicsDevice`, which implements the
`galaxy_3d_present` `GraphicsDevice` trait using the Ash library for Vulkan
bindings, ash-window for surface creation and gpu-allocator for depth image
memory.

Validation layer support (debug messenger, statistics) is compiled in only
with the `vulkan-validation` feature.

# Example

```no_run
use galaxy_3d_present::galaxy3d::Config;
use galaxy_3d_present::galaxy3d::surface::WindowSurface;
use galaxy_3d_present_vulkan::galaxy3d::VulkanGraphicsDevice;

# fn main() -> galaxy_3d_present::galaxy3d::Result<()> {
let window = WindowSurface::new("Galaxy3D", 1280, 720)?;
let device = VulkanGraphicsDevice::new(window.window().as_ref(), Config::default())?;
# Ok(())
# }
```
*/

// Vulkan implementation modules
mod vulkan_graphics_device;
mod vulkan_format;

#[cfg(feature = "vulkan-validation")]
mod debug;

// Main galaxy3d namespace module
pub mod galaxy3d {
    pub use crate::vulkan_graphics_device::VulkanGraphicsDevice;

    // Validation statistics (vulkan-validation feature only)
    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{get_validation_stats, print_validation_stats_report};
}
