/// Conversions between Galaxy3D device types and Vulkan types
///
/// Everything here is pure: no device is needed, which keeps the mapping
/// testable without a GPU.

use galaxy_3d_present::galaxy3d::{Result, Error};
use galaxy_3d_present::galaxy3d::device::{
    ColorFormat, ColorSpace, DepthFormat, PresentMode, SurfaceStatus,
    Extent2D, SurfaceCapabilities, SurfaceFormat, ClearValue,
};
use galaxy_3d_present::{engine_error, engine_err};
use ash::vk;

// ===== FORMATS =====

pub(crate) fn color_format_to_vk(format: ColorFormat) -> vk::Format {
    match format {
        ColorFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        ColorFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        ColorFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        ColorFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        ColorFormat::Other(raw) => vk::Format::from_raw(raw),
    }
}

pub(crate) fn color_format_from_vk(format: vk::Format) -> ColorFormat {
    match format {
        vk::Format::B8G8R8A8_SRGB => ColorFormat::B8G8R8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => ColorFormat::B8G8R8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB => ColorFormat::R8G8B8A8_SRGB,
        vk::Format::R8G8B8A8_UNORM => ColorFormat::R8G8B8A8_UNORM,
        other => ColorFormat::Other(other.as_raw()),
    }
}

pub(crate) fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::Other(raw) => vk::ColorSpaceKHR::from_raw(raw),
    }
}

pub(crate) fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> ColorSpace {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => ColorSpace::SrgbNonlinear,
        other => ColorSpace::Other(other.as_raw()),
    }
}

pub(crate) fn surface_format_from_vk(format: &vk::SurfaceFormatKHR) -> SurfaceFormat {
    SurfaceFormat {
        format: color_format_from_vk(format.format),
        color_space: color_space_from_vk(format.color_space),
    }
}

pub(crate) fn depth_format_to_vk(format: DepthFormat) -> vk::Format {
    match format {
        DepthFormat::D32Float => vk::Format::D32_SFLOAT,
        DepthFormat::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
        DepthFormat::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        DepthFormat::D16Unorm => vk::Format::D16_UNORM,
    }
}

// ===== PRESENT MODES =====

pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

/// None for modes Galaxy3D never selects (shared refresh, ...)
pub(crate) fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

// ===== EXTENTS & CAPABILITIES =====

pub(crate) fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D { width: extent.width, height: extent.height }
}

pub(crate) fn extent_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

pub(crate) fn capabilities_from_vk(caps: &vk::SurfaceCapabilitiesKHR) -> SurfaceCapabilities {
    SurfaceCapabilities {
        min_image_count: caps.min_image_count,
        max_image_count: caps.max_image_count,
        current_extent: extent_from_vk(caps.current_extent),
        min_image_extent: extent_from_vk(caps.min_image_extent),
        max_image_extent: extent_from_vk(caps.max_image_extent),
    }
}

pub(crate) fn clear_value_to_vk(value: ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(float32) => vk::ClearValue {
            color: vk::ClearColorValue { float32 },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

// ===== RESULTS =====

/// Map a failed Vulkan call to a Galaxy3D error, logging it
///
/// Device loss, surface loss and memory exhaustion keep their own variants
/// so the host can tell them apart; everything else is a backend error.
pub(crate) fn vk_error(operation: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_DEVICE_LOST => {
            engine_error!("galaxy3d::vulkan", "{}: device lost", operation);
            Error::DeviceLost
        }
        vk::Result::ERROR_SURFACE_LOST_KHR => {
            engine_error!("galaxy3d::vulkan", "{}: surface lost", operation);
            Error::SurfaceLost
        }
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            engine_error!("galaxy3d::vulkan", "{}: out of memory ({:?})", operation, result);
            Error::OutOfMemory
        }
        other => engine_err!("galaxy3d::vulkan", "{} failed: {:?}", operation, other),
    }
}

/// Translate the outcome of vkAcquireNextImageKHR
pub(crate) fn acquire_status(result: ash::prelude::VkResult<(u32, bool)>) -> Result<(u32, SurfaceStatus)> {
    match result {
        Ok((index, false)) => Ok((index, SurfaceStatus::Optimal)),
        Ok((index, true)) => Ok((index, SurfaceStatus::Suboptimal)),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok((0, SurfaceStatus::OutOfDate)),
        Err(e) => Err(vk_error("vkAcquireNextImageKHR", e)),
    }
}

/// Translate the outcome of vkQueuePresentKHR (ash reports SUBOPTIMAL_KHR as `Ok(true)`)
pub(crate) fn present_status(result: ash::prelude::VkResult<bool>) -> Result<SurfaceStatus> {
    match result {
        Ok(false) => Ok(SurfaceStatus::Optimal),
        Ok(true) => Ok(SurfaceStatus::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SurfaceStatus::OutOfDate),
        Err(e) => Err(vk_error("vkQueuePresentKHR", e)),
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
