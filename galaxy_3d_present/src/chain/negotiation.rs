/// Surface negotiation - pure choices made from what the surface supports

use crate::config::PresentModePreference;
use crate::device::{
    ColorFormat, ColorSpace, DepthFormat, Extent2D, GraphicsDevice, PresentMode,
    SurfaceCapabilities, SurfaceFormat,
};
use crate::engine_error;
use crate::error::{Error, Result};

/// 8-bit SRGB formats in order of preference
const PREFERRED_COLOR_FORMATS: [ColorFormat; 2] = [ColorFormat::B8G8R8A8_SRGB, ColorFormat::R8G8B8A8_SRGB];

/// Choose the surface format
///
/// Prefers an 8-bit SRGB format in the non-linear SRGB color space,
/// otherwise falls back to the first format the surface lists.
///
/// # Errors
///
/// `Error::NoSurfaceFormat` if the surface lists no format.
pub fn choose_surface_format(formats: &[SurfaceFormat]) -> Result<SurfaceFormat> {
    for preferred in PREFERRED_COLOR_FORMATS {
        if let Some(found) = formats
            .iter()
            .find(|f| f.format == preferred && f.color_space == ColorSpace::SrgbNonlinear)
        {
            return Ok(*found);
        }
    }

    formats.first().copied().ok_or_else(|| {
        engine_error!("galaxy3d::ImageChain", "Surface reports no supported format");
        Error::NoSurfaceFormat
    })
}

/// Choose the present mode
///
/// FIFO is always available, so it is the fallback for `LowLatency` and the
/// only answer for `Vsync`.
pub fn choose_present_mode(available: &[PresentMode], preference: PresentModePreference) -> PresentMode {
    match preference {
        PresentModePreference::LowLatency if available.contains(&PresentMode::Mailbox) => PresentMode::Mailbox,
        _ => PresentMode::Fifo,
    }
}

/// Choose the image extent
///
/// Uses the surface's current extent when it is defined, otherwise clamps
/// the window extent to the surface limits.
pub fn choose_extent(capabilities: &SurfaceCapabilities, window_extent: Extent2D) -> Extent2D {
    if !capabilities.extent_is_undefined() {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    Extent2D::new(
        window_extent.width.clamp(min.width, max.width.max(min.width)),
        window_extent.height.clamp(min.height, max.height.max(min.height)),
    )
}

/// Number of images to request: one more than the minimum, capped by the maximum (0 = no cap)
pub fn choose_image_count(capabilities: &SurfaceCapabilities) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// First candidate supporting optimal-tiling depth/stencil attachment
///
/// # Errors
///
/// `Error::UnsupportedDepthFormat` listing the candidates if none is supported.
pub fn find_depth_format(device: &dyn GraphicsDevice, candidates: &[DepthFormat]) -> Result<DepthFormat> {
    candidates
        .iter()
        .copied()
        .find(|format| device.supports_depth_attachment(*format))
        .ok_or_else(|| {
            engine_error!("galaxy3d::ImageChain", "No supported depth format among {:?}", candidates);
            Error::UnsupportedDepthFormat(candidates.to_vec())
        })
}

#[cfg(test)]
#[path = "negotiation_tests.rs"]
mod tests;
