// SPDX-License-Identifier: CEPL-1.0
//! Swapchain parameters from a surface range and a window hint.

use ash::vk;
use rgb_render::RenderSize;

use crate::caps::SurfaceRange;
use crate::error::SessionError;

/// Preferred `(format, color space)` pair.
#[derive(Clone, Copy, Debug)]
pub struct SurfacePreferences {
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
}

impl Default for SurfacePreferences {
    fn default() -> Self {
        Self {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }
}

/// The concrete swapchain shape the session asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceConfiguration {
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

pub fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    prefs: &SurfacePreferences,
) -> Option<vk::SurfaceFormatKHR> {
    // A lone UNDEFINED entry means the surface takes anything.
    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return Some(vk::SurfaceFormatKHR {
                format: prefs.format,
                color_space: prefs.color_space,
            });
        }
    }
    formats
        .iter()
        .copied()
        .find(|f| f.format == prefs.format && f.color_space == prefs.color_space)
        .or_else(|| formats.first().copied())
}

/// MAILBOX, then IMMEDIATE, then FIFO (always supported).
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|m| modes.contains(m))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, want: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: want
            .width
            .min(caps.max_image_extent.width)
            .max(caps.min_image_extent.width),
        height: want
            .height
            .min(caps.max_image_extent.height)
            .max(caps.min_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum unless it is 0 (unbounded).
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count.saturating_add(1);
    if caps.max_image_count == 0 {
        wanted
    } else {
        wanted.min(caps.max_image_count)
    }
}

pub fn negotiate(
    range: &SurfaceRange,
    hint: RenderSize,
    prefs: &SurfacePreferences,
) -> Result<SurfaceConfiguration, SessionError> {
    let surface_format = choose_surface_format(&range.formats, prefs)
        .ok_or(SessionError::InvariantViolation("surface format list is empty"))?;
    if range.present_modes.is_empty() {
        return Err(SessionError::InvariantViolation("present mode list is empty"));
    }

    let caps = &range.capabilities;
    Ok(SurfaceConfiguration {
        format: surface_format.format,
        color_space: surface_format.color_space,
        present_mode: choose_present_mode(&range.present_modes),
        extent: choose_extent(caps, hint),
        image_count: choose_image_count(caps),
        pre_transform: caps.current_transform,
    })
}
