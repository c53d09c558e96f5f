// SPDX-License-Identifier: CEPL-1.0
//! Backend-neutral vocabulary shared by the platform layer, the Vulkan
//! session and the application.

use bitflags::bitflags;
use std::fmt;

/// Window size in physical pixels, used as the extent hint when the surface
/// leaves the swapchain size up to the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for RenderSize {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl fmt::Display for RenderSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Hardware class reported by a physical device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Discrete,
    Integrated,
    Virtual,
    Cpu,
    Other,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceClass::Discrete => "discrete GPU",
            DeviceClass::Integrated => "integrated GPU",
            DeviceClass::Virtual => "virtual GPU",
            DeviceClass::Cpu => "CPU",
            DeviceClass::Other => "other",
        })
    }
}

/// Which device classes the selector accepts.
///
/// The reference policy is [`DeviceRequirement::Only`] with
/// [`DeviceClass::Discrete`]; anything broader has to be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceRequirement {
    Only(DeviceClass),
    Any,
}

impl DeviceRequirement {
    pub fn accepts(&self, class: DeviceClass) -> bool {
        match self {
            DeviceRequirement::Only(wanted) => *wanted == class,
            DeviceRequirement::Any => true,
        }
    }
}

impl Default for DeviceRequirement {
    fn default() -> Self {
        DeviceRequirement::Only(DeviceClass::Discrete)
    }
}

bitflags! {
    /// Operation kinds a queue family can service.
    ///
    /// `PRESENT` is never derived from the other bits; it is only set after
    /// an explicit present-support query against a bound surface.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct QueueCaps: u32 {
        const GRAPHICS = 1 << 0;
        const COMPUTE = 1 << 1;
        const TRANSFER = 1 << 2;
        const PRESENT = 1 << 3;
    }
}

/// Caller-facing knobs for bringing up a presentation session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub app_name: String,
    /// Validation layer + diagnostic messenger.
    pub diagnostics: bool,
    pub device: DeviceRequirement,
    pub size_hint: RenderSize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            app_name: "Hello Triangle".to_owned(),
            diagnostics: cfg!(debug_assertions),
            device: DeviceRequirement::default(),
            size_hint: RenderSize::default(),
        }
    }
}
