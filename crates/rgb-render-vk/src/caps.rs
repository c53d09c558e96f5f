// SPDX-License-Identifier: CEPL-1.0
//! Read-only capability queries against the native API.

use ash::vk;
use rgb_render::{DeviceClass, QueueCaps};
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};

use crate::api::NativeApi;
use crate::error::{NativeResultExt, SessionError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamily {
    pub index: u32,
    pub queue_count: u32,
    pub caps: QueueCaps,
}

/// What a device/surface pair advertises for swapchain creation.
#[derive(Clone, Debug)]
pub struct SurfaceRange {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceRange {
    /// At least one format and one present mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Immutable record of one physical device, taken fresh per enumeration.
#[derive(Clone, Debug)]
pub struct CapabilitySnapshot {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub class: DeviceClass,
    pub api_version: u32,
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: Vec<QueueFamily>,
    pub extensions: BTreeSet<CString>,
    /// Present only when the snapshot was taken against a bound surface.
    pub surface: Option<SurfaceRange>,
}

impl CapabilitySnapshot {
    pub fn supports_extension(&self, name: &CStr) -> bool {
        self.extensions.iter().any(|e| e.as_c_str() == name)
    }
}

pub fn device_class(ty: vk::PhysicalDeviceType) -> DeviceClass {
    match ty {
        vk::PhysicalDeviceType::DISCRETE_GPU => DeviceClass::Discrete,
        vk::PhysicalDeviceType::INTEGRATED_GPU => DeviceClass::Integrated,
        vk::PhysicalDeviceType::VIRTUAL_GPU => DeviceClass::Virtual,
        vk::PhysicalDeviceType::CPU => DeviceClass::Cpu,
        _ => DeviceClass::Other,
    }
}

pub fn queue_caps(flags: vk::QueueFlags) -> QueueCaps {
    let mut caps = QueueCaps::empty();
    if flags.contains(vk::QueueFlags::GRAPHICS) {
        caps |= QueueCaps::GRAPHICS;
    }
    if flags.contains(vk::QueueFlags::COMPUTE) {
        caps |= QueueCaps::COMPUTE;
    }
    if flags.contains(vk::QueueFlags::TRANSFER) {
        caps |= QueueCaps::TRANSFER;
    }
    caps
}

/// Physical device handles in enumeration order. Nothing is queried per
/// device here; the selector snapshots them one at a time.
pub fn physical_devices<A: NativeApi>(
    api: &A,
    instance: vk::Instance,
) -> Result<Vec<vk::PhysicalDevice>, SessionError> {
    let devices = api
        .physical_devices(instance)
        .native("vkEnumeratePhysicalDevices")?;
    if devices.is_empty() {
        return Err(SessionError::Enumeration("physical devices"));
    }
    Ok(devices)
}

/// Records what `phys` offers. With a surface, a family's `PRESENT` bit
/// comes from an explicit present-support query and the surface range is
/// recorded as reported (possibly empty; the selector decides what that
/// means). Present support stops being queried once a graphics family and
/// a present family are both known, so later families never carry
/// `PRESENT`.
pub fn snapshot<A: NativeApi>(
    api: &A,
    phys: vk::PhysicalDevice,
    surface: Option<vk::SurfaceKHR>,
) -> Result<CapabilitySnapshot, SessionError> {
    let props = api
        .device_properties(phys)
        .native("vkGetPhysicalDeviceProperties")?;
    let features = api
        .device_features(phys)
        .native("vkGetPhysicalDeviceFeatures")?;

    let mut queue_families = Vec::new();
    let (mut have_graphics, mut have_present) = (false, false);
    for (index, family) in api
        .queue_families(phys)
        .native("vkGetPhysicalDeviceQueueFamilyProperties")?
        .into_iter()
        .enumerate()
    {
        let index = index as u32;
        let usable = family.queue_count > 0;
        let mut caps = queue_caps(family.queue_flags);
        if let Some(surface) = surface {
            if usable
                && !(have_graphics && have_present)
                && api
                    .surface_support(phys, index, surface)
                    .native("vkGetPhysicalDeviceSurfaceSupportKHR")?
            {
                caps |= QueueCaps::PRESENT;
            }
        }
        if usable {
            have_graphics |= caps.contains(QueueCaps::GRAPHICS);
            have_present |= caps.contains(QueueCaps::PRESENT);
        }
        queue_families.push(QueueFamily {
            index,
            queue_count: family.queue_count,
            caps,
        });
    }

    let extensions = api
        .device_extensions(phys)
        .native("vkEnumerateDeviceExtensionProperties")?
        .into_iter()
        .collect();

    let surface = match surface {
        Some(surface) => Some(query_range(api, phys, surface)?),
        None => None,
    };

    Ok(CapabilitySnapshot {
        physical_device: phys,
        name: props.name,
        class: device_class(props.device_type),
        api_version: props.api_version,
        features,
        queue_families,
        extensions,
        surface,
    })
}

/// The surface range of the device that will actually get a swapchain.
/// Unlike a snapshot, an empty format or present-mode list is an error here.
pub fn surface_range<A: NativeApi>(
    api: &A,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SurfaceRange, SessionError> {
    let range = query_range(api, phys, surface)?;
    if range.formats.is_empty() {
        return Err(SessionError::Enumeration("surface formats"));
    }
    if range.present_modes.is_empty() {
        return Err(SessionError::Enumeration("present modes"));
    }
    Ok(range)
}

fn query_range<A: NativeApi>(
    api: &A,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SurfaceRange, SessionError> {
    Ok(SurfaceRange {
        capabilities: api
            .surface_capabilities(phys, surface)
            .native("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?,
        formats: api
            .surface_formats(phys, surface)
            .native("vkGetPhysicalDeviceSurfaceFormatsKHR")?,
        present_modes: api
            .surface_present_modes(phys, surface)
            .native("vkGetPhysicalDeviceSurfacePresentModesKHR")?,
    })
}

/// Names from `required` that `available` lacks, in `required` order.
pub fn missing_names(required: &[CString], available: &[CString]) -> Vec<String> {
    let available: BTreeSet<&CStr> = available.iter().map(CString::as_c_str).collect();
    required
        .iter()
        .filter(|name| !available.contains(name.as_c_str()))
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}
