// SPDX-License-Identifier: CEPL-1.0
//! The seam between the negotiation pipeline and the native graphics API.
//!
//! Everything the session does to the driver goes through [`NativeApi`].
//! [`crate::AshApi`] forwards to a real Vulkan loader; tests substitute a
//! scripted implementation. Calls are synchronous and report the raw
//! `vk::Result` so the caller can attach the call name.

use ash::prelude::VkResult;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{CStr, CString};

use crate::handles::SessionHandle;
use crate::negotiate::SurfaceConfiguration;

/// The parts of `VkPhysicalDeviceProperties` the selector looks at.
#[derive(Clone, Debug)]
pub struct DeviceProperties {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
}

pub struct InstanceRequest<'a> {
    pub app_name: &'a CStr,
    pub api_version: u32,
    pub layers: &'a [CString],
    pub extensions: &'a [CString],
}

pub struct DeviceRequest<'a> {
    /// Unique family indices; one queue is created in each.
    pub queue_families: &'a [u32],
    pub extensions: &'a [CString],
    pub features: vk::PhysicalDeviceFeatures,
}

pub struct SwapchainRequest<'a> {
    pub surface: vk::SurfaceKHR,
    pub configuration: &'a SurfaceConfiguration,
    /// Empty for exclusive ownership, otherwise every family sharing the images.
    pub sharing_families: &'a [u32],
}

pub trait NativeApi {
    fn instance_layers(&self) -> VkResult<Vec<CString>>;
    fn instance_extensions(&self) -> VkResult<Vec<CString>>;
    fn create_instance(&mut self, request: &InstanceRequest<'_>) -> VkResult<vk::Instance>;

    fn create_debug_messenger(
        &mut self,
        instance: vk::Instance,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;

    fn create_surface(
        &mut self,
        instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR>;

    fn physical_devices(&self, instance: vk::Instance) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn device_properties(&self, phys: vk::PhysicalDevice) -> VkResult<DeviceProperties>;
    fn device_features(&self, phys: vk::PhysicalDevice) -> VkResult<vk::PhysicalDeviceFeatures>;
    fn queue_families(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<vk::QueueFamilyProperties>>;
    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>>;

    fn surface_support(
        &self,
        phys: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    fn surface_present_modes(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    fn create_device(
        &mut self,
        phys: vk::PhysicalDevice,
        request: &DeviceRequest<'_>,
    ) -> VkResult<vk::Device>;
    fn device_queue(&mut self, device: vk::Device, family: u32, index: u32) -> VkResult<vk::Queue>;
    fn create_swapchain(
        &mut self,
        device: vk::Device,
        request: &SwapchainRequest<'_>,
    ) -> VkResult<vk::SwapchainKHR>;

    /// Releases one handle. Callers guarantee everything created after it is
    /// already gone.
    fn destroy(&mut self, handle: SessionHandle);
}
