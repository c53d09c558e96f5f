// SPDX-License-Identifier: CEPL-1.0
use ash::ext::debug_utils;
use ash::khr::{surface, swapchain};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{c_char, CStr, CString};

use crate::api::{DeviceProperties, DeviceRequest, InstanceRequest, NativeApi, SwapchainRequest};
use crate::debug;
use crate::error::SessionError;
use crate::handles::SessionHandle;

/// [`NativeApi`] backed by the system Vulkan loader.
///
/// A session owns exactly one instance and one device, so the dispatch
/// tables for both live here and the raw handles passed in only name them.
pub struct AshApi {
    entry: Entry,
    instance: Option<ash::Instance>,
    surface_loader: Option<surface::Instance>,
    debug_loader: Option<debug_utils::Instance>,
    device: Option<ash::Device>,
    swapchain_loader: Option<swapchain::Device>,
}

const NOT_READY: vk::Result = vk::Result::ERROR_INITIALIZATION_FAILED;

fn owned_name(raw: &[c_char]) -> CString {
    //SAFETY: Vulkan NUL-terminates every fixed-size name array it fills in
    unsafe { CStr::from_ptr(raw.as_ptr()) }.to_owned()
}

fn name_ptrs(names: &[CString]) -> Vec<*const c_char> {
    names.iter().map(|n| n.as_ptr()).collect()
}

impl AshApi {
    pub fn load() -> Result<Self, SessionError> {
        //SAFETY: loading the Vulkan library runs its initialisers; every
        //object created from this entry is destroyed before AshApi drops
        let entry = unsafe { Entry::load() }?;
        Ok(Self {
            entry,
            instance: None,
            surface_loader: None,
            debug_loader: None,
            device: None,
            swapchain_loader: None,
        })
    }

    fn instance(&self) -> VkResult<&ash::Instance> {
        self.instance.as_ref().ok_or(NOT_READY)
    }

    fn surface_loader(&self) -> VkResult<&surface::Instance> {
        self.surface_loader.as_ref().ok_or(NOT_READY)
    }
}

impl NativeApi for AshApi {
    fn instance_layers(&self) -> VkResult<Vec<CString>> {
        //SAFETY: no preconditions beyond a loaded entry
        let layers = unsafe { self.entry.enumerate_instance_layer_properties() }?;
        Ok(layers.iter().map(|l| owned_name(&l.layer_name)).collect())
    }

    fn instance_extensions(&self) -> VkResult<Vec<CString>> {
        //SAFETY: no preconditions beyond a loaded entry
        let exts = unsafe { self.entry.enumerate_instance_extension_properties(None) }?;
        Ok(exts.iter().map(|e| owned_name(&e.extension_name)).collect())
    }

    fn create_instance(&mut self, request: &InstanceRequest<'_>) -> VkResult<vk::Instance> {
        let app_info = vk::ApplicationInfo::default()
            .application_name(request.app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(request.api_version);

        let layers = name_ptrs(request.layers);
        let extensions = name_ptrs(request.extensions);
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions);

        //SAFETY: every pointer in create_info outlives the call
        let instance = unsafe { self.entry.create_instance(&create_info, None) }?;
        let handle = instance.handle();
        self.surface_loader = Some(surface::Instance::new(&self.entry, &instance));
        self.debug_loader = Some(debug_utils::Instance::new(&self.entry, &instance));
        self.instance = Some(instance);
        Ok(handle)
    }

    fn create_debug_messenger(
        &mut self,
        _instance: vk::Instance,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let loader = self.debug_loader.as_ref().ok_or(NOT_READY)?;
        let create_info = debug::messenger_create_info();
        //SAFETY: the loader was built from the live instance
        unsafe { loader.create_debug_utils_messenger(&create_info, None) }
    }

    fn create_surface(
        &mut self,
        _instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR> {
        let instance = self.instance()?;
        //SAFETY: the windowing service keeps the window alive for the
        //whole session and releases it only after teardown
        unsafe { ash_window::create_surface(&self.entry, instance, display, window, None) }
    }

    fn physical_devices(&self, _instance: vk::Instance) -> VkResult<Vec<vk::PhysicalDevice>> {
        //SAFETY: instance is live
        unsafe { self.instance()?.enumerate_physical_devices() }
    }

    fn device_properties(&self, phys: vk::PhysicalDevice) -> VkResult<DeviceProperties> {
        //SAFETY: phys came from this instance
        let props = unsafe { self.instance()?.get_physical_device_properties(phys) };
        Ok(DeviceProperties {
            name: owned_name(&props.device_name).to_string_lossy().into_owned(),
            device_type: props.device_type,
            api_version: props.api_version,
        })
    }

    fn device_features(&self, phys: vk::PhysicalDevice) -> VkResult<vk::PhysicalDeviceFeatures> {
        //SAFETY: phys came from this instance
        Ok(unsafe { self.instance()?.get_physical_device_features(phys) })
    }

    fn queue_families(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        //SAFETY: phys came from this instance
        Ok(unsafe {
            self.instance()?
                .get_physical_device_queue_family_properties(phys)
        })
    }

    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        //SAFETY: phys came from this instance
        let exts = unsafe { self.instance()?.enumerate_device_extension_properties(phys) }?;
        Ok(exts.iter().map(|e| owned_name(&e.extension_name)).collect())
    }

    fn surface_support(
        &self,
        phys: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        //SAFETY: phys and surface both belong to the live instance
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_support(phys, family, surface)
        }
    }

    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        //SAFETY: phys and surface both belong to the live instance
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_capabilities(phys, surface)
        }
    }

    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        //SAFETY: phys and surface both belong to the live instance
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_formats(phys, surface)
        }
    }

    fn surface_present_modes(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        //SAFETY: phys and surface both belong to the live instance
        unsafe {
            self.surface_loader()?
                .get_physical_device_surface_present_modes(phys, surface)
        }
    }

    fn create_device(
        &mut self,
        phys: vk::PhysicalDevice,
        request: &DeviceRequest<'_>,
    ) -> VkResult<vk::Device> {
        let priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo<'_>> = request
            .queue_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();
        let extensions = name_ptrs(request.extensions);
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&request.features);

        let instance = self.instance()?;
        //SAFETY: phys came from this instance; create_info borrows locals
        //that outlive the call
        let device = unsafe { instance.create_device(phys, &create_info, None) }?;
        let handle = device.handle();
        let swapchain_loader = swapchain::Device::new(instance, &device);
        self.swapchain_loader = Some(swapchain_loader);
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&mut self, _device: vk::Device, family: u32, index: u32) -> VkResult<vk::Queue> {
        let device = self.device.as_ref().ok_or(NOT_READY)?;
        //SAFETY: family was requested at device creation with one queue
        Ok(unsafe { device.get_device_queue(family, index) })
    }

    fn create_swapchain(
        &mut self,
        _device: vk::Device,
        request: &SwapchainRequest<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        let loader = self.swapchain_loader.as_ref().ok_or(NOT_READY)?;
        let config = request.configuration;
        let sharing_mode = if request.sharing_families.is_empty() {
            vk::SharingMode::EXCLUSIVE
        } else {
            vk::SharingMode::CONCURRENT
        };
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(request.surface)
            .min_image_count(config.image_count)
            .image_format(config.format)
            .image_color_space(config.color_space)
            .image_extent(config.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(request.sharing_families)
            .pre_transform(config.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(config.present_mode)
            .clipped(true);
        //SAFETY: surface and device are live and belong to the same instance
        unsafe { loader.create_swapchain(&create_info, None) }
    }

    // STRICT TEARDOWN ORDER is the caller's job (HandleStack); this only
    // forgets dispatch tables once their owner is gone.
    fn destroy(&mut self, handle: SessionHandle) {
        //SAFETY: the handle stack destroys children before parents, so each
        //handle here is unused by anything still alive
        unsafe {
            match handle {
                SessionHandle::Swapchain(sc) => {
                    if let Some(loader) = &self.swapchain_loader {
                        loader.destroy_swapchain(sc, None);
                    }
                }
                SessionHandle::Queue(_) => {}
                SessionHandle::Device(_) => {
                    self.swapchain_loader = None;
                    if let Some(device) = self.device.take() {
                        device.device_wait_idle().ok();
                        device.destroy_device(None);
                    }
                }
                SessionHandle::Surface(s) => {
                    if let Some(loader) = &self.surface_loader {
                        loader.destroy_surface(s, None);
                    }
                }
                SessionHandle::DebugMessenger(m) => {
                    if let Some(loader) = &self.debug_loader {
                        loader.destroy_debug_utils_messenger(m, None);
                    }
                }
                SessionHandle::Instance(_) => {
                    self.surface_loader = None;
                    self.debug_loader = None;
                    if let Some(instance) = self.instance.take() {
                        instance.destroy_instance(None);
                    }
                }
            }
        }
    }
}
