// SPDX-License-Identifier: CEPL-1.0
//! Scripted [`NativeApi`] for unit tests.

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, WindowHandle, XlibDisplayHandle, XlibWindowHandle,
};
use rgb_render::{RenderSize, SessionOptions};
use std::cell::RefCell;
use std::ffi::CString;
use std::rc::Rc;

use crate::api::{DeviceProperties, DeviceRequest, InstanceRequest, NativeApi, SwapchainRequest};
use crate::handles::SessionHandle;
use crate::session::{SessionConfig, VALIDATION_LAYER};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailPoint {
    Instance,
    DebugMessenger,
    Surface,
    Device,
    Queue,
    Swapchain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    Created(SessionHandle),
    Destroyed(SessionHandle),
}

/// What the mock saw, shared with the test that built it.
#[derive(Debug, Default)]
pub(crate) struct MockLog {
    pub events: Vec<Event>,
    pub instance_layers: Vec<CString>,
    pub instance_extensions: Vec<CString>,
    pub device_families: Vec<u32>,
    pub sharing_families: Vec<u32>,
    pub present_queries: Vec<(vk::PhysicalDevice, u32)>,
}

pub(crate) type SharedLog = Rc<RefCell<MockLog>>;

pub(crate) fn created(log: &SharedLog) -> Vec<SessionHandle> {
    log.borrow()
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Created(h) => Some(*h),
            Event::Destroyed(_) => None,
        })
        .collect()
}

pub(crate) fn destroyed(log: &SharedLog) -> Vec<SessionHandle> {
    log.borrow()
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Destroyed(h) => Some(*h),
            Event::Created(_) => None,
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct MockFamily {
    pub flags: vk::QueueFlags,
    pub count: u32,
    pub present: bool,
}

impl MockFamily {
    pub fn new(flags: vk::QueueFlags, count: u32, present: bool) -> Self {
        Self {
            flags,
            count,
            present,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct MockDevice {
    pub name: &'static str,
    pub device_type: vk::PhysicalDeviceType,
    pub families: Vec<MockFamily>,
    pub extensions: Vec<CString>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Every surface capability query fails with `ERROR_SURFACE_LOST_KHR`.
    pub surface_lost: bool,
}

impl MockDevice {
    /// One combined graphics+present family, `VK_KHR_swapchain`, one
    /// BGRA8 format, FIFO only, a single image at a fixed 1024x768.
    pub fn discrete(name: &'static str) -> Self {
        Self {
            name,
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            families: vec![MockFamily::new(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                1,
                true,
            )],
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 1,
                max_image_count: 1,
                current_extent: vk::Extent2D {
                    width: 1024,
                    height: 768,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            surface_lost: false,
        }
    }

    pub fn with_type(mut self, device_type: vk::PhysicalDeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_families(mut self, families: Vec<MockFamily>) -> Self {
        self.families = families;
        self
    }
}

pub(crate) struct MockApi {
    pub layers: Vec<CString>,
    pub instance_extensions: Vec<CString>,
    pub devices: Vec<MockDevice>,
    pub fail_at: Option<FailPoint>,
    /// Surface formats come back empty once a logical device exists.
    pub formats_lost_after_device: bool,
    log: SharedLog,
    next_handle: u64,
}

impl MockApi {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            layers: vec![VALIDATION_LAYER.to_owned()],
            instance_extensions: vec![
                ash::khr::surface::NAME.to_owned(),
                ash::khr::xlib_surface::NAME.to_owned(),
                ash::ext::debug_utils::NAME.to_owned(),
            ],
            devices,
            fail_at: None,
            formats_lost_after_device: false,
            log: SharedLog::default(),
            next_handle: 0x100,
        }
    }

    pub fn log(&self) -> SharedLog {
        Rc::clone(&self.log)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn physical_device(&self, index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(index as u64 + 1)
    }

    fn device(&self, phys: vk::PhysicalDevice) -> VkResult<&MockDevice> {
        let index = phys.as_raw().checked_sub(1).ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        self.devices
            .get(index as usize)
            .ok_or(vk::Result::ERROR_DEVICE_LOST)
    }

    fn has_device(&self) -> bool {
        self.log
            .borrow()
            .events
            .iter()
            .any(|e| matches!(e, Event::Created(SessionHandle::Device(_))))
    }

    fn mint(&mut self, point: FailPoint) -> VkResult<u64> {
        if self.fail_at == Some(point) {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        self.next_handle += 1;
        Ok(self.next_handle)
    }

    fn record(&self, handle: SessionHandle) {
        self.log.borrow_mut().events.push(Event::Created(handle));
    }
}

impl NativeApi for MockApi {
    fn instance_layers(&self) -> VkResult<Vec<CString>> {
        Ok(self.layers.clone())
    }

    fn instance_extensions(&self) -> VkResult<Vec<CString>> {
        Ok(self.instance_extensions.clone())
    }

    fn create_instance(&mut self, request: &InstanceRequest<'_>) -> VkResult<vk::Instance> {
        let instance = vk::Instance::from_raw(self.mint(FailPoint::Instance)?);
        {
            let mut log = self.log.borrow_mut();
            log.instance_layers = request.layers.to_vec();
            log.instance_extensions = request.extensions.to_vec();
        }
        self.record(SessionHandle::Instance(instance));
        Ok(instance)
    }

    fn create_debug_messenger(
        &mut self,
        _instance: vk::Instance,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let messenger =
            vk::DebugUtilsMessengerEXT::from_raw(self.mint(FailPoint::DebugMessenger)?);
        self.record(SessionHandle::DebugMessenger(messenger));
        Ok(messenger)
    }

    fn create_surface(
        &mut self,
        _instance: vk::Instance,
        _display: RawDisplayHandle,
        _window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR> {
        let surface = vk::SurfaceKHR::from_raw(self.mint(FailPoint::Surface)?);
        self.record(SessionHandle::Surface(surface));
        Ok(surface)
    }

    fn physical_devices(&self, _instance: vk::Instance) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((0..self.devices.len())
            .map(|i| self.physical_device(i))
            .collect())
    }

    fn device_properties(&self, phys: vk::PhysicalDevice) -> VkResult<DeviceProperties> {
        let dev = self.device(phys)?;
        Ok(DeviceProperties {
            name: dev.name.to_owned(),
            device_type: dev.device_type,
            api_version: vk::API_VERSION_1_3,
        })
    }

    fn device_features(&self, phys: vk::PhysicalDevice) -> VkResult<vk::PhysicalDeviceFeatures> {
        self.device(phys)?;
        Ok(vk::PhysicalDeviceFeatures::default())
    }

    fn queue_families(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<vk::QueueFamilyProperties>> {
        Ok(self
            .device(phys)?
            .families
            .iter()
            .map(|f| vk::QueueFamilyProperties {
                queue_flags: f.flags,
                queue_count: f.count,
                ..Default::default()
            })
            .collect())
    }

    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        Ok(self.device(phys)?.extensions.clone())
    }

    fn surface_support(
        &self,
        phys: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.log.borrow_mut().present_queries.push((phys, family));
        Ok(self
            .device(phys)?
            .families
            .get(family as usize)
            .is_some_and(|f| f.present))
    }

    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let dev = self.device(phys)?;
        if dev.surface_lost {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        Ok(dev.capabilities)
    }

    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        let dev = self.device(phys)?;
        if self.formats_lost_after_device && self.has_device() {
            return Ok(Vec::new());
        }
        Ok(dev.formats.clone())
    }

    fn surface_present_modes(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.device(phys)?.present_modes.clone())
    }

    fn create_device(
        &mut self,
        phys: vk::PhysicalDevice,
        request: &DeviceRequest<'_>,
    ) -> VkResult<vk::Device> {
        self.device(phys)?;
        let device = vk::Device::from_raw(self.mint(FailPoint::Device)?);
        self.log.borrow_mut().device_families = request.queue_families.to_vec();
        self.record(SessionHandle::Device(device));
        Ok(device)
    }

    fn device_queue(&mut self, _device: vk::Device, _family: u32, _index: u32) -> VkResult<vk::Queue> {
        let queue = vk::Queue::from_raw(self.mint(FailPoint::Queue)?);
        self.record(SessionHandle::Queue(queue));
        Ok(queue)
    }

    fn create_swapchain(
        &mut self,
        _device: vk::Device,
        request: &SwapchainRequest<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        let swapchain = vk::SwapchainKHR::from_raw(self.mint(FailPoint::Swapchain)?);
        self.log.borrow_mut().sharing_families = request.sharing_families.to_vec();
        self.record(SessionHandle::Swapchain(swapchain));
        Ok(swapchain)
    }

    fn destroy(&mut self, handle: SessionHandle) {
        self.log.borrow_mut().events.push(Event::Destroyed(handle));
    }
}

/// Hands out Xlib handles that nothing ever dereferences.
pub(crate) struct FakeWindow;

impl HasWindowHandle for FakeWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        let raw = RawWindowHandle::Xlib(XlibWindowHandle::new(1));
        //SAFETY: the mock API never looks behind the handle
        Ok(unsafe { WindowHandle::borrow_raw(raw) })
    }
}

impl HasDisplayHandle for FakeWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        let raw = RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0));
        //SAFETY: the mock API never looks behind the handle
        Ok(unsafe { DisplayHandle::borrow_raw(raw) })
    }
}

pub(crate) fn test_config(diagnostics: bool) -> SessionConfig {
    let options = SessionOptions {
        app_name: "rgb-test".to_owned(),
        diagnostics,
        size_hint: RenderSize::new(800, 600),
        ..SessionOptions::default()
    };
    SessionConfig::new(
        options,
        vec![
            ash::khr::surface::NAME.to_owned(),
            ash::khr::xlib_surface::NAME.to_owned(),
        ],
    )
}
