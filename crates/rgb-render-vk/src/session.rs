// SPDX-License-Identifier: CEPL-1.0
//! Session bring-up and teardown.
//!
//! STRICT ORDER:
//! instance -> debug messenger (optional) -> surface -> device selection
//! -> logical device + queues -> swapchain.
//! Every created handle goes onto one [`HandleStack`]; teardown pops it, so
//! destruction is always the exact reverse of creation, including after a
//! failure part way through.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use rgb_render::SessionOptions;
use std::ffi::CString;
use tracing::{debug, info, warn};

use crate::api::{DeviceRequest, InstanceRequest, NativeApi, SwapchainRequest};
use crate::caps::{self, missing_names};
use crate::error::{ExtensionScope, NativeResultExt, SessionError};
use crate::handles::{HandleStack, SessionHandle};
use crate::negotiate::{negotiate, SurfaceConfiguration, SurfacePreferences};
use crate::select::{select, QueueAssignment, SelectionPolicy};

pub const VALIDATION_LAYER: &std::ffi::CStr = c"VK_LAYER_KHRONOS_validation";

/// Linear bring-up states. A session only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Uninitialized,
    InstanceCreated,
    DiagnosticsAttached,
    SurfaceBound,
    DeviceSelected,
    LogicalDeviceCreated,
    SwapchainCreated,
    Running,
    TornDown,
}

/// Everything needed to bring a session up.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub options: SessionOptions,
    /// Instance extensions the windowing service needs to present.
    pub instance_extensions: Vec<CString>,
    pub layers: Vec<CString>,
    pub device_extensions: Vec<CString>,
    pub surface: SurfacePreferences,
    pub api_version: u32,
}

impl SessionConfig {
    /// Validation layer when diagnostics are on, `VK_KHR_swapchain` on the device.
    pub fn new(options: SessionOptions, window_extensions: Vec<CString>) -> Self {
        let layers = if options.diagnostics {
            vec![VALIDATION_LAYER.to_owned()]
        } else {
            Vec::new()
        };
        Self {
            options,
            instance_extensions: window_extensions,
            layers,
            device_extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            surface: SurfacePreferences::default(),
            api_version: vk::API_VERSION_1_0,
        }
    }

    /// Window extensions plus `VK_EXT_debug_utils` when diagnostics are on.
    pub fn enabled_instance_extensions(&self) -> Vec<CString> {
        let mut exts = self.instance_extensions.clone();
        let debug_utils = ash::ext::debug_utils::NAME;
        if self.options.diagnostics && !exts.iter().any(|e| e.as_c_str() == debug_utils) {
            exts.push(debug_utils.to_owned());
        }
        exts
    }
}

/// The physical device that won selection.
#[derive(Clone, Debug)]
pub struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub queues: QueueAssignment,
}

#[derive(Clone, Copy, Debug)]
pub struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

/// A live presentation session and every native handle it owns.
///
/// Dropping a session tears it down.
pub struct Session<A: NativeApi> {
    api: A,
    handles: HandleStack,
    state: SessionState,
    selected: Option<SelectedDevice>,
    queues: Option<Queues>,
    surface_config: Option<SurfaceConfiguration>,
}

impl<A: NativeApi> Session<A> {
    /// Runs the whole bring-up sequence. On failure everything created so
    /// far has been destroyed by the time the error is returned.
    pub fn initialize(
        api: A,
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let display = display.display_handle()?.as_raw();
        let window = window.window_handle()?.as_raw();

        let mut session = Session {
            api,
            handles: HandleStack::default(),
            state: SessionState::Uninitialized,
            selected: None,
            queues: None,
            surface_config: None,
        };
        session.bring_up(display, window, config)?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn surface_config(&self) -> Option<&SurfaceConfiguration> {
        self.surface_config.as_ref()
    }

    pub fn selected_device(&self) -> Option<&SelectedDevice> {
        self.selected.as_ref()
    }

    pub fn queues(&self) -> Option<Queues> {
        self.queues
    }

    /// Live handles, oldest first.
    pub fn handles(&self) -> &[SessionHandle] {
        self.handles.as_slice()
    }

    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.state == SessionState::TornDown {
            return;
        }
        debug!(
            "tearing down session from {:?} ({} live handles)",
            self.state,
            self.handles.len()
        );
        self.handles.release_all(&mut self.api);
        self.queues = None;
        self.state = SessionState::TornDown;
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(next > self.state, "{:?} -> {:?}", self.state, next);
        debug!("session: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn bring_up(
        &mut self,
        display: RawDisplayHandle,
        window: RawWindowHandle,
        config: &SessionConfig,
    ) -> Result<(), SessionError> {
        let instance = self.create_instance(config)?;
        if config.options.diagnostics {
            self.attach_diagnostics(instance)?;
        }
        let surface = self.bind_surface(instance, display, window)?;
        let selected = self.select_device(instance, surface, config)?;
        let device = self.create_logical_device(&selected, config)?;
        self.create_swapchain(&selected, device, surface, config)?;
        self.advance(SessionState::Running);

        if let Some(sc) = &self.surface_config {
            info!(
                "Vulkan swapchain ready on {} ({}x{}, {:?}/{:?}, {:?}, {} images)",
                selected.name,
                sc.extent.width,
                sc.extent.height,
                sc.format,
                sc.color_space,
                sc.present_mode,
                sc.image_count
            );
        }
        Ok(())
    }

    fn create_instance(&mut self, config: &SessionConfig) -> Result<vk::Instance, SessionError> {
        let available_layers = self
            .api
            .instance_layers()
            .native("vkEnumerateInstanceLayerProperties")?;
        let missing = missing_names(&config.layers, &available_layers);
        if !missing.is_empty() {
            for name in &missing {
                warn!("{name} is missing");
            }
            return Err(SessionError::MissingLayer(missing));
        }

        let extensions = config.enabled_instance_extensions();
        let available = self
            .api
            .instance_extensions()
            .native("vkEnumerateInstanceExtensionProperties")?;
        debug!("{} available instance extensions:", available.len());
        for ext in &available {
            debug!("\t{}", ext.to_string_lossy());
        }
        let missing = missing_names(&extensions, &available);
        if !missing.is_empty() {
            for name in &missing {
                warn!("Missing required extension: {name}");
            }
            return Err(SessionError::MissingExtension {
                scope: ExtensionScope::Instance,
                names: missing,
            });
        }
        info!("All {} required instance extensions present", extensions.len());
        if !config.layers.is_empty() {
            info!(
                "Enabling {} validation layer{}",
                config.layers.len(),
                if config.layers.len() == 1 { "" } else { "s" }
            );
        }

        let app_name = CString::new(config.options.app_name.as_str())
            .map_err(|_| SessionError::InvalidAppName)?;
        let instance = self
            .api
            .create_instance(&InstanceRequest {
                app_name: &app_name,
                api_version: config.api_version,
                layers: &config.layers,
                extensions: &extensions,
            })
            .native("vkCreateInstance")?;
        self.handles.push(SessionHandle::Instance(instance));
        self.advance(SessionState::InstanceCreated);
        Ok(instance)
    }

    fn attach_diagnostics(&mut self, instance: vk::Instance) -> Result<(), SessionError> {
        let messenger = self
            .api
            .create_debug_messenger(instance)
            .native("vkCreateDebugUtilsMessengerEXT")?;
        self.handles.push(SessionHandle::DebugMessenger(messenger));
        self.advance(SessionState::DiagnosticsAttached);
        Ok(())
    }

    fn bind_surface(
        &mut self,
        instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<vk::SurfaceKHR, SessionError> {
        let surface = self
            .api
            .create_surface(instance, display, window)
            .native("vkCreateSurfaceKHR")?;
        self.handles.push(SessionHandle::Surface(surface));
        self.advance(SessionState::SurfaceBound);
        Ok(surface)
    }

    fn select_device(
        &mut self,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
        config: &SessionConfig,
    ) -> Result<SelectedDevice, SessionError> {
        let devices = caps::physical_devices(&self.api, instance)?;
        let policy = SelectionPolicy {
            device: config.options.device,
            required_extensions: config.device_extensions.clone(),
        };
        let api = &self.api;
        let (chosen, queues) = select(
            devices
                .iter()
                .map(|&phys| caps::snapshot(api, phys, Some(surface))),
            &policy,
        )?;
        let selected = SelectedDevice {
            physical_device: chosen.physical_device,
            name: chosen.name,
            queues,
        };
        self.selected = Some(selected.clone());
        self.advance(SessionState::DeviceSelected);
        Ok(selected)
    }

    fn create_logical_device(
        &mut self,
        selected: &SelectedDevice,
        config: &SessionConfig,
    ) -> Result<vk::Device, SessionError> {
        let (graphics_family, present_family) = selected
            .queues
            .families()
            .ok_or(SessionError::InvariantViolation("selected device has incomplete queues"))?;
        let families = selected.queues.unique_families();

        let device = self
            .api
            .create_device(
                selected.physical_device,
                &DeviceRequest {
                    queue_families: &families,
                    extensions: &config.device_extensions,
                    features: vk::PhysicalDeviceFeatures::default(),
                },
            )
            .native("vkCreateDevice")?;
        self.handles.push(SessionHandle::Device(device));

        let graphics = self
            .api
            .device_queue(device, graphics_family, 0)
            .native("vkGetDeviceQueue")?;
        self.handles.push(SessionHandle::Queue(graphics));
        let present = if present_family == graphics_family {
            graphics
        } else {
            let present = self
                .api
                .device_queue(device, present_family, 0)
                .native("vkGetDeviceQueue")?;
            self.handles.push(SessionHandle::Queue(present));
            present
        };
        self.queues = Some(Queues { graphics, present });
        self.advance(SessionState::LogicalDeviceCreated);
        Ok(device)
    }

    fn create_swapchain(
        &mut self,
        selected: &SelectedDevice,
        device: vk::Device,
        surface: vk::SurfaceKHR,
        config: &SessionConfig,
    ) -> Result<(), SessionError> {
        let range = caps::surface_range(&self.api, selected.physical_device, surface)?;
        let configuration = negotiate(&range, config.options.size_hint, &config.surface)?;

        let sharing_families = match selected.queues.families() {
            Some((g, p)) if g != p => vec![g, p],
            _ => Vec::new(),
        };
        let swapchain = self
            .api
            .create_swapchain(
                device,
                &SwapchainRequest {
                    surface,
                    configuration: &configuration,
                    sharing_families: &sharing_families,
                },
            )
            .native("vkCreateSwapchainKHR")?;
        self.handles.push(SessionHandle::Swapchain(swapchain));
        self.surface_config = Some(configuration);
        self.advance(SessionState::SwapchainCreated);
        Ok(())
    }
}

impl<A: NativeApi> Drop for Session<A> {
    fn drop(&mut self) {
        self.release();
    }
}
