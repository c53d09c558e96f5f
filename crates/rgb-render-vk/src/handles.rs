// SPDX-License-Identifier: CEPL-1.0
//! Ownership stack for every native handle a session creates.

use ash::vk;
use tracing::debug;

use crate::api::NativeApi;

/// A live native handle owned by a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionHandle {
    Instance(vk::Instance),
    DebugMessenger(vk::DebugUtilsMessengerEXT),
    Surface(vk::SurfaceKHR),
    Device(vk::Device),
    /// Queues are owned by their device; releasing one is a no-op, but it is
    /// still recorded so the stack mirrors the creation sequence.
    Queue(vk::Queue),
    Swapchain(vk::SwapchainKHR),
}

impl SessionHandle {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionHandle::Instance(_) => "instance",
            SessionHandle::DebugMessenger(_) => "debug messenger",
            SessionHandle::Surface(_) => "surface",
            SessionHandle::Device(_) => "device",
            SessionHandle::Queue(_) => "queue",
            SessionHandle::Swapchain(_) => "swapchain",
        }
    }
}

/// Handles in creation order. Each entry depends on everything below it,
/// so release always pops from the top.
#[derive(Debug, Default)]
pub struct HandleStack {
    handles: Vec<SessionHandle>,
}

impl HandleStack {
    pub fn push(&mut self, handle: SessionHandle) {
        debug!("created {} {:?}", handle.kind(), handle);
        self.handles.push(handle);
    }

    pub fn as_slice(&self) -> &[SessionHandle] {
        &self.handles
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Destroys every handle, newest first.
    pub fn release_all<A: NativeApi>(&mut self, api: &mut A) {
        while let Some(handle) = self.handles.pop() {
            debug!("destroying {} {:?}", handle.kind(), handle);
            api.destroy(handle);
        }
    }
}
