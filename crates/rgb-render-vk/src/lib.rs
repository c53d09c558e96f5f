// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Vulkan presentation bring-up: device discovery, first-match selection,
//! swapchain negotiation and strictly ordered teardown.

pub mod api;
mod ash_api;
pub mod caps;
pub mod debug;
mod error;
mod handles;
pub mod negotiate;
pub mod select;
mod session;

#[cfg(test)]
pub(crate) mod testing;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

pub use api::NativeApi;
pub use ash_api::AshApi;
pub use error::{ExtensionScope, SessionError};
pub use handles::{HandleStack, SessionHandle};
pub use negotiate::{SurfaceConfiguration, SurfacePreferences};
pub use select::QueueAssignment;
pub use session::{
    Queues, SelectedDevice, Session, SessionConfig, SessionState, VALIDATION_LAYER,
};

pub type VkSession = Session<AshApi>;

/// Loads the system Vulkan loader and brings a session up on `window`.
pub fn initialize_session(
    window: &dyn HasWindowHandle,
    display: &dyn HasDisplayHandle,
    config: &SessionConfig,
) -> Result<VkSession, SessionError> {
    let api = AshApi::load()?;
    Session::initialize(api, window, display, config)
}

/// Destroys every handle in reverse creation order.
pub fn teardown_session<A: NativeApi>(session: Session<A>) {
    session.teardown();
}
