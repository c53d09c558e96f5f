// SPDX-License-Identifier: CEPL-1.0
//! Windowing service: the winit re-export plus the two things the graphics
//! session needs from it, window attributes and the instance extensions
//! required to present to its windows.

pub use winit;

use anyhow::{Context, Result};
use raw_window_handle::HasDisplayHandle;
use rgb_render::RenderSize;
use std::ffi::{CStr, CString};
use tracing::debug;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowAttributes};

#[derive(Clone, Debug)]
pub struct WindowSpec {
    pub title: String,
    pub size: RenderSize,
    pub resizable: bool,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            title: "Vulkan".to_owned(),
            size: RenderSize::default(),
            resizable: false,
        }
    }
}

pub fn window_attributes(spec: &WindowSpec) -> WindowAttributes {
    Window::default_attributes()
        .with_title(spec.title.clone())
        .with_inner_size(PhysicalSize::new(spec.size.width, spec.size.height))
        .with_resizable(spec.resizable)
}

/// Current inner size, never zero in either dimension.
pub fn render_size(window: &Window) -> RenderSize {
    let size = window.inner_size();
    RenderSize::new(size.width.max(1), size.height.max(1))
}

/// Instance extensions the display server needs for surface creation.
pub fn required_instance_extensions(display: &dyn HasDisplayHandle) -> Result<Vec<CString>> {
    let raw = display
        .display_handle()
        .context("display_handle")?
        .as_raw();
    let names = ash_window::enumerate_required_extensions(raw)
        .context("enumerate_required_extensions")?;
    let names: Vec<CString> = names
        .iter()
        //SAFETY: ash-window hands out pointers to static NUL-terminated names
        .map(|&p| unsafe { CStr::from_ptr(p) }.to_owned())
        .collect();
    debug!("window system needs {names:?}");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{DisplayHandle, HandleError};

    struct NoDisplay;

    impl HasDisplayHandle for NoDisplay {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    #[test]
    fn display_handle_failure_keeps_the_handle_error() {
        let err = required_instance_extensions(&NoDisplay).unwrap_err();
        assert_eq!(err.to_string(), "display_handle");
        assert!(matches!(
            err.root_cause().downcast_ref::<HandleError>(),
            Some(HandleError::Unavailable)
        ));
    }

    #[test]
    fn default_window_matches_the_classic_setup() {
        let spec = WindowSpec::default();
        assert_eq!(spec.size, RenderSize::new(800, 600));
        assert!(!spec.resizable);
        assert_eq!(spec.title, "Vulkan");
    }
}
