// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use std::fmt;
use thiserror::Error;

/// Where a required extension was looked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionScope {
    Instance,
    Device,
}

impl fmt::Display for ExtensionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtensionScope::Instance => "instance",
            ExtensionScope::Device => "device",
        })
    }
}

/// Every way bringing up a session can fail. All of them are fatal.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),
    #[error("Couldn't get window or display handle: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),
    #[error("Application name contains an interior NUL byte")]
    InvalidAppName,
    #[error("Missing validation layers: {0:?}")]
    MissingLayer(Vec<String>),
    #[error("Missing required {scope} extensions: {names:?}")]
    MissingExtension {
        scope: ExtensionScope,
        names: Vec<String>,
    },
    #[error("No suitable Vulkan physical device found")]
    NoSuitableDevice,
    #[error("Vulkan reported no {0}")]
    Enumeration(&'static str),
    #[error("{call} failed: {result}")]
    NativeApi {
        call: &'static str,
        result: vk::Result,
    },
    #[error("Invariant violated: {0}")]
    InvariantViolation(&'static str),
}

/// Tags a raw `vk::Result` failure with the call that produced it.
pub(crate) trait NativeResultExt<T> {
    fn native(self, call: &'static str) -> Result<T, SessionError>;
}

impl<T> NativeResultExt<T> for Result<T, vk::Result> {
    fn native(self, call: &'static str) -> Result<T, SessionError> {
        self.map_err(|result| SessionError::NativeApi { call, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_names_the_failing_call() {
        let res: Result<(), vk::Result> = Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        let err = res.native("vkCreateDevice").unwrap_err();
        assert!(matches!(
            err,
            SessionError::NativeApi {
                call: "vkCreateDevice",
                result: vk::Result::ERROR_OUT_OF_HOST_MEMORY
            }
        ));
        assert!(err.to_string().starts_with("vkCreateDevice failed"));
    }

    #[test]
    fn window_handle_errors_convert_and_chain() {
        let err = SessionError::from(raw_window_handle::HandleError::Unavailable);
        assert!(matches!(err, SessionError::WindowHandle(_)));
        let source = std::error::Error::source(&err).expect("handle error is the source");
        assert!(source
            .downcast_ref::<raw_window_handle::HandleError>()
            .is_some());
    }

    #[test]
    fn missing_extension_lists_every_name() {
        let err = SessionError::MissingExtension {
            scope: ExtensionScope::Device,
            names: vec!["VK_KHR_swapchain".into(), "VK_KHR_maintenance1".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("device"));
        assert!(msg.contains("VK_KHR_swapchain"));
        assert!(msg.contains("VK_KHR_maintenance1"));
    }
}
