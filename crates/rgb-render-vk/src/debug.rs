// SPDX-License-Identifier: CEPL-1.0
//! Validation messages routed into `tracing`.

use ash::vk;
use std::ffi::CStr;

pub(crate) const TARGET: &str = "rgb::validation";

pub fn severity_name(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> &'static str {
    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => "ERROR",
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => "WARNING",
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => "INFO",
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => "VERBOSE",
        _ => "UNKNOWN",
    }
}

pub fn category_name(kind: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    match kind {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "GENERAL",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "VALIDATION",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "PERFORMANCE",
        _ => "UNKNOWN",
    }
}

/// Emits one `(severity, category, message)` triple at the matching level.
pub fn route(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    kind: vk::DebugUtilsMessageTypeFlagsEXT,
    message: &str,
) {
    let category = category_name(kind);
    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => {
            tracing::trace!(target: TARGET, "[{}] {}", category, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            tracing::info!(target: TARGET, "[{}] {}", category, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            tracing::warn!(target: TARGET, "[{}] {}", category, message)
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            tracing::error!(target: TARGET, "[{}] {}", category, message)
        }
        _ => tracing::debug!(
            target: TARGET,
            "[{}] {}: {}",
            category,
            severity_name(severity),
            message
        ),
    }
}

pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    kind: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    //SAFETY: the loader hands us a callback data struct that is valid for
    //the duration of the call
    let p_message = unsafe { (*data).p_message };
    if !p_message.is_null() {
        //SAFETY: p_message is a NUL-terminated string owned by the loader
        let message = unsafe { CStr::from_ptr(p_message) }.to_string_lossy();
        route(severity, kind, &message);
    }
    vk::FALSE
}

pub(crate) fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}
