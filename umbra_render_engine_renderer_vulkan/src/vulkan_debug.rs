/// Validation layer support - debug utils messenger
///
/// Compiled only with the `vulkan-validation` feature. Validation
/// messages are routed through the engine logger.

use std::ffi::{c_void, CStr};

use ash::vk;
use umbra_render_engine::umbra::Result;
use umbra_render_engine::{Engine, umbra::log::LogSeverity};

/// Debug messenger wrapping the VK_EXT_debug_utils objects
pub(crate) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub(crate) fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe {
            loader
                .create_debug_utils_messenger(&create_info, None)
                .map_err(|e| {
                    umbra_render_engine::umbra::Error::InitializationFailed(format!(
                        "Failed to create debug messenger: {:?}",
                        e
                    ))
                })?
        };

        Ok(Self { loader, messenger })
    }

    pub(crate) fn destroy(self) {
        unsafe {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() {
        return vk::FALSE;
    }
    let message = unsafe {
        let data = &*callback_data;
        if data.p_message.is_null() {
            return vk::FALSE;
        }
        CStr::from_ptr(data.p_message).to_string_lossy().into_owned()
    };

    let log_severity = if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else {
        LogSeverity::Warn
    };
    Engine::log(log_severity, "umbra::vulkan::validation", message);

    vk::FALSE
}
