/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queues for command submission and presentation
/// - Command pool for one-shot upload operations
///
/// Every GPU resource holds this context via `Arc`, so the instance
/// and device are destroyed exactly once, after the last resource has
/// released its handles.

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use umbra_render_engine::umbra::{Error, Result};
use umbra_render_engine::engine_err;

/// Shared GPU context for all Vulkan resources
pub struct GpuContext {
    /// Loader entry point, kept alive for the instance's lifetime
    pub(crate) _entry: ash::Entry,

    /// Vulkan instance
    pub(crate) instance: ash::Instance,

    /// Selected physical device
    pub(crate) physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub(crate) device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety).
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device.
    pub(crate) allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue for rendering submissions
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,

    /// Presentation queue; may alias the graphics queue
    pub(crate) present_queue: vk::Queue,
    pub(crate) present_queue_family: u32,

    /// Presentation surface
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) surface_loader: ash::khr::surface::Instance,

    /// Reusable command pool for one-shot upload operations
    /// (created with the TRANSIENT flag)
    pub(crate) upload_command_pool: Mutex<vk::CommandPool>,

    /// Debug messenger, present when validation is enabled
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug: Option<crate::vulkan_debug::DebugMessenger>,
}

impl GpuContext {
    /// Begin a single-use command buffer from the upload pool
    ///
    /// Used by all setup-time transfers (buffer copies, image uploads,
    /// layout transitions). Pair with `end_one_shot_commands`.
    pub(crate) fn begin_one_shot_commands(&self) -> Result<vk::CommandBuffer> {
        let pool = self.upload_command_pool.lock().map_err(|_| {
            Error::BackendError("upload command pool lock poisoned".to_string())
        })?;

        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to allocate one-shot command buffer: {:?}", e)
                })?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to begin one-shot command buffer: {:?}", e)
                })?;

            Ok(command_buffer)
        }
    }

    /// Finish a single-use command buffer: submit synchronously, wait
    /// for the queue, free the buffer
    pub(crate) fn end_one_shot_commands(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.device
                .end_command_buffer(command_buffer)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to end one-shot command buffer: {:?}", e)
                })?;

            let buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&buffers);
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to submit one-shot commands: {:?}", e)
                })?;
            self.device
                .queue_wait_idle(self.graphics_queue)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to wait for one-shot commands: {:?}", e)
                })?;

            let pool = self.upload_command_pool.lock().map_err(|_| {
                Error::BackendError("upload command pool lock poisoned".to_string())
            })?;
            self.device.free_command_buffers(*pool, &buffers);
            Ok(())
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // Allocator first: it frees GPU memory against the live device
            ManuallyDrop::drop(&mut self.allocator);

            if let Ok(pool) = self.upload_command_pool.lock() {
                self.device.destroy_command_pool(*pool, None);
            }

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            #[cfg(feature = "vulkan-validation")]
            if let Some(debug) = self.debug.take() {
                debug.destroy();
            }

            self.instance.destroy_instance(None);
        }
    }
}
