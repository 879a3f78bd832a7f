/*!
# Umbra Vulkan Backend

ash-based implementation of the `umbra_render_engine` device traits.

`VulkanDevice` owns the instance, physical/logical device, queues and
the statically sized descriptor pool; all other GPU objects share the
`GpuContext` and release their handles through `Drop`, so teardown
order follows the ownership graph instead of manual bookkeeping.
*/

mod vulkan_context;
mod vulkan_device;
mod vulkan_format;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_render_target;
mod vulkan_swapchain;
mod vulkan_sync;
mod vulkan_command_list;
mod vulkan_binding_group;
#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

pub use vulkan_context::GpuContext;
pub use vulkan_device::VulkanDevice;
pub use vulkan_swapchain::VulkanSwapchain;
