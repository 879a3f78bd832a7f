/// BindingGroup - Vulkan implementation of the BindingGroup trait

use std::sync::Arc;

use ash::vk;
use umbra_render_engine::umbra::render::BindingGroup as RendererBindingGroup;

use crate::vulkan_context::GpuContext;

/// Vulkan binding group implementation
///
/// Wraps a VkDescriptorSet handle. The descriptor set itself is
/// managed by the device's descriptor pool and is freed when the pool
/// is destroyed. Immutable after creation - create a new BindingGroup
/// to change resources.
pub struct BindingGroup {
    /// Shared GPU context, kept so the device outlives the group
    pub(crate) ctx: Arc<GpuContext>,
    /// Vulkan descriptor set handle
    pub(crate) descriptor_set: vk::DescriptorSet,
    /// Layout the set was allocated with, destroyed with the group
    pub(crate) set_layout: vk::DescriptorSetLayout,
    /// Set index this binding group was created for
    pub(crate) set_index: u32,
}

impl RendererBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for BindingGroup {
    fn drop(&mut self) {
        // The descriptor set is freed when the pool is destroyed; only
        // the per-group layout object is released here.
        unsafe {
            self.ctx
                .device
                .destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}
