/// Shader - Vulkan implementation of the Shader trait

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;
use umbra_render_engine::umbra::render::{Shader as RendererShader, ShaderStage};

use crate::vulkan_context::GpuContext;

/// Vulkan shader module implementation
pub struct Shader {
    pub(crate) ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: ShaderStage,
    /// Entry point, stored as CString so pipeline creation can borrow it
    pub(crate) entry_point: CString,
}

impl RendererShader for Shader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}
