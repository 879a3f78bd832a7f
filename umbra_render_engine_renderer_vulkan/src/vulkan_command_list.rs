/// CommandList - Vulkan implementation of the CommandList trait

use std::sync::Arc;

use ash::vk;
use umbra_render_engine::umbra::render::{
    BindingGroup, Buffer, ClearValue, CommandList as RendererCommandList, Framebuffer, IndexType,
    Pipeline, RenderPass,
};
use umbra_render_engine::umbra::Result;
use umbra_render_engine::engine_err;

use crate::vulkan_binding_group::BindingGroup as VulkanBindingGroup;
use crate::vulkan_buffer::Buffer as VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{clear_value_to_vk, index_type_to_vk};
use crate::vulkan_pipeline::Pipeline as VulkanPipeline;
use crate::vulkan_render_pass::{Framebuffer as VulkanFramebuffer, RenderPass as VulkanRenderPass};

/// Vulkan command list implementation
///
/// One primary command buffer, recorded with SIMULTANEOUS_USE so the
/// same recording can be submitted for consecutive frames.
pub struct CommandList {
    pub(crate) ctx: Arc<GpuContext>,
    pub(crate) pool: vk::CommandPool,
    pub(crate) command_buffer: vk::CommandBuffer,
}

impl RendererCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to reset command buffer: {:?}", e)
                })?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE);
            self.ctx
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to begin command buffer: {:?}", e)
                })
        }
    }

    fn end(&mut self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to end command buffer: {:?}", e))
        }
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        unsafe {
            let vk_pass = &*(render_pass.as_ref() as *const dyn RenderPass
                as *const VulkanRenderPass);
            let vk_framebuffer = &*(framebuffer.as_ref() as *const dyn Framebuffer
                as *const VulkanFramebuffer);

            let clear: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(vk_pass.render_pass)
                .framebuffer(vk_framebuffer.framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: vk::Extent2D {
                        width: vk_framebuffer.width,
                        height: vk_framebuffer.height,
                    },
                })
                .clear_values(&clear);

            self.ctx.device.cmd_begin_render_pass(
                self.command_buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
            Ok(())
        }
    }

    fn end_render_pass(&mut self) -> Result<()> {
        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
            Ok(())
        }
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        unsafe {
            let vk_pipeline =
                &*(pipeline.as_ref() as *const dyn Pipeline as *const VulkanPipeline);
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
            Ok(())
        }
    }

    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        unsafe {
            let vk_pipeline =
                &*(pipeline.as_ref() as *const dyn Pipeline as *const VulkanPipeline);
            let vk_group = &*(binding_group.as_ref() as *const dyn BindingGroup
                as *const VulkanBindingGroup);

            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.layout,
                set_index,
                &[vk_group.descriptor_set],
                &[],
            );
            Ok(())
        }
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        unsafe {
            let vk_buffer = &*(buffer.as_ref() as *const dyn Buffer as *const VulkanBuffer);
            self.ctx.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk_buffer.buffer],
                &[offset],
            );
            Ok(())
        }
    }

    fn bind_index_buffer(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()> {
        unsafe {
            let vk_buffer = &*(buffer.as_ref() as *const dyn Buffer as *const VulkanBuffer);
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
            Ok(())
        }
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        vertex_offset: i32,
    ) -> Result<()> {
        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                1,
                first_index,
                vertex_offset,
                0,
            );
            Ok(())
        }
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            self.ctx
                .device
                .free_command_buffers(self.pool, &[self.command_buffer]);
        }
    }
}
