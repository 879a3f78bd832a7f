/// RenderPass and Framebuffer - Vulkan implementations

use std::sync::Arc;

use ash::vk;
use umbra_render_engine::umbra::render::{
    Framebuffer as RendererFramebuffer, RenderPass as RendererRenderPass, RenderPassDesc,
};
use umbra_render_engine::umbra::Result;
use umbra_render_engine::engine_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    access_kinds_to_vk, format_to_vk, layout_to_vk, load_op_to_vk, pipeline_stages_to_vk,
    store_op_to_vk,
};

/// Vulkan render pass implementation
pub struct RenderPass {
    pub(crate) ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    /// Number of color attachments, needed for pipeline blend state
    pub(crate) color_attachment_count: u32,
}

impl RendererRenderPass for RenderPass {}

impl RenderPass {
    /// Build a Vulkan render pass from the engine descriptor
    ///
    /// Attachment order: color attachments first, then the depth
    /// attachment. Dependencies are external-to-subpass-0.
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        let mut attachments = Vec::new();
        let mut color_refs = Vec::new();

        for attachment in &desc.color_attachments {
            color_refs.push(
                vk::AttachmentReference::default()
                    .attachment(attachments.len() as u32)
                    .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            );
            attachments.push(
                vk::AttachmentDescription::default()
                    .format(format_to_vk(attachment.format))
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(load_op_to_vk(attachment.load_op))
                    .store_op(store_op_to_vk(attachment.store_op))
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(layout_to_vk(attachment.initial_layout))
                    .final_layout(layout_to_vk(attachment.final_layout)),
            );
        }

        let depth_ref = desc.depth_attachment.as_ref().map(|attachment| {
            let reference = vk::AttachmentReference::default()
                .attachment(attachments.len() as u32)
                .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
            attachments.push(
                vk::AttachmentDescription::default()
                    .format(format_to_vk(attachment.format))
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(load_op_to_vk(attachment.load_op))
                    .store_op(store_op_to_vk(attachment.store_op))
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(layout_to_vk(attachment.initial_layout))
                    .final_layout(layout_to_vk(attachment.final_layout)),
            );
            reference
        });

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if let Some(depth_ref) = &depth_ref {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let dependencies: Vec<vk::SubpassDependency> = desc
            .dependencies
            .iter()
            .map(|dep| {
                vk::SubpassDependency::default()
                    .src_subpass(vk::SUBPASS_EXTERNAL)
                    .dst_subpass(0)
                    .src_stage_mask(pipeline_stages_to_vk(dep.src_stages))
                    .src_access_mask(access_kinds_to_vk(dep.src_access))
                    .dst_stage_mask(pipeline_stages_to_vk(dep.dst_stages))
                    .dst_access_mask(access_kinds_to_vk(dep.dst_access))
            })
            .collect();

        let subpasses = [subpass];
        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe {
            ctx.device
                .create_render_pass(&create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create render pass: {:?}", e))?
        };

        Ok(Self {
            ctx,
            render_pass,
            color_attachment_count: desc.color_attachments.len() as u32,
        })
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

/// Vulkan framebuffer implementation
pub struct Framebuffer {
    pub(crate) ctx: Arc<GpuContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl RendererFramebuffer for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
