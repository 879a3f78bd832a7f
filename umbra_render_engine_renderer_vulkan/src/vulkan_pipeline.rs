/// Pipeline - Vulkan implementation of the Pipeline trait

use std::sync::Arc;

use ash::vk;
use umbra_render_engine::umbra::render::{
    Pipeline as RendererPipeline, PipelineDesc, PrimitiveTopology, RenderPass, Shader,
    VertexInputRate,
};
use umbra_render_engine::umbra::Result;
use umbra_render_engine::engine_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    attribute_format_to_vk, binding_kind_to_vk, cull_mode_to_vk, front_face_to_vk,
    shader_stage_to_vk, stage_flags_to_vk, topology_to_vk,
};
use crate::vulkan_render_pass::RenderPass as VulkanRenderPass;
use crate::vulkan_shader::Shader as VulkanShader;

/// Vulkan graphics pipeline implementation
pub struct Pipeline {
    pub(crate) ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) set_layout: vk::DescriptorSetLayout,
}

impl RendererPipeline for Pipeline {}

impl Pipeline {
    /// Build the full fixed-function + programmable state
    ///
    /// Viewport and scissor are baked from the descriptor's extent;
    /// pipelines are recreated on swapchain rebuild. Tessellation
    /// state is attached only when the shader set carries tessellation
    /// stages.
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &PipelineDesc) -> Result<Self> {
        unsafe {
            let vk_pass = &*(desc.render_pass.as_ref() as *const dyn RenderPass
                as *const VulkanRenderPass);

            // Shader stages
            let shaders = desc.shaders.stages();
            let mut stage_infos = Vec::with_capacity(shaders.len());
            for shader in &shaders {
                let vk_shader =
                    &*(shader.as_ref() as *const dyn Shader as *const VulkanShader);
                stage_infos.push(
                    vk::PipelineShaderStageCreateInfo::default()
                        .stage(shader_stage_to_vk(vk_shader.stage))
                        .module(vk_shader.module)
                        .name(vk_shader.entry_point.as_c_str()),
                );
            }

            // Vertex input
            let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
                .vertex_layout
                .bindings
                .iter()
                .map(|binding| vk::VertexInputBindingDescription {
                    binding: binding.binding,
                    stride: binding.stride,
                    input_rate: match binding.input_rate {
                        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
                        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
                    },
                })
                .collect();

            let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
                .vertex_layout
                .attributes
                .iter()
                .map(|attribute| vk::VertexInputAttributeDescription {
                    location: attribute.location,
                    binding: attribute.binding,
                    format: attribute_format_to_vk(attribute.format),
                    offset: attribute.offset,
                })
                .collect();

            let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&vertex_bindings)
                .vertex_attribute_descriptions(&vertex_attributes);

            // Input assembly
            let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(topology_to_vk(desc.topology))
                .primitive_restart_enable(false);

            // Fixed viewport and scissor, sized to the current extent
            let viewports = [vk::Viewport::default()
                .x(0.0)
                .y(0.0)
                .width(desc.extent.0 as f32)
                .height(desc.extent.1 as f32)
                .min_depth(0.0)
                .max_depth(1.0)];
            let scissors = [vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: desc.extent.0,
                    height: desc.extent.1,
                },
            }];
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewports(&viewports)
                .scissors(&scissors);

            // Rasterizer
            let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(cull_mode_to_vk(desc.cull_mode))
                .front_face(front_face_to_vk(desc.front_face))
                .depth_bias_enable(false);

            // Multisampling disabled
            let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
                .sample_shading_enable(false)
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            // Depth testing
            let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(desc.depth_test)
                .depth_write_enable(desc.depth_write)
                .depth_compare_op(vk::CompareOp::LESS)
                .depth_bounds_test_enable(false)
                .min_depth_bounds(0.0)
                .max_depth_bounds(1.0)
                .stencil_test_enable(false);

            // Blending off, one state per color attachment
            let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = (0..desc
                .color_attachment_count)
                .map(|_| {
                    vk::PipelineColorBlendAttachmentState::default()
                        .color_write_mask(vk::ColorComponentFlags::RGBA)
                        .blend_enable(false)
                })
                .collect();
            let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(&blend_attachments);

            // Tessellation, only with tessellation stages present
            let tessellation_state = vk::PipelineTessellationStateCreateInfo::default()
                .patch_control_points(desc.patch_control_points);

            // Descriptor set layout + pipeline layout
            let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc
                .binding_layout
                .iter()
                .map(|slot| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(slot.binding)
                        .descriptor_type(binding_kind_to_vk(slot.kind))
                        .descriptor_count(slot.count)
                        .stage_flags(stage_flags_to_vk(slot.stage_flags))
                })
                .collect();
            let set_layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            let set_layout = ctx
                .device
                .create_descriptor_set_layout(&set_layout_info, None)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to create descriptor set layout: {:?}", e)
                })?;

            let set_layouts = [set_layout];
            let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
            let layout = match ctx.device.create_pipeline_layout(&layout_info, None) {
                Ok(layout) => layout,
                Err(e) => {
                    ctx.device.destroy_descriptor_set_layout(set_layout, None);
                    return Err(engine_err!(
                        "umbra::vulkan",
                        "Failed to create pipeline layout: {:?}",
                        e
                    ));
                }
            };

            let mut pipeline_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&stage_infos)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .multisample_state(&multisample_state)
                .depth_stencil_state(&depth_stencil_state)
                .color_blend_state(&color_blend_state)
                .layout(layout)
                .render_pass(vk_pass.render_pass)
                .subpass(0);
            if desc.topology == PrimitiveTopology::PatchList {
                pipeline_info = pipeline_info.tessellation_state(&tessellation_state);
            }

            let pipelines = ctx
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, e)| {
                    ctx.device.destroy_pipeline_layout(layout, None);
                    ctx.device.destroy_descriptor_set_layout(set_layout, None);
                    engine_err!("umbra::vulkan", "Failed to create graphics pipeline: {:?}", e)
                })?;

            Ok(Self {
                ctx,
                pipeline: pipelines[0],
                layout,
                set_layout,
            })
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
            self.ctx
                .device
                .destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}
