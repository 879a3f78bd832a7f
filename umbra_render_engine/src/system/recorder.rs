/// Command recording for the pass chain
///
/// Re-records, for every swapchain image, one command list per pass:
/// the shadow list binds the shared shadow pipeline and draws every
/// renderable's geometry against the per-image shadow binding group;
/// the color list binds each renderable's own pipeline and binding
/// group. The clear values are baked into the recorded lists, so a
/// clear color change forces a re-record. Every trigger re-records
/// everything - per-event cost is traded for correctness simplicity.

use std::sync::Arc;

use crate::error::Result;
use crate::render::{BindingGroup, ClearValue, CommandList, GraphicsDevice, Pipeline};
use crate::render_graph::{RenderGraph, COLOR_PASS, SHADOW_PASS};
use crate::resource::Renderable;

/// Record the shadow and color command lists for every swapchain image
pub(crate) fn record_all(
    device: &Arc<dyn GraphicsDevice>,
    graph: &RenderGraph,
    shadow_pipeline: &Arc<dyn Pipeline>,
    shadow_groups: &[Arc<dyn BindingGroup>],
    renderables: &[&Renderable],
    clear_color: [f32; 4],
    image_count: usize,
) -> Result<(Vec<Box<dyn CommandList>>, Vec<Box<dyn CommandList>>)> {
    let mut shadow_lists = Vec::with_capacity(image_count);
    let mut color_lists = Vec::with_capacity(image_count);

    for image_index in 0..image_count {
        shadow_lists.push(record_shadow_list(
            device,
            graph,
            shadow_pipeline,
            &shadow_groups[image_index],
            renderables,
            image_index,
        )?);
        color_lists.push(record_color_list(
            device,
            graph,
            renderables,
            clear_color,
            image_index,
        )?);
    }

    Ok((shadow_lists, color_lists))
}

fn record_shadow_list(
    device: &Arc<dyn GraphicsDevice>,
    graph: &RenderGraph,
    shadow_pipeline: &Arc<dyn Pipeline>,
    shadow_group: &Arc<dyn BindingGroup>,
    renderables: &[&Renderable],
    image_index: usize,
) -> Result<Box<dyn CommandList>> {
    let pass = graph.pass(SHADOW_PASS);
    let mut cmd = device.create_command_list()?;

    cmd.begin()?;
    cmd.begin_render_pass(
        pass.handle(),
        pass.framebuffer(image_index),
        &[ClearValue::DepthStencil {
            depth: 1.0,
            stencil: 0,
        }],
    )?;
    cmd.bind_pipeline(shadow_pipeline)?;

    for renderable in renderables {
        let Some(mesh) = renderable.mesh() else {
            continue;
        };
        cmd.bind_vertex_buffer(mesh.vertex_buffer(), 0)?;
        cmd.bind_index_buffer(mesh.index_buffer(), 0, mesh.index_type())?;
        cmd.bind_binding_group(shadow_pipeline, 0, shadow_group)?;
        cmd.draw_indexed(mesh.index_count(), 0, 0)?;
    }

    cmd.end_render_pass()?;
    cmd.end()?;
    Ok(cmd)
}

fn record_color_list(
    device: &Arc<dyn GraphicsDevice>,
    graph: &RenderGraph,
    renderables: &[&Renderable],
    clear_color: [f32; 4],
    image_index: usize,
) -> Result<Box<dyn CommandList>> {
    let pass = graph.pass(COLOR_PASS);
    let mut cmd = device.create_command_list()?;

    cmd.begin()?;
    cmd.begin_render_pass(
        pass.handle(),
        pass.framebuffer(image_index),
        &[
            ClearValue::Color(clear_color),
            ClearValue::DepthStencil {
                depth: 1.0,
                stencil: 0,
            },
        ],
    )?;

    // Each renderable binds its own pipeline - shader sets differ per
    // object
    for renderable in renderables {
        let (Some(mesh), Some(pipeline)) = (renderable.mesh(), renderable.pipeline()) else {
            continue;
        };
        cmd.bind_pipeline(pipeline)?;
        cmd.bind_vertex_buffer(mesh.vertex_buffer(), 0)?;
        cmd.bind_index_buffer(mesh.index_buffer(), 0, mesh.index_type())?;
        cmd.bind_binding_group(pipeline, 0, renderable.binding_group(image_index))?;
        cmd.draw_indexed(mesh.index_count(), 0, 0)?;
    }

    cmd.end_render_pass()?;
    cmd.end()?;
    Ok(cmd)
}
