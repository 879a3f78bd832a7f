//! Unit tests for the renderable binding contract
//!
//! A renderable with M declared slots becomes drawable if and only if
//! exactly M binds of matching kind were performed; everything else
//! fails before finalize.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::Error;
use crate::render::mock_device::MockDevice;
use crate::render::{
    BindingKind, GraphicsDevice, SamplerDesc, ShaderSet, ShaderStage, ShaderStageFlags,
    Texture, TextureDesc, TextureFormat, TextureUsage,
};
use crate::resource::{Mesh, Renderable, UniformBuffer, Vertex};

fn device() -> Arc<dyn GraphicsDevice> {
    Arc::new(MockDevice::new())
}

fn test_texture(device: &Arc<dyn GraphicsDevice>) -> Arc<dyn Texture> {
    device
        .create_texture(TextureDesc {
            width: 4,
            height: 4,
            format: TextureFormat::R8G8B8A8_SRGB,
            usage: TextureUsage::Sampled,
            sampler: Some(SamplerDesc::linear_repeat()),
            initial_data: Some(vec![0u8; 64]),
        })
        .unwrap()
}

fn test_mesh(device: &Arc<dyn GraphicsDevice>) -> Arc<Mesh> {
    let vertex = Vertex {
        pos: Vec4::W,
        color: Vec4::ONE,
        normal: Vec3::Z,
        tangent: Vec3::X,
        tex_coord: Vec2::ZERO,
    };
    Mesh::new(device, &[vertex, vertex, vertex], &[0, 1, 2]).unwrap()
}

fn test_shaders(device: &Arc<dyn GraphicsDevice>) -> ShaderSet {
    let vert = device
        .create_shader(crate::render::ShaderDesc::new(vec![0; 4], ShaderStage::Vertex))
        .unwrap();
    let frag = device
        .create_shader(crate::render::ShaderDesc::new(vec![0; 4], ShaderStage::Fragment))
        .unwrap();
    ShaderSet::vertex_fragment(vert, frag)
}

#[test]
fn test_binding_to_undeclared_slot_fails() {
    let device = device();
    let ubo = UniformBuffer::for_type::<Mat4>(&device, 1, 2).unwrap();

    let mut renderable = Renderable::new();
    let err = renderable.bind_uniform_buffer(ubo, 0).unwrap_err();
    assert!(matches!(err, Error::BindingContract(_)));
}

#[test]
fn test_binding_wrong_kind_fails() {
    let device = device();
    let mut renderable = Renderable::new();
    renderable
        .declare_binding(BindingKind::UniformBuffer, ShaderStageFlags::VERTEX, 0, 1)
        .unwrap();

    // A texture into a declared uniform-buffer slot must fail fast
    let err = renderable.bind_texture(test_texture(&device), 0).unwrap_err();
    assert!(matches!(err, Error::BindingContract(_)));

    // And the slot stays unfilled
    assert_eq!(renderable.filled_count(), 0);
}

#[test]
fn test_duplicate_declaration_fails() {
    let mut renderable = Renderable::new();
    renderable
        .declare_binding(BindingKind::UniformBuffer, ShaderStageFlags::VERTEX, 0, 1)
        .unwrap();
    let err = renderable
        .declare_binding(
            BindingKind::CombinedImageSampler,
            ShaderStageFlags::FRAGMENT,
            0,
            1,
        )
        .unwrap_err();
    assert!(matches!(err, Error::BindingContract(_)));
}

#[test]
fn test_finalize_requires_every_slot_filled() {
    let device = device();
    let ubo = UniformBuffer::for_type::<Mat4>(&device, 1, 2).unwrap();

    let mut renderable = Renderable::new();
    renderable.set_mesh(test_mesh(&device));
    renderable.set_shaders(test_shaders(&device));
    renderable
        .declare_binding(BindingKind::UniformBuffer, ShaderStageFlags::VERTEX, 0, 1)
        .unwrap();
    renderable
        .declare_binding(
            BindingKind::CombinedImageSampler,
            ShaderStageFlags::FRAGMENT,
            1,
            1,
        )
        .unwrap();

    renderable.bind_uniform_buffer(ubo, 0).unwrap();
    assert_eq!(renderable.declared_count(), 2);
    assert_eq!(renderable.filled_count(), 1);
    assert!(!renderable.is_complete());

    // One of two slots filled: finalize must refuse
    let err = renderable.finalize(&device, 2).unwrap_err();
    assert!(matches!(err, Error::BindingContract(_)));

    renderable.bind_texture(test_texture(&device), 1).unwrap();
    assert!(renderable.is_complete());
    renderable.finalize(&device, 2).unwrap();
}

#[test]
fn test_finalize_requires_mesh_and_shaders() {
    let device = device();
    let mut renderable = Renderable::new();
    assert!(matches!(
        renderable.finalize(&device, 2).unwrap_err(),
        Error::BindingContract(_)
    ));

    renderable.set_mesh(test_mesh(&device));
    assert!(matches!(
        renderable.finalize(&device, 2).unwrap_err(),
        Error::BindingContract(_)
    ));

    renderable.set_shaders(test_shaders(&device));
    renderable.finalize(&device, 2).unwrap();
}

#[test]
fn test_layout_entries_keep_binding_order() {
    let mut renderable = Renderable::new();
    renderable
        .declare_binding(
            BindingKind::CombinedImageSampler,
            ShaderStageFlags::FRAGMENT,
            2,
            1,
        )
        .unwrap();
    renderable
        .declare_binding(
            BindingKind::UniformBuffer,
            ShaderStageFlags::VERTEX_FRAGMENT,
            0,
            1,
        )
        .unwrap();

    let entries = renderable.layout_entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].binding, 0);
    assert_eq!(entries[0].kind, BindingKind::UniformBuffer);
    assert_eq!(entries[1].binding, 2);
    assert_eq!(entries[1].kind, BindingKind::CombinedImageSampler);
}

#[test]
fn test_drawable_only_after_finalize_and_pipeline() {
    let device = device();
    let ubo = UniformBuffer::for_type::<Mat4>(&device, 1, 2).unwrap();

    let mut renderable = Renderable::new();
    renderable.set_mesh(test_mesh(&device));
    renderable.set_shaders(test_shaders(&device));
    renderable
        .declare_binding(BindingKind::UniformBuffer, ShaderStageFlags::VERTEX, 0, 1)
        .unwrap();
    renderable.bind_uniform_buffer(ubo, 0).unwrap();
    assert!(!renderable.is_drawable());

    renderable.finalize(&device, 2).unwrap();
    assert!(!renderable.is_drawable());

    let pipeline = device
        .create_pipeline(&crate::render::PipelineDesc::opaque(
            test_shaders(&device),
            Vertex::layout(),
            device
                .create_render_pass(&crate::render::RenderPassDesc {
                    color_attachments: vec![],
                    depth_attachment: None,
                    dependencies: vec![],
                })
                .unwrap(),
            renderable.layout_entries(),
            (800, 600),
        ))
        .unwrap();
    renderable.set_pipeline(pipeline);
    assert!(renderable.is_drawable());

    // One binding group per swapchain image
    let _ = renderable.binding_group(0);
    let _ = renderable.binding_group(1);
}
