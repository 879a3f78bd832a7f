//! Integration tests exercising the public API surface

use std::sync::Arc;

use umbra_render_engine::umbra::render::{
    choose_extent, choose_present_mode, choose_surface_format, clamp_image_count, PresentMode,
    Shader, ShaderSet, ShaderStage, SurfaceCaps, SurfaceFormat, TextureFormat,
};
use umbra_render_engine::umbra::graph::{validate_chain, DependencyEdge};
use umbra_render_engine::umbra::render::{AccessKinds, PipelineStages};
use umbra_render_engine::umbra::system::RenderSystemConfig;
use umbra_render_engine::umbra::{Error, Result};

/// Minimal shader stand-in, enough to build shader sets
struct StubShader(ShaderStage);

impl Shader for StubShader {
    fn stage(&self) -> ShaderStage {
        self.0
    }
}

#[test]
fn test_default_config_is_double_buffered() {
    let config = RenderSystemConfig::default();
    assert_eq!(config.frames_in_flight, 2);
    assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_selection_policy_is_deterministic() {
    let formats = [
        SurfaceFormat {
            format: TextureFormat::R8G8B8A8_UNORM,
            srgb_color_space: true,
        },
        SurfaceFormat {
            format: TextureFormat::R8G8B8A8_SRGB,
            srgb_color_space: true,
        },
    ];
    let first = choose_surface_format(&formats).unwrap();
    let second = choose_surface_format(&formats).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.format, TextureFormat::R8G8B8A8_SRGB);

    let modes = [PresentMode::Fifo, PresentMode::Mailbox];
    assert_eq!(choose_present_mode(&modes).unwrap(), PresentMode::Mailbox);

    let caps = SurfaceCaps {
        min_image_count: 2,
        max_image_count: 3,
        current_extent: (u32::MAX, u32::MAX),
        min_extent: (1, 1),
        max_extent: (2048, 2048),
    };
    assert_eq!(choose_extent(&caps, (800, 600)), (800, 600));
    assert_eq!(clamp_image_count(&caps, 2), 2);
}

#[test]
fn test_chain_validation_is_public() {
    let edge = DependencyEdge {
        src_pass: 0,
        dst_pass: 1,
        src_stages: PipelineStages::LATE_FRAGMENT_TESTS,
        src_access: AccessKinds::DEPTH_STENCIL_ATTACHMENT_WRITE,
        dst_stages: PipelineStages::FRAGMENT_SHADER,
        dst_access: AccessKinds::SHADER_READ,
    };
    assert!(validate_chain(2, &[edge]).is_ok());
    assert!(validate_chain(1, &[edge]).is_err());
}

#[test]
fn test_shader_sets_compose_from_user_shaders() {
    let vertex: Arc<dyn Shader> = Arc::new(StubShader(ShaderStage::Vertex));
    let fragment: Arc<dyn Shader> = Arc::new(StubShader(ShaderStage::Fragment));
    let set = ShaderSet::vertex_fragment(vertex, fragment);
    assert_eq!(set.stages().len(), 2);
}

#[test]
fn test_retryable_errors_flow_through_result() {
    fn fails_retryably() -> Result<()> {
        Err(Error::SurfaceOutdated)
    }
    let err = fails_retryably().unwrap_err();
    assert!(err.is_retryable());
}
