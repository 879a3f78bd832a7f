//! Unit tests for the pass chain

use std::sync::Arc;

use crate::render::mock_device::MockDevice;
use crate::render::{
    AccessKinds, Framebuffer, GraphicsDevice, PipelineStages, Swapchain, Texture, TextureUsage,
};
use crate::render_graph::{
    validate_chain, DependencyEdge, RenderGraph, COLOR_PASS, SHADOW_PASS,
};

fn edge(src: usize, dst: usize) -> DependencyEdge {
    DependencyEdge {
        src_pass: src,
        dst_pass: dst,
        src_stages: PipelineStages::LATE_FRAGMENT_TESTS,
        src_access: AccessKinds::DEPTH_STENCIL_ATTACHMENT_WRITE,
        dst_stages: PipelineStages::FRAGMENT_SHADER,
        dst_access: AccessKinds::SHADER_READ,
    }
}

// ============================================================================
// Chain validation
// ============================================================================

#[test]
fn test_forward_chain_is_valid() {
    validate_chain(2, &[edge(0, 1)]).unwrap();
    validate_chain(3, &[edge(0, 1), edge(1, 2)]).unwrap();
}

#[test]
fn test_backward_edge_is_rejected() {
    assert!(validate_chain(2, &[edge(1, 0)]).is_err());
    assert!(validate_chain(2, &[edge(0, 0)]).is_err());
}

#[test]
fn test_out_of_range_edge_is_rejected() {
    assert!(validate_chain(2, &[edge(0, 2)]).is_err());
}

#[test]
fn test_disconnected_consecutive_passes_are_rejected() {
    // 3 passes, only 0 -> 2 declared: 0-1 and 1-2 are unconnected
    assert!(validate_chain(3, &[edge(0, 2)]).is_err());
}

// ============================================================================
// Graph construction
// ============================================================================

#[test]
fn test_two_pass_chain_shape() {
    let mock = MockDevice::new();
    let swapchain = mock.new_swapchain(3, 800, 600);
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock);

    let graph = RenderGraph::new(&device, swapchain.as_ref()).unwrap();
    assert_eq!(graph.pass_count(), 2);
    assert_eq!(graph.pass(SHADOW_PASS).name(), "shadow");
    assert_eq!(graph.pass(COLOR_PASS).name(), "color");
    assert_eq!(graph.extent(), (800, 600));
}

#[test]
fn test_shadow_to_color_dependency_edge_is_declared() {
    let mock = MockDevice::new();
    let swapchain = mock.new_swapchain(2, 800, 600);
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock);

    let graph = RenderGraph::new(&device, swapchain.as_ref()).unwrap();
    let edges = graph.edges();
    assert_eq!(edges.len(), 1);

    // The one hard ordering constraint: color pass fragment work waits
    // for the shadow pass's depth writes
    let edge = &edges[0];
    assert_eq!(edge.src_pass, SHADOW_PASS);
    assert_eq!(edge.dst_pass, COLOR_PASS);
    assert!(edge
        .src_access
        .contains(AccessKinds::DEPTH_STENCIL_ATTACHMENT_WRITE));
    assert!(edge.dst_stages.contains(PipelineStages::FRAGMENT_SHADER));
    assert!(edge.dst_access.contains(AccessKinds::SHADER_READ));
}

#[test]
fn test_framebuffers_exist_per_swapchain_image() {
    let mock = MockDevice::new();
    let swapchain = mock.new_swapchain(3, 800, 600);
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock);

    let graph = RenderGraph::new(&device, swapchain.as_ref()).unwrap();
    for image_index in 0..3 {
        assert_eq!(graph.pass(SHADOW_PASS).framebuffer(image_index).width(), 800);
        assert_eq!(graph.pass(COLOR_PASS).framebuffer(image_index).height(), 600);
    }
}

#[test]
fn test_shadow_map_is_sampled_depth() {
    let mock = MockDevice::new();
    let swapchain = mock.new_swapchain(2, 800, 600);
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock);

    let graph = RenderGraph::new(&device, swapchain.as_ref()).unwrap();
    let shadow_map = graph.shadow_map();
    let info = shadow_map.info();
    assert!(info.format.is_depth());
    assert_eq!(info.usage, TextureUsage::SampledDepthAttachment);
    assert_eq!((info.width, info.height), (800, 600));
}

#[test]
fn test_rebuild_is_idempotent_without_resize() {
    let mock = MockDevice::new();
    let mut swapchain = mock.new_swapchain(2, 800, 600);
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock);

    let mut graph = RenderGraph::new(&device, swapchain.as_ref()).unwrap();
    let format = graph.color_format();
    let depth_format = graph.depth_format();

    // Rebuild twice with no intervening resize: same extent and
    // formats both times
    for _ in 0..2 {
        swapchain.recreate(800, 600).unwrap();
        graph.rebuild(&device, swapchain.as_ref()).unwrap();
        assert_eq!(graph.extent(), (800, 600));
        assert_eq!(graph.color_format(), format);
        assert_eq!(graph.depth_format(), depth_format);
    }
    assert_eq!(graph.generation(), 2);
}

#[test]
fn test_rebuild_follows_new_extent() {
    let mock = MockDevice::new();
    let mut swapchain = mock.new_swapchain(2, 800, 600);
    let device: Arc<dyn GraphicsDevice> = Arc::new(mock);

    let mut graph = RenderGraph::new(&device, swapchain.as_ref()).unwrap();
    swapchain.recreate(1024, 768).unwrap();
    graph.rebuild(&device, swapchain.as_ref()).unwrap();

    assert_eq!(graph.extent(), (1024, 768));
    assert_eq!(graph.pass(SHADOW_PASS).framebuffer(0).width(), 1024);
    assert_eq!(graph.shadow_map().info().width, 1024);
}
