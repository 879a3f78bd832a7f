//! Demo application: a rotating textured cube casting a shadow onto a
//! floor plane.
//!
//! Window handling, asset paths and geometry generation live here -
//! the engine only consumes the resulting buffers and bytecode blobs.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use umbra_render_engine::umbra::render::{
    BindingKind, DeviceConfig, GraphicsDevice, ShaderSet, ShaderStage, ShaderStageFlags,
};
use umbra_render_engine::umbra::resource::{UniformBuffer, Vertex};
use umbra_render_engine::umbra::system::{RenderSystem, RenderSystemConfig};
use umbra_render_engine::Engine;
use umbra_render_engine_renderer_vulkan::VulkanDevice;

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;
const DESIRED_SWAPCHAIN_IMAGES: u32 = 2;

const SHADOW_VERT_PATH: &str = "assets/shaders/shadow_pass.vert.spv";
const MESH_VERT_PATH: &str = "assets/shaders/mesh.vert.spv";
const MESH_FRAG_PATH: &str = "assets/shaders/mesh.frag.spv";

/// Per-object transforms, std140-compatible
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MvpMatrices {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
}

/// Read a precompiled SPIR-V blob from disk
fn read_shader_file(path: &str) -> Vec<u8> {
    std::fs::read(Path::new(path))
        .unwrap_or_else(|e| panic!("failed to read shader {:?}: {}", path, e))
}

/// 8x8 checkerboard, RGBA8
fn checkerboard_pixels(size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = (x / 8 + y / 8) % 2 == 0;
            let value = if light { 220 } else { 64 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    pixels
}

fn quad_face(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
    corners: [Vec3; 4],
    normal: Vec3,
    tangent: Vec3,
) {
    let base = vertices.len() as u32;
    let uvs = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    for (corner, uv) in corners.iter().zip(uvs) {
        vertices.push(Vertex {
            pos: Vec4::new(corner.x, corner.y, corner.z, 1.0),
            color: Vec4::ONE,
            normal,
            tangent,
            tex_coord: uv,
        });
    }
    indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
}

/// Unit cube with per-face normals and tangents
fn cube_geometry() -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let h = 0.5;

    // +Z
    quad_face(
        &mut vertices,
        &mut indices,
        [
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ],
        Vec3::Z,
        Vec3::X,
    );
    // -Z
    quad_face(
        &mut vertices,
        &mut indices,
        [
            Vec3::new(h, -h, -h),
            Vec3::new(-h, -h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(h, h, -h),
        ],
        -Vec3::Z,
        -Vec3::X,
    );
    // +X
    quad_face(
        &mut vertices,
        &mut indices,
        [
            Vec3::new(h, -h, h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(h, h, h),
        ],
        Vec3::X,
        -Vec3::Z,
    );
    // -X
    quad_face(
        &mut vertices,
        &mut indices,
        [
            Vec3::new(-h, -h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(-h, h, h),
            Vec3::new(-h, h, -h),
        ],
        -Vec3::X,
        Vec3::Z,
    );
    // +Y
    quad_face(
        &mut vertices,
        &mut indices,
        [
            Vec3::new(-h, h, h),
            Vec3::new(h, h, h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
        ],
        Vec3::Y,
        Vec3::X,
    );
    // -Y
    quad_face(
        &mut vertices,
        &mut indices,
        [
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, -h, h),
            Vec3::new(-h, -h, h),
        ],
        -Vec3::Y,
        Vec3::X,
    );

    (vertices, indices)
}

/// Flat floor plane under the cube
fn floor_geometry() -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    quad_face(
        &mut vertices,
        &mut indices,
        [
            Vec3::new(-4.0, -1.0, 4.0),
            Vec3::new(4.0, -1.0, 4.0),
            Vec3::new(4.0, -1.0, -4.0),
            Vec3::new(-4.0, -1.0, -4.0),
        ],
        Vec3::Y,
        Vec3::X,
    );
    (vertices, indices)
}

/// One drawable object with its per-frame transform data
struct DemoObject {
    mvp_ubo: Arc<UniformBuffer>,
    model: Mat4,
    spin: f32,
}

struct RendererState {
    system: RenderSystem,
    objects: Vec<DemoObject>,
    start: Instant,
}

impl RendererState {
    fn new(window: &Window) -> Self {
        let config = DeviceConfig {
            app_name: "Umbra Demo".to_string(),
            ..DeviceConfig::default()
        };
        let vulkan_device = VulkanDevice::new(window, config).expect("device creation failed");

        let size = window.inner_size();
        let swapchain = vulkan_device
            .create_swapchain((size.width, size.height), DESIRED_SWAPCHAIN_IMAGES)
            .expect("swapchain creation failed");

        let device: Arc<dyn GraphicsDevice> = Arc::new(vulkan_device);
        Engine::register_device(device.clone()).expect("device registration failed");
        let mut system = RenderSystem::new(
            device,
            swapchain,
            &read_shader_file(SHADOW_VERT_PATH),
            RenderSystemConfig {
                clear_color: [0.05, 0.05, 0.1, 1.0],
                ..RenderSystemConfig::default()
            },
        )
        .expect("render system creation failed");

        let vert = system
            .create_shader(read_shader_file(MESH_VERT_PATH), ShaderStage::Vertex)
            .expect("vertex shader creation failed");
        let frag = system
            .create_shader(read_shader_file(MESH_FRAG_PATH), ShaderStage::Fragment)
            .expect("fragment shader creation failed");
        let shaders = ShaderSet::vertex_fragment(vert, frag);

        let texture = system
            .create_texture(&checkerboard_pixels(64), 64, 64)
            .expect("texture creation failed");
        let shadow_map = system.shadow_map();

        let mut objects = Vec::new();
        for (geometry, model, spin) in [
            (cube_geometry(), Mat4::IDENTITY, 1.0f32),
            (floor_geometry(), Mat4::IDENTITY, 0.0f32),
        ] {
            let (vertices, indices) = geometry;
            let mesh = system.create_mesh(&vertices, &indices).expect("mesh upload failed");
            let mvp_ubo = system
                .create_uniform_buffer::<MvpMatrices>(1)
                .expect("uniform buffer creation failed");

            let mut renderable = system.create_renderable();
            renderable.set_mesh(mesh);
            renderable.set_shaders(shaders.clone());
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
            renderable
                .declare_binding(
                    BindingKind::CombinedImageSampler,
                    ShaderStageFlags::FRAGMENT,
                    2,
                    1,
                )
                .unwrap();
            renderable.bind_uniform_buffer(mvp_ubo.clone(), 0).unwrap();
            renderable.bind_texture(texture.clone(), 1).unwrap();
            renderable.bind_texture(shadow_map.clone(), 2).unwrap();

            system
                .instantiate_renderable(renderable)
                .expect("renderable instantiation failed");
            objects.push(DemoObject { mvp_ubo, model, spin });
        }

        Self {
            system,
            objects,
            start: Instant::now(),
        }
    }

    fn light_matrix() -> Mat4 {
        let projection = Mat4::orthographic_rh(-6.0, 6.0, -6.0, 6.0, 0.1, 20.0);
        let view = Mat4::look_at_rh(Vec3::new(4.0, 6.0, 4.0), Vec3::ZERO, Vec3::Y);
        projection * view
    }

    fn update_and_draw(&mut self, aspect: f32) {
        let elapsed = self.start.elapsed().as_secs_f32();

        let view = Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 50.0);

        for object in &self.objects {
            let model = object.model * Mat4::from_rotation_y(elapsed * object.spin);
            let matrices = MvpMatrices {
                model,
                view,
                projection,
            };
            self.system
                .update_uniform_buffer(&object.mvp_ubo, &matrices, 0)
                .expect("uniform update failed");
        }
        self.system
            .set_light_matrix(&Self::light_matrix())
            .expect("light update failed");

        if let Err(e) = self.system.draw_frame() {
            log::error!("draw_frame failed: {}", e);
        }
    }
}

#[derive(Default)]
struct DemoApp {
    window: Option<Window>,
    renderer: Option<RendererState>,
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Umbra Demo")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = event_loop
            .create_window(attributes)
            .expect("window creation failed");

        self.renderer = Some(RendererState::new(&window));
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(renderer) = &self.renderer {
                    renderer.system.wait_idle().ok();
                }
                Engine::shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.system.handle_resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
                    let size = window.inner_size();
                    let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
                    renderer.update_and_draw(aspect);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    env_logger::init();
    Engine::initialize().expect("engine initialization failed");

    let event_loop = EventLoop::new().expect("event loop creation failed");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::default();
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {}", e);
    }
}
