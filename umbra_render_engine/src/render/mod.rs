/// Render module - all device-facing types and traits

// Module declarations
pub mod device;
pub mod buffer;
pub mod texture;
pub mod shader;
pub mod pipeline;
pub mod render_pass;
pub mod render_target;
pub mod swapchain;
pub mod sync;
pub mod command_list;
pub mod binding_group;

// Re-export everything from device.rs
pub use device::*;

// Re-export from other modules
pub use buffer::*;
pub use texture::*;
pub use shader::*;
pub use pipeline::*;
pub use render_pass::*;
pub use render_target::*;
pub use swapchain::*;
pub use sync::*;
pub use command_list::*;
pub use binding_group::*;

// Mock device for tests (no GPU required)
#[cfg(test)]
pub mod mock_device;
