/*!
# Umbra Render Engine

Core traits and types for the Umbra real-time rendering engine.

This crate provides the platform-agnostic API for frame rendering using
trait-based dynamic polymorphism. Backend implementations (Vulkan today,
others possible) supply concrete types behind these traits.

## Architecture

- **GraphicsDevice**: factory and submission interface for GPU resources
- **Swapchain**: presentable image chain with a rebuild protocol
- **FrameScheduler**: fixed-depth ring of in-flight frames (fences + semaphores)
- **RenderGraph**: ordered pass chain (shadow map pass feeding a color pass)
- **Renderable**: one drawable bundling geometry, shaders and resource bindings
- **RenderSystem**: facade wiring all of the above into `draw_frame`

Backend implementations provide concrete types that implement the
`render` traits; everything above the `render` module is backend-free
and is exercised against a recording mock device in the test suite.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod render;
pub mod frame;
pub mod render_graph;
pub mod resource;
pub mod system;

// Main umbra namespace module
pub mod umbra {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Render sub-module with all device-facing types
    pub mod render {
        pub use crate::render::*;
    }

    // Frame orchestration sub-module
    pub mod frame {
        pub use crate::frame::*;
    }

    // Render graph sub-module
    pub mod graph {
        pub use crate::render_graph::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Render system facade
    pub mod system {
        pub use crate::system::*;
    }
}

// Flat re-exports for backend crates and applications
pub use crate::error::{Error, Result};
pub use crate::engine::Engine;

// Re-export math library at crate root
pub use glam;
