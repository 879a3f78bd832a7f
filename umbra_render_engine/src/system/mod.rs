/// System module - the render system facade and command recording

mod recorder;
mod render_system;

pub use render_system::*;
