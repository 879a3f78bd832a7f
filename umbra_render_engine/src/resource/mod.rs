/// Resource module - geometry, uniform data and drawable objects

pub mod vertex;
pub mod mesh;
pub mod uniform;
pub mod renderable;

pub use vertex::*;
pub use mesh::*;
pub use uniform::*;
pub use renderable::*;
