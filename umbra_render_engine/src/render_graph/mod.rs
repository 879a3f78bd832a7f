/// Render graph module - the ordered pass chain drawn every frame

mod render_graph;

pub use render_graph::*;
