/// Frame module - in-flight frame ring and per-frame orchestration

mod frame_scheduler;

pub use frame_scheduler::*;
