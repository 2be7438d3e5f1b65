/// Frame module - per-frame protocol, render systems and timing

pub mod frame_orchestrator;
pub mod frame_descriptor;
pub mod frame_timer;

pub use frame_orchestrator::*;
pub use frame_descriptor::*;
pub use frame_timer::*;
