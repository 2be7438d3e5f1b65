/// Surface module - the host window as seen by the presentation pipeline

pub mod presentable_surface;
pub mod window_surface;

pub use presentable_surface::*;
pub use window_surface::*;

// Mock surface for tests (no window required)
#[cfg(test)]
pub mod mock_surface;
