/// PresentableSurface trait - what the frame orchestrator needs from the host window

use crate::device::Extent2D;

/// Connection between an OS window and the presentation engine
///
/// Owned by the host; outlives every image chain built for it.
pub trait PresentableSurface {
    /// Current drawable size in pixels (zero while minimized)
    fn extent(&self) -> Extent2D;

    /// True if the window was resized since the flag was last reset
    fn was_resized(&self) -> bool;

    fn reset_resized_flag(&mut self);

    /// Block until at least one OS event has been processed
    fn wait_events(&mut self);
}
