/// Mock presentable surface for unit tests (no window required)

use std::collections::VecDeque;

use crate::device::Extent2D;
use crate::surface::PresentableSurface;

/// Scriptable surface: resize, minimize and restore on demand
#[derive(Debug)]
pub struct MockSurface {
    extent: Extent2D,
    resized: bool,
    /// Extents applied one per `wait_events` call, each raising the resize flag
    pending_extents: VecDeque<Extent2D>,
    pub wait_count: usize,
}

impl MockSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: Extent2D::new(width, height),
            resized: false,
            pending_extents: VecDeque::new(),
            wait_count: 0,
        }
    }

    /// Resize the window and raise the resize flag
    pub fn resize(&mut self, width: u32, height: u32) {
        self.extent = Extent2D::new(width, height);
        self.resized = true;
    }

    /// Minimize the window; it is restored after one `wait_events` per queued extent
    pub fn minimize(&mut self, restore_steps: Vec<Extent2D>) {
        self.extent = Extent2D::default();
        self.resized = true;
        self.pending_extents.extend(restore_steps);
    }
}

impl PresentableSurface for MockSurface {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn was_resized(&self) -> bool {
        self.resized
    }

    fn reset_resized_flag(&mut self) {
        self.resized = false;
    }

    fn wait_events(&mut self) {
        self.wait_count += 1;
        match self.pending_extents.pop_front() {
            Some(extent) => {
                if extent != self.extent {
                    self.resized = true;
                }
                self.extent = extent;
            }
            None => panic!("MockSurface::wait_events would block forever (no scripted event)"),
        }
    }
}
