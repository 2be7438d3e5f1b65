/// FrameTimer - per-frame delta time for the host loop

use std::time::{Duration, Instant};

/// Default upper bound of a frame step, in seconds
pub const DEFAULT_MAX_FRAME_TIME: f32 = 0.25;

/// Measures the time between host ticks
///
/// The step is clamped so a stall (minimized window, debugger break,
/// chain recreation) does not produce one huge simulation step.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    start: Instant,
    last: Instant,
    max_frame_time: f32,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::with_max_frame_time(DEFAULT_MAX_FRAME_TIME)
    }

    pub fn with_max_frame_time(max_frame_time: f32) -> Self {
        let now = Instant::now();
        Self { start: now, last: now, max_frame_time, frame_count: 0 }
    }

    /// Seconds since the previous tick (or since creation), clamped
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32 {
        let delta = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        self.frame_count += 1;
        delta.min(self.max_frame_time)
    }

    /// Wall time since the timer was created
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn max_frame_time(&self) -> f32 {
        self.max_frame_time
    }
}

#[cfg(test)]
#[path = "frame_timer_tests.rs"]
mod tests;
