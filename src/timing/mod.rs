//! Monotonic capture clock
//!
//! Sensor workers stamp frames with the time elapsed since the clock's
//! origin, so timestamps from one sensor never go backwards.

use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FrameClock {
    origin: Arc<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            origin: Arc::new(Instant::now()),
        }
    }

    #[inline]
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Time between frames at `fps`, clamped to at least one frame per second.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}
