//! Monotonic elapsed-time source for the frame loop.
//!
//! The clock is owned by the frame scheduler and read exactly once per tick;
//! everything else only ever sees the resulting [`FrameTime`].

use instant::{Duration, Instant};

/// Time as observed at the start of one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    /// Time since the clock started.
    pub elapsed: Duration,
    /// Time since the previous tick (zero on the first one).
    pub delta: Duration,
    /// Zero-based tick counter.
    pub frame: u64,
}

impl FrameTime {
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// A frame time at an arbitrary point, e.g. for driving mutators by hand.
    pub fn at(elapsed: Duration, delta: Duration, frame: u64) -> Self {
        Self {
            elapsed,
            delta,
            frame,
        }
    }
}

#[derive(Debug)]
pub struct Clock {
    start: Instant,
    last: Duration,
    frame: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last: Duration::ZERO,
            frame: 0,
        }
    }

    /// Sample the clock for the tick that is about to run.
    pub(crate) fn tick(&mut self) -> FrameTime {
        let elapsed = self.start.elapsed().max(self.last);
        let time = FrameTime {
            elapsed,
            delta: if self.frame == 0 {
                Duration::ZERO
            } else {
                elapsed - self.last
            },
            frame: self.frame,
        };
        self.last = elapsed;
        self.frame += 1;
        time
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
