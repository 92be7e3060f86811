use std::time::{Duration, Instant};

/// Timing of one closed frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameTime {
    /// Wall-clock time between the frame's start and this tick.
    pub duration: Duration,

    /// Timestamp of the tick; the next frame starts here.
    pub now: Instant,

    /// Index of the frame that just closed.
    pub frame_index: u64,
}

/// Measures wall-clock frame durations.
///
/// Durations are reported unclamped: statistics want the real time a frame
/// took, stalls included. Callers that need deterministic timing (tests,
/// replays) pass timestamps to [`tick_at`](Self::tick_at).
#[derive(Debug, Clone)]
pub struct FrameClock {
    started: Instant,
    frame_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            started: now,
            frame_index: 0,
        }
    }

    /// Restarts the current frame at `now` without closing it.
    pub fn reset_at(&mut self, now: Instant) {
        self.started = now;
    }

    /// Start of the frame in progress.
    #[inline]
    pub fn frame_started(&self) -> Instant {
        self.started
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Closes the current frame at `now` and starts the next one.
    ///
    /// A `now` earlier than the frame start yields a zero duration.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let duration = now.saturating_duration_since(self.started);
        self.started = now;

        let ft = FrameTime {
            duration,
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
