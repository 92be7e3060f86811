//! Frame statistics.
//!
//! Purely observational: the context reports draws, state changes and
//! resource lifetimes here, nothing reads them back to make decisions.

mod frame;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::resource::ResourceKind;
use crate::state::PrimitiveType;
use crate::time::FrameClock;

pub use frame::Frame;

pub const DEFAULT_HISTORY: usize = 60;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct Footprint {
    count: usize,
    bytes: usize,
}

/// Per-frame counters with a bounded history of closed frames.
#[derive(Debug, Clone)]
pub struct Stats {
    current: Frame,
    /// Most recent first.
    history: VecDeque<Frame>,
    capacity: usize,
    clock: FrameClock,
    resources: [Footprint; ResourceKind::COUNT],
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl Stats {
    /// Keeps up to `history` closed frames (at least one).
    pub fn new(history: usize) -> Self {
        Self::starting_at(history, Instant::now())
    }

    pub fn starting_at(history: usize, now: Instant) -> Self {
        let capacity = history.max(1);
        Self {
            current: Frame::default(),
            history: VecDeque::with_capacity(capacity),
            capacity,
            clock: FrameClock::starting_at(now),
            resources: [Footprint::default(); ResourceKind::COUNT],
        }
    }

    pub fn begin_frame(&mut self) {
        self.begin_frame_at(Instant::now());
    }

    /// Closes the open frame at `now` into the history and opens a zeroed one.
    pub fn begin_frame_at(&mut self, now: Instant) {
        let time = self.clock.tick_at(now);
        let mut closed = std::mem::take(&mut self.current);
        closed.duration = time.duration;

        self.history.push_front(closed);
        self.history.truncate(self.capacity);
    }

    #[inline]
    pub fn record_state_change(&mut self) {
        self.current.state_change_count += 1;
    }

    #[inline]
    pub fn record_primitives(&mut self, primitive: PrimitiveType, vertex_count: u32) {
        self.current.add_primitives(primitive, vertex_count);
    }

    pub fn record_resource_created(&mut self, kind: ResourceKind, bytes: usize) {
        let entry = &mut self.resources[kind.index()];
        entry.count += 1;
        entry.bytes += bytes;
    }

    pub fn record_resource_destroyed(&mut self, kind: ResourceKind, bytes: usize) {
        let entry = &mut self.resources[kind.index()];
        entry.count = entry.count.saturating_sub(1);
        entry.bytes = entry.bytes.saturating_sub(bytes);
    }

    /// Frames per second over the history window.
    ///
    /// Zero until a frame with a measurable duration has closed.
    pub fn frame_rate(&self) -> f32 {
        let total: Duration = self.history.iter().map(|f| f.duration).sum();
        if total.is_zero() {
            return 0.0;
        }
        self.history.len() as f32 / total.as_secs_f32()
    }

    /// The open frame.
    #[inline]
    pub fn current_frame(&self) -> &Frame {
        &self.current
    }

    /// Closed frames, most recent first.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &Frame> {
        self.history.iter()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.history.front()
    }

    /// Number of frames currently held in the history.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn history_capacity(&self) -> usize {
        self.capacity
    }

    pub fn resource_count(&self, kind: ResourceKind) -> usize {
        self.resources[kind.index()].count
    }

    pub fn resource_bytes(&self, kind: ResourceKind) -> usize {
        self.resources[kind.index()].bytes
    }

    pub fn total_resource_bytes(&self) -> usize {
        self.resources.iter().map(|r| r.bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_frame_closes_counts_into_history() {
        let t0 = Instant::now();
        let mut stats = Stats::starting_at(60, t0);
        stats.begin_frame_at(t0);

        for _ in 0..3 {
            stats.record_primitives(PrimitiveType::TriangleList, 300);
        }
        assert_eq!(stats.current_frame().triangle_count, 300);
        assert_eq!(stats.current_frame().operation_count, 3);

        stats.begin_frame_at(t0 + Duration::from_millis(16));
        let closed = stats.last_frame().unwrap();
        assert_eq!(closed.triangle_count, 300);
        assert_eq!(closed.vertex_count, 900);
        assert_eq!(closed.duration, Duration::from_millis(16));
        assert_eq!(*stats.current_frame(), Frame::default());
    }

    #[test]
    fn history_is_bounded_and_most_recent_first() {
        let t0 = Instant::now();
        let mut stats = Stats::starting_at(3, t0);
        for i in 1..=5u32 {
            for _ in 0..i {
                stats.record_state_change();
            }
            stats.begin_frame_at(t0 + Duration::from_millis(10 * i as u64));
        }

        let counts: Vec<u32> = stats.frames().map(|f| f.state_change_count).collect();
        assert_eq!(counts, vec![5, 4, 3]);
        assert_eq!(stats.frame_count(), 3);
    }

    #[test]
    fn frame_rate_averages_the_window() {
        let t0 = Instant::now();
        let mut stats = Stats::starting_at(60, t0);
        assert_eq!(stats.frame_rate(), 0.0);

        // 10 ms then 30 ms: 2 frames in 40 ms.
        stats.begin_frame_at(t0 + Duration::from_millis(10));
        stats.begin_frame_at(t0 + Duration::from_millis(40));
        assert!((stats.frame_rate() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn resource_footprint_tracks_per_kind() {
        let mut stats = Stats::default();
        stats.record_resource_created(ResourceKind::Texture, 1024);
        stats.record_resource_created(ResourceKind::Texture, 256);
        stats.record_resource_created(ResourceKind::VertexBuffer, 64);
        stats.record_resource_destroyed(ResourceKind::Texture, 1024);

        assert_eq!(stats.resource_count(ResourceKind::Texture), 1);
        assert_eq!(stats.resource_bytes(ResourceKind::Texture), 256);
        assert_eq!(stats.total_resource_bytes(), 320);
        assert_eq!(stats.resource_count(ResourceKind::Program), 0);
    }

    #[test]
    fn zero_history_keeps_one_frame() {
        let mut stats = Stats::new(0);
        stats.begin_frame();
        stats.begin_frame();
        assert_eq!(stats.frame_count(), 1);
    }
}
