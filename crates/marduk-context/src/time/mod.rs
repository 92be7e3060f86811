//! Frame timing.
//!
//! One `FrameClock` per statistics collector; `tick` once per frame boundary.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
