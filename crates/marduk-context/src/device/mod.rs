//! Driver boundary.
//!
//! This module is responsible for:
//! - the [`DeviceBackend`] trait every context call goes through
//! - the device limits probed once at context creation
//! - the logical-enum to wgpu translation table
//! - two backends: a call recorder and a wgpu pipeline lowering

mod backend;
pub mod convert;
mod limits;
mod recording;
mod wgpu_backend;

pub use backend::{
    BufferDesc, BufferKind, Capability, ClearRequest, DeviceBackend, DrawCall, FramebufferDesc, RawHandle,
    TextureBinding,
};
pub use limits::DeviceLimits;
pub use recording::{CallLog, DeviceCall, RecordingDevice};
pub use wgpu_backend::{CommandQueue, PipelineKey, RecordedDraw, RenderCommand, WgpuBackend};
