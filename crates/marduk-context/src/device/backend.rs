use core::fmt;

use crate::coords::{ColorRgba, Recti};
use crate::error::DeviceResult;
use crate::resource::{ProgramDesc, ResourceKind, TextureDesc, TextureKind};
use crate::shared::UniformValue;
use crate::state::{BlendFactor, CompareFunction, CullMode, IndexType, PrimitiveType, StencilOp};

use super::DeviceLimits;

/// Opaque device object name handed out by a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(u32);

impl RawHandle {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

text_enum! {
    /// Fixed-function switches toggled with [`DeviceBackend::set_capability`].
    pub enum Capability : "capability" {
        DepthTest => "depth-test",
        StencilTest => "stencil-test",
        ScissorTest => "scissor-test",
        LineSmooth => "line-smooth",
        Multisample => "multisample",
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub kind: BufferKind,
    pub size: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FramebufferDesc {
    pub width: u32,
    pub height: u32,
    pub color: Option<RawHandle>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub kind: TextureKind,
    pub handle: RawHandle,
}

/// Buffers to clear on the current framebuffer; `None` leaves a buffer untouched.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ClearRequest {
    pub color: Option<ColorRgba>,
    pub depth: Option<f32>,
    pub stencil: Option<u32>,
}

/// One draw using the bound program and buffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub primitive: PrimitiveType,
    pub start: u32,
    pub count: u32,
    pub base_vertex: i32,
    /// Set for indexed draws; `start`/`count` then address indices.
    pub index_type: Option<IndexType>,
}

/// Immediate-mode graphics device.
///
/// Calls take effect in order. Backends may reject a call with a
/// [`DeviceError`](crate::error::DeviceError); the caller decides what to do
/// about it, backends never retry.
pub trait DeviceBackend {
    fn query_limits(&self) -> DeviceLimits;

    // ── pipeline state ────────────────────────────────────────────────────
    fn set_capability(&mut self, capability: Capability, enabled: bool) -> DeviceResult;
    fn set_depth_write(&mut self, enabled: bool) -> DeviceResult;
    fn set_color_write(&mut self, enabled: bool) -> DeviceResult;
    fn set_polygon_mode(&mut self, wireframe: bool) -> DeviceResult;
    fn set_line_width(&mut self, width: f32) -> DeviceResult;
    fn set_cull_mode(&mut self, mode: CullMode) -> DeviceResult;
    fn set_blend_factors(&mut self, src: BlendFactor, dst: BlendFactor) -> DeviceResult;
    fn set_depth_function(&mut self, function: CompareFunction) -> DeviceResult;
    fn set_stencil_function(&mut self, function: CompareFunction, reference: u32, mask: u32) -> DeviceResult;
    fn set_stencil_operations(&mut self, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) -> DeviceResult;
    fn set_viewport(&mut self, rect: Recti) -> DeviceResult;
    fn set_scissor(&mut self, rect: Recti) -> DeviceResult;

    // ── bindings ──────────────────────────────────────────────────────────
    fn bind_program(&mut self, program: Option<RawHandle>) -> DeviceResult;
    fn bind_vertex_buffer(&mut self, buffer: Option<RawHandle>) -> DeviceResult;
    fn bind_index_buffer(&mut self, buffer: Option<RawHandle>) -> DeviceResult;
    /// `None` binds the screen.
    fn bind_framebuffer(&mut self, framebuffer: Option<RawHandle>) -> DeviceResult;
    fn set_active_texture_unit(&mut self, unit: u32) -> DeviceResult;
    /// Binds to the active unit.
    fn bind_texture(&mut self, texture: Option<TextureBinding>) -> DeviceResult;

    // ── program inputs ────────────────────────────────────────────────────
    fn set_uniform(&mut self, program: RawHandle, location: u32, value: &UniformValue) -> DeviceResult;
    fn set_sampler(&mut self, program: RawHandle, location: u32, unit: u32) -> DeviceResult;

    // ── resources ─────────────────────────────────────────────────────────
    fn create_program(&mut self, desc: &ProgramDesc) -> DeviceResult<RawHandle>;
    fn create_buffer(&mut self, desc: &BufferDesc) -> DeviceResult<RawHandle>;
    fn write_buffer(&mut self, buffer: RawHandle, offset: u64, data: &[u8]) -> DeviceResult;
    fn create_texture(&mut self, desc: &TextureDesc) -> DeviceResult<RawHandle>;
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> DeviceResult<RawHandle>;
    fn delete(&mut self, kind: ResourceKind, handle: RawHandle) -> DeviceResult;

    // ── drawing ───────────────────────────────────────────────────────────
    fn clear(&mut self, request: &ClearRequest) -> DeviceResult;
    fn draw(&mut self, call: &DrawCall) -> DeviceResult;
}
