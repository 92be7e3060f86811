use core::fmt;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::coords::Recti;
use crate::error::{DeviceError, DeviceResult};
use crate::resource::{ProgramDesc, ResourceKind, TextureDesc};
use crate::shared::UniformValue;
use crate::state::{BlendFactor, CompareFunction, CullMode, StencilOp};

use super::{
    BufferDesc, Capability, ClearRequest, DeviceBackend, DeviceLimits, DrawCall, FramebufferDesc, RawHandle,
    TextureBinding,
};

/// One call received by a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetCapability(Capability, bool),
    SetDepthWrite(bool),
    SetColorWrite(bool),
    SetPolygonMode { wireframe: bool },
    SetLineWidth(f32),
    SetCullMode(CullMode),
    SetBlendFactors(BlendFactor, BlendFactor),
    SetDepthFunction(CompareFunction),
    SetStencilFunction(CompareFunction, u32, u32),
    SetStencilOperations(StencilOp, StencilOp, StencilOp),
    SetViewport(Recti),
    SetScissor(Recti),
    BindProgram(Option<RawHandle>),
    BindVertexBuffer(Option<RawHandle>),
    BindIndexBuffer(Option<RawHandle>),
    BindFramebuffer(Option<RawHandle>),
    SetActiveTextureUnit(u32),
    BindTexture(Option<TextureBinding>),
    SetUniform { program: RawHandle, location: u32, value: UniformValue },
    SetSampler { program: RawHandle, location: u32, unit: u32 },
    CreateProgram(String),
    CreateBuffer(BufferDesc),
    WriteBuffer { buffer: RawHandle, offset: u64, len: usize },
    CreateTexture(TextureDesc),
    CreateFramebuffer(FramebufferDesc),
    Delete(ResourceKind, RawHandle),
    Clear(ClearRequest),
    Draw(DrawCall),
}

impl DeviceCall {
    /// Name of the trait method that produced this call.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceCall::SetCapability(..) => "set_capability",
            DeviceCall::SetDepthWrite(_) => "set_depth_write",
            DeviceCall::SetColorWrite(_) => "set_color_write",
            DeviceCall::SetPolygonMode { .. } => "set_polygon_mode",
            DeviceCall::SetLineWidth(_) => "set_line_width",
            DeviceCall::SetCullMode(_) => "set_cull_mode",
            DeviceCall::SetBlendFactors(..) => "set_blend_factors",
            DeviceCall::SetDepthFunction(_) => "set_depth_function",
            DeviceCall::SetStencilFunction(..) => "set_stencil_function",
            DeviceCall::SetStencilOperations(..) => "set_stencil_operations",
            DeviceCall::SetViewport(_) => "set_viewport",
            DeviceCall::SetScissor(_) => "set_scissor",
            DeviceCall::BindProgram(_) => "bind_program",
            DeviceCall::BindVertexBuffer(_) => "bind_vertex_buffer",
            DeviceCall::BindIndexBuffer(_) => "bind_index_buffer",
            DeviceCall::BindFramebuffer(_) => "bind_framebuffer",
            DeviceCall::SetActiveTextureUnit(_) => "set_active_texture_unit",
            DeviceCall::BindTexture(_) => "bind_texture",
            DeviceCall::SetUniform { .. } => "set_uniform",
            DeviceCall::SetSampler { .. } => "set_sampler",
            DeviceCall::CreateProgram(_) => "create_program",
            DeviceCall::CreateBuffer(_) => "create_buffer",
            DeviceCall::WriteBuffer { .. } => "write_buffer",
            DeviceCall::CreateTexture(_) => "create_texture",
            DeviceCall::CreateFramebuffer(_) => "create_framebuffer",
            DeviceCall::Delete(..) => "delete",
            DeviceCall::Clear(_) => "clear",
            DeviceCall::Draw(_) => "draw",
        }
    }

    /// `true` for the calls that set a [`RenderState`](crate::state::RenderState) field.
    pub fn is_render_state(&self) -> bool {
        match self {
            DeviceCall::SetCapability(capability, _) => *capability != Capability::ScissorTest,
            DeviceCall::SetDepthWrite(_)
            | DeviceCall::SetColorWrite(_)
            | DeviceCall::SetPolygonMode { .. }
            | DeviceCall::SetLineWidth(_)
            | DeviceCall::SetCullMode(_)
            | DeviceCall::SetBlendFactors(..)
            | DeviceCall::SetDepthFunction(_)
            | DeviceCall::SetStencilFunction(..)
            | DeviceCall::SetStencilOperations(..) => true,
            _ => false,
        }
    }

    pub fn is_bind(&self) -> bool {
        matches!(
            self,
            DeviceCall::BindProgram(_)
                | DeviceCall::BindVertexBuffer(_)
                | DeviceCall::BindIndexBuffer(_)
                | DeviceCall::BindFramebuffer(_)
                | DeviceCall::BindTexture(_)
        )
    }
}

/// Shared view of the calls a [`RecordingDevice`] received.
///
/// Cloning shares the underlying log, so a test can keep one while the
/// device is owned by a context.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<DeviceCall>>>);

impl CallLog {
    fn push(&self, call: DeviceCall) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.0.borrow().clone()
    }

    /// Returns and forgets every call recorded so far.
    pub fn take(&self) -> Vec<DeviceCall> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.0.borrow().iter().filter(|c| predicate(c)).count()
    }

    pub fn last(&self) -> Option<DeviceCall> {
        self.0.borrow().last().cloned()
    }
}

type RejectFn = Box<dyn Fn(&DeviceCall) -> bool>;

/// Backend that performs nothing and records every call.
///
/// Handles are allocated sequentially from 1 and tracked, so binding or
/// deleting an unknown handle fails like a real driver would. Individual
/// calls can be rejected with [`reject_if`](Self::reject_if).
pub struct RecordingDevice {
    limits: DeviceLimits,
    log: CallLog,
    next_handle: u32,
    live: HashSet<RawHandle>,
    reject: Option<RejectFn>,
}

impl fmt::Debug for RecordingDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingDevice")
            .field("calls", &self.log.len())
            .field("live", &self.live.len())
            .field("rejecting", &self.reject.is_some())
            .finish()
    }
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::with_limits(DeviceLimits::default())
    }

    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            log: CallLog::default(),
            next_handle: 1,
            live: HashSet::new(),
            reject: None,
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Rejects every subsequent call matching `predicate` with [`DeviceError::Rejected`].
    ///
    /// Rejected calls are still recorded.
    pub fn reject_if(&mut self, predicate: impl Fn(&DeviceCall) -> bool + 'static) {
        self.reject = Some(Box::new(predicate));
    }

    pub fn accept_all(&mut self) {
        self.reject = None;
    }

    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    fn record(&mut self, call: DeviceCall) -> DeviceResult {
        let rejected = self.reject.as_ref().is_some_and(|reject| reject(&call));
        let name = call.name();
        let detail = if rejected { format!("{call:?}") } else { String::new() };
        self.log.push(call);

        if rejected {
            return Err(DeviceError::Rejected { call: name, detail });
        }
        Ok(())
    }

    fn check_live(&self, handle: Option<RawHandle>) -> DeviceResult {
        match handle {
            Some(h) if !self.live.contains(&h) => Err(DeviceError::InvalidHandle(h)),
            _ => Ok(()),
        }
    }

    fn allocate(&mut self, call: DeviceCall) -> DeviceResult<RawHandle> {
        self.record(call)?;
        let handle = RawHandle::new(self.next_handle);
        self.next_handle = self.next_handle.checked_add(1).ok_or(DeviceError::OutOfResources)?;
        self.live.insert(handle);
        Ok(handle)
    }
}

impl DeviceBackend for RecordingDevice {
    fn query_limits(&self) -> DeviceLimits {
        self.limits
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) -> DeviceResult {
        self.record(DeviceCall::SetCapability(capability, enabled))
    }

    fn set_depth_write(&mut self, enabled: bool) -> DeviceResult {
        self.record(DeviceCall::SetDepthWrite(enabled))
    }

    fn set_color_write(&mut self, enabled: bool) -> DeviceResult {
        self.record(DeviceCall::SetColorWrite(enabled))
    }

    fn set_polygon_mode(&mut self, wireframe: bool) -> DeviceResult {
        self.record(DeviceCall::SetPolygonMode { wireframe })
    }

    fn set_line_width(&mut self, width: f32) -> DeviceResult {
        self.record(DeviceCall::SetLineWidth(width))
    }

    fn set_cull_mode(&mut self, mode: CullMode) -> DeviceResult {
        self.record(DeviceCall::SetCullMode(mode))
    }

    fn set_blend_factors(&mut self, src: BlendFactor, dst: BlendFactor) -> DeviceResult {
        self.record(DeviceCall::SetBlendFactors(src, dst))
    }

    fn set_depth_function(&mut self, function: CompareFunction) -> DeviceResult {
        self.record(DeviceCall::SetDepthFunction(function))
    }

    fn set_stencil_function(&mut self, function: CompareFunction, reference: u32, mask: u32) -> DeviceResult {
        self.record(DeviceCall::SetStencilFunction(function, reference, mask))
    }

    fn set_stencil_operations(&mut self, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) -> DeviceResult {
        self.record(DeviceCall::SetStencilOperations(fail, depth_fail, depth_pass))
    }

    fn set_viewport(&mut self, rect: Recti) -> DeviceResult {
        self.record(DeviceCall::SetViewport(rect))
    }

    fn set_scissor(&mut self, rect: Recti) -> DeviceResult {
        self.record(DeviceCall::SetScissor(rect))
    }

    fn bind_program(&mut self, program: Option<RawHandle>) -> DeviceResult {
        self.record(DeviceCall::BindProgram(program))?;
        self.check_live(program)
    }

    fn bind_vertex_buffer(&mut self, buffer: Option<RawHandle>) -> DeviceResult {
        self.record(DeviceCall::BindVertexBuffer(buffer))?;
        self.check_live(buffer)
    }

    fn bind_index_buffer(&mut self, buffer: Option<RawHandle>) -> DeviceResult {
        self.record(DeviceCall::BindIndexBuffer(buffer))?;
        self.check_live(buffer)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<RawHandle>) -> DeviceResult {
        self.record(DeviceCall::BindFramebuffer(framebuffer))?;
        self.check_live(framebuffer)
    }

    fn set_active_texture_unit(&mut self, unit: u32) -> DeviceResult {
        self.record(DeviceCall::SetActiveTextureUnit(unit))
    }

    fn bind_texture(&mut self, texture: Option<TextureBinding>) -> DeviceResult {
        self.record(DeviceCall::BindTexture(texture))?;
        self.check_live(texture.map(|t| t.handle))
    }

    fn set_uniform(&mut self, program: RawHandle, location: u32, value: &UniformValue) -> DeviceResult {
        self.record(DeviceCall::SetUniform { program, location, value: *value })?;
        self.check_live(Some(program))
    }

    fn set_sampler(&mut self, program: RawHandle, location: u32, unit: u32) -> DeviceResult {
        self.record(DeviceCall::SetSampler { program, location, unit })?;
        self.check_live(Some(program))
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> DeviceResult<RawHandle> {
        self.allocate(DeviceCall::CreateProgram(desc.label.clone()))
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> DeviceResult<RawHandle> {
        self.allocate(DeviceCall::CreateBuffer(*desc))
    }

    fn write_buffer(&mut self, buffer: RawHandle, offset: u64, data: &[u8]) -> DeviceResult {
        self.record(DeviceCall::WriteBuffer { buffer, offset, len: data.len() })?;
        self.check_live(Some(buffer))
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> DeviceResult<RawHandle> {
        self.allocate(DeviceCall::CreateTexture(*desc))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> DeviceResult<RawHandle> {
        self.check_live(desc.color)?;
        self.allocate(DeviceCall::CreateFramebuffer(*desc))
    }

    fn delete(&mut self, kind: ResourceKind, handle: RawHandle) -> DeviceResult {
        self.record(DeviceCall::Delete(kind, handle))?;
        if !self.live.remove(&handle) {
            return Err(DeviceError::InvalidHandle(handle));
        }
        Ok(())
    }

    fn clear(&mut self, request: &ClearRequest) -> DeviceResult {
        self.record(DeviceCall::Clear(*request))
    }

    fn draw(&mut self, call: &DrawCall) -> DeviceResult {
        self.record(DeviceCall::Draw(*call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::BufferKind;

    #[test]
    fn log_is_shared_with_clones() {
        let mut device = RecordingDevice::new();
        let log = device.log();

        device.set_depth_write(false).unwrap();
        device.set_cull_mode(CullMode::Front).unwrap();

        assert_eq!(
            log.calls(),
            vec![DeviceCall::SetDepthWrite(false), DeviceCall::SetCullMode(CullMode::Front)]
        );
        assert_eq!(log.count(DeviceCall::is_render_state), 2);
    }

    #[test]
    fn rejected_calls_are_recorded_and_fail() {
        let mut device = RecordingDevice::new();
        device.reject_if(|call| matches!(call, DeviceCall::SetLineWidth(w) if *w > 1.0));

        assert!(device.set_line_width(1.0).is_ok());
        let err = device.set_line_width(4.0).unwrap_err();
        assert!(matches!(err, DeviceError::Rejected { call: "set_line_width", .. }));
        assert_eq!(device.log().len(), 2);
    }

    #[test]
    fn unknown_handles_are_invalid() {
        let mut device = RecordingDevice::new();
        let bogus = RawHandle::new(99);
        assert_eq!(device.bind_program(Some(bogus)), Err(DeviceError::InvalidHandle(bogus)));
        assert!(device.bind_program(None).is_ok());
    }

    #[test]
    fn handles_are_sequential_and_deletable_once() {
        let mut device = RecordingDevice::new();
        let desc = BufferDesc { kind: BufferKind::Vertex, size: 64 };
        let a = device.create_buffer(&desc).unwrap();
        let b = device.create_buffer(&desc).unwrap();
        assert_eq!((a.get(), b.get()), (1, 2));

        assert!(device.delete(ResourceKind::VertexBuffer, a).is_ok());
        assert_eq!(
            device.delete(ResourceKind::VertexBuffer, a),
            Err(DeviceError::InvalidHandle(a))
        );
        assert_eq!(device.live_handles(), 1);
    }

    #[test]
    fn scissor_capability_is_not_render_state() {
        assert!(!DeviceCall::SetCapability(Capability::ScissorTest, true).is_render_state());
        assert!(DeviceCall::SetCapability(Capability::DepthTest, true).is_render_state());
    }
}
