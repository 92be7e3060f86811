use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::rc::Rc;

use crate::coords::Recti;
use crate::error::{DeviceError, DeviceResult};
use crate::resource::{ProgramDesc, ResourceKind, TextureDesc};
use crate::shared::UniformValue;
use crate::state::{BlendFactor, CompareFunction, CullMode, PrimitiveType, StencilOp};

use super::{
    BufferDesc, Capability, ClearRequest, DeviceBackend, DeviceLimits, DrawCall, FramebufferDesc, RawHandle,
    TextureBinding, convert,
};

/// Everything that selects a wgpu render pipeline for a draw.
///
/// Equal keys can share one `wgpu::RenderPipeline`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub primitive: wgpu::PrimitiveState,
    pub blend: Option<wgpu::BlendState>,
    pub color_writes: wgpu::ColorWrites,
    /// `Always` when depth testing is off.
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write_enabled: bool,
    /// `None` when stencil testing is off.
    pub stencil: Option<wgpu::StencilFaceState>,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
    pub multisample: bool,
}

/// A draw with the pipeline and bindings that were current when it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub pipeline: PipelineKey,
    /// `None` is the screen.
    pub target: Option<RawHandle>,
    pub program: RawHandle,
    pub vertex_buffer: RawHandle,
    pub index_buffer: Option<(RawHandle, wgpu::IndexFormat)>,
    /// `(sampler location, texture)` for every sampler with a texture on its unit.
    pub textures: Vec<(u32, RawHandle)>,
    /// Staged uniform bytes by location.
    pub uniforms: Vec<(u32, Vec<u8>)>,
    pub viewport: Recti,
    pub scissor: Option<Recti>,
    pub stencil_reference: u32,
    pub elements: Range<u32>,
    pub base_vertex: i32,
}

/// Work queued for a wgpu renderer, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Clear { target: Option<RawHandle>, request: ClearRequest },
    Draw(RecordedDraw),
}

/// Shared handle to the commands a [`WgpuBackend`] recorded.
///
/// Obtain it before handing the backend to a context; the renderer drains
/// it once per frame.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue(Rc<RefCell<Vec<RenderCommand>>>);

impl CommandQueue {
    fn push(&self, command: RenderCommand) {
        self.0.borrow_mut().push(command);
    }

    /// Drains the commands recorded since the last call.
    pub fn take(&self) -> Vec<RenderCommand> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Fixed-function settings as the caller last set them.
#[derive(Debug, Copy, Clone)]
struct FixedFunction {
    depth_test: bool,
    depth_write: bool,
    color_write: bool,
    stencil_test: bool,
    scissor_test: bool,
    multisample: bool,
    wireframe: bool,
    cull_mode: CullMode,
    src: BlendFactor,
    dst: BlendFactor,
    depth_function: CompareFunction,
    stencil_function: CompareFunction,
    stencil_reference: u32,
    stencil_mask: u32,
    stencil_ops: [StencilOp; 3],
}

impl Default for FixedFunction {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_write: true,
            color_write: true,
            stencil_test: false,
            scissor_test: false,
            multisample: false,
            wireframe: false,
            cull_mode: CullMode::None,
            src: BlendFactor::One,
            dst: BlendFactor::Zero,
            depth_function: CompareFunction::Less,
            stencil_function: CompareFunction::Always,
            stencil_reference: 0,
            stencil_mask: !0,
            stencil_ops: [StencilOp::Keep; 3],
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct LiveObject {
    kind: ResourceKind,
    /// Byte size for buffers, zero otherwise.
    size: u64,
}

/// Lowers the immediate-mode call stream into wgpu pipeline vocabulary.
///
/// Nothing is submitted here. Each draw snapshots the current [`PipelineKey`]
/// and bindings into a [`CommandQueue`] that a wgpu renderer drains,
/// creating or reusing one pipeline per distinct key.
#[derive(Debug)]
pub struct WgpuBackend {
    limits: DeviceLimits,
    features: wgpu::Features,
    fixed: FixedFunction,
    viewport: Recti,
    scissor: Recti,
    program: Option<RawHandle>,
    vertex_buffer: Option<RawHandle>,
    index_buffer: Option<RawHandle>,
    framebuffer: Option<RawHandle>,
    active_unit: u32,
    units: Vec<Option<TextureBinding>>,
    uniforms: BTreeMap<(RawHandle, u32), Vec<u8>>,
    samplers: BTreeMap<(RawHandle, u32), u32>,
    live: HashMap<RawHandle, LiveObject>,
    next_handle: u32,
    commands: CommandQueue,
}

impl WgpuBackend {
    /// `limits` and `features` are the ones the wgpu device was created with.
    pub fn new(limits: &wgpu::Limits, features: wgpu::Features) -> Self {
        let limits = DeviceLimits::from_wgpu(limits);
        Self {
            units: vec![None; limits.max_combined_texture_units as usize],
            limits,
            features,
            fixed: FixedFunction::default(),
            viewport: Recti::default(),
            scissor: Recti::default(),
            program: None,
            vertex_buffer: None,
            index_buffer: None,
            framebuffer: None,
            active_unit: 0,
            uniforms: BTreeMap::new(),
            samplers: BTreeMap::new(),
            live: HashMap::new(),
            next_handle: 1,
            commands: CommandQueue::default(),
        }
    }

    pub fn queue(&self) -> CommandQueue {
        self.commands.clone()
    }

    /// Pipeline key for `primitive` under the current fixed-function state.
    pub fn pipeline_key(&self, primitive: PrimitiveType, indexed: Option<wgpu::IndexFormat>) -> DeviceResult<PipelineKey> {
        let f = &self.fixed;
        let topology = convert::topology(primitive).ok_or_else(|| DeviceError::Unsupported {
            call: "draw",
            detail: format!("{primitive} topology"),
        })?;

        let strip_index_format = match topology {
            wgpu::PrimitiveTopology::LineStrip | wgpu::PrimitiveTopology::TriangleStrip => indexed,
            _ => None,
        };

        let primitive = wgpu::PrimitiveState {
            topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: convert::cull_face(f.cull_mode),
            polygon_mode: convert::polygon_mode(f.wireframe),
            ..Default::default()
        };

        let (depth_compare, depth_write_enabled) = if f.depth_test {
            (convert::compare_function(f.depth_function), f.depth_write)
        } else {
            (wgpu::CompareFunction::Always, false)
        };

        let stencil = f.stencil_test.then(|| {
            let [fail, depth_fail, pass] = f.stencil_ops;
            convert::stencil_face(f.stencil_function, fail, depth_fail, pass)
        });

        Ok(PipelineKey {
            primitive,
            blend: convert::blend_state(f.src, f.dst),
            color_writes: convert::color_writes(f.color_write),
            depth_compare,
            depth_write_enabled,
            stencil,
            stencil_read_mask: f.stencil_mask,
            stencil_write_mask: !0,
            multisample: f.multisample,
        })
    }

    fn check_kind(&self, handle: Option<RawHandle>, kind: ResourceKind) -> DeviceResult {
        match handle {
            Some(h) => match self.live.get(&h) {
                Some(object) if object.kind == kind => Ok(()),
                _ => Err(DeviceError::InvalidHandle(h)),
            },
            None => Ok(()),
        }
    }

    fn allocate(&mut self, kind: ResourceKind, size: u64) -> DeviceResult<RawHandle> {
        let handle = RawHandle::new(self.next_handle);
        self.next_handle = self.next_handle.checked_add(1).ok_or(DeviceError::OutOfResources)?;
        self.live.insert(handle, LiveObject { kind, size });
        Ok(handle)
    }

    fn program_textures(&self, program: RawHandle) -> Vec<(u32, RawHandle)> {
        self.samplers
            .range((program, 0)..=(program, u32::MAX))
            .filter_map(|(&(_, location), &unit)| {
                let binding = self.units.get(unit as usize).copied().flatten()?;
                Some((location, binding.handle))
            })
            .collect()
    }

    fn program_uniforms(&self, program: RawHandle) -> Vec<(u32, Vec<u8>)> {
        self.uniforms
            .range((program, 0)..=(program, u32::MAX))
            .map(|(&(_, location), bytes)| (location, bytes.clone()))
            .collect()
    }

    fn unsupported(call: &'static str, detail: impl Into<String>) -> DeviceError {
        DeviceError::Unsupported { call, detail: detail.into() }
    }
}

impl DeviceBackend for WgpuBackend {
    fn query_limits(&self) -> DeviceLimits {
        self.limits
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) -> DeviceResult {
        match capability {
            Capability::DepthTest => self.fixed.depth_test = enabled,
            Capability::StencilTest => self.fixed.stencil_test = enabled,
            Capability::ScissorTest => self.fixed.scissor_test = enabled,
            Capability::Multisample => self.fixed.multisample = enabled,
            Capability::LineSmooth if enabled => {
                return Err(Self::unsupported("set_capability", "line smoothing"));
            }
            Capability::LineSmooth => {}
        }
        Ok(())
    }

    fn set_depth_write(&mut self, enabled: bool) -> DeviceResult {
        self.fixed.depth_write = enabled;
        Ok(())
    }

    fn set_color_write(&mut self, enabled: bool) -> DeviceResult {
        self.fixed.color_write = enabled;
        Ok(())
    }

    fn set_polygon_mode(&mut self, wireframe: bool) -> DeviceResult {
        if wireframe && !self.features.contains(wgpu::Features::POLYGON_MODE_LINE) {
            return Err(Self::unsupported("set_polygon_mode", "device lacks POLYGON_MODE_LINE"));
        }
        self.fixed.wireframe = wireframe;
        Ok(())
    }

    fn set_line_width(&mut self, width: f32) -> DeviceResult {
        if width != 1.0 {
            return Err(Self::unsupported("set_line_width", format!("width {width}")));
        }
        Ok(())
    }

    fn set_cull_mode(&mut self, mode: CullMode) -> DeviceResult {
        self.fixed.cull_mode = mode;
        Ok(())
    }

    fn set_blend_factors(&mut self, src: BlendFactor, dst: BlendFactor) -> DeviceResult {
        self.fixed.src = src;
        self.fixed.dst = dst;
        Ok(())
    }

    fn set_depth_function(&mut self, function: CompareFunction) -> DeviceResult {
        self.fixed.depth_function = function;
        Ok(())
    }

    fn set_stencil_function(&mut self, function: CompareFunction, reference: u32, mask: u32) -> DeviceResult {
        self.fixed.stencil_function = function;
        self.fixed.stencil_reference = reference;
        self.fixed.stencil_mask = mask;
        Ok(())
    }

    fn set_stencil_operations(&mut self, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) -> DeviceResult {
        self.fixed.stencil_ops = [fail, depth_fail, depth_pass];
        Ok(())
    }

    fn set_viewport(&mut self, rect: Recti) -> DeviceResult {
        self.viewport = rect;
        Ok(())
    }

    fn set_scissor(&mut self, rect: Recti) -> DeviceResult {
        self.scissor = rect;
        Ok(())
    }

    fn bind_program(&mut self, program: Option<RawHandle>) -> DeviceResult {
        self.check_kind(program, ResourceKind::Program)?;
        self.program = program;
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: Option<RawHandle>) -> DeviceResult {
        self.check_kind(buffer, ResourceKind::VertexBuffer)?;
        self.vertex_buffer = buffer;
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: Option<RawHandle>) -> DeviceResult {
        self.check_kind(buffer, ResourceKind::IndexBuffer)?;
        self.index_buffer = buffer;
        Ok(())
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<RawHandle>) -> DeviceResult {
        self.check_kind(framebuffer, ResourceKind::Framebuffer)?;
        self.framebuffer = framebuffer;
        Ok(())
    }

    fn set_active_texture_unit(&mut self, unit: u32) -> DeviceResult {
        if unit as usize >= self.units.len() {
            return Err(DeviceError::Rejected {
                call: "set_active_texture_unit",
                detail: format!("unit {unit} of {}", self.units.len()),
            });
        }
        self.active_unit = unit;
        Ok(())
    }

    fn bind_texture(&mut self, texture: Option<TextureBinding>) -> DeviceResult {
        self.check_kind(texture.map(|t| t.handle), ResourceKind::Texture)?;
        if let Some(slot) = self.units.get_mut(self.active_unit as usize) {
            *slot = texture;
        }
        Ok(())
    }

    fn set_uniform(&mut self, program: RawHandle, location: u32, value: &UniformValue) -> DeviceResult {
        self.check_kind(Some(program), ResourceKind::Program)?;
        self.uniforms.insert((program, location), value.as_bytes().to_vec());
        Ok(())
    }

    fn set_sampler(&mut self, program: RawHandle, location: u32, unit: u32) -> DeviceResult {
        self.check_kind(Some(program), ResourceKind::Program)?;
        self.samplers.insert((program, location), unit);
        Ok(())
    }

    fn create_program(&mut self, _desc: &ProgramDesc) -> DeviceResult<RawHandle> {
        self.allocate(ResourceKind::Program, 0)
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> DeviceResult<RawHandle> {
        let kind = match desc.kind {
            super::BufferKind::Vertex => ResourceKind::VertexBuffer,
            super::BufferKind::Index => ResourceKind::IndexBuffer,
        };
        self.allocate(kind, desc.size)
    }

    fn write_buffer(&mut self, buffer: RawHandle, offset: u64, data: &[u8]) -> DeviceResult {
        let object = self.live.get(&buffer).ok_or(DeviceError::InvalidHandle(buffer))?;
        let end = offset.saturating_add(data.len() as u64);
        if end > object.size {
            return Err(DeviceError::Rejected {
                call: "write_buffer",
                detail: format!("write ends at {end}, buffer holds {}", object.size),
            });
        }
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> DeviceResult<RawHandle> {
        let max = self.limits.max_size_for(desc.kind);
        if desc.max_extent() > max {
            return Err(DeviceError::Rejected {
                call: "create_texture",
                detail: format!("extent {} exceeds {max}", desc.max_extent()),
            });
        }
        self.allocate(ResourceKind::Texture, 0)
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> DeviceResult<RawHandle> {
        self.check_kind(desc.color, ResourceKind::Texture)?;
        self.allocate(ResourceKind::Framebuffer, 0)
    }

    fn delete(&mut self, kind: ResourceKind, handle: RawHandle) -> DeviceResult {
        self.check_kind(Some(handle), kind)?;
        self.live.remove(&handle);
        if kind == ResourceKind::Program {
            self.uniforms.retain(|&(program, _), _| program != handle);
            self.samplers.retain(|&(program, _), _| program != handle);
        }
        Ok(())
    }

    fn clear(&mut self, request: &ClearRequest) -> DeviceResult {
        self.commands.push(RenderCommand::Clear {
            target: self.framebuffer,
            request: *request,
        });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> DeviceResult {
        let program = self.program.ok_or_else(|| DeviceError::Rejected {
            call: "draw",
            detail: "no program bound".into(),
        })?;
        let vertex_buffer = self.vertex_buffer.ok_or_else(|| DeviceError::Rejected {
            call: "draw",
            detail: "no vertex buffer bound".into(),
        })?;

        let index_buffer = match call.index_type {
            Some(index_type) => {
                let format = convert::index_format(index_type)
                    .ok_or_else(|| Self::unsupported("draw", format!("{index_type} indices")))?;
                let buffer = self.index_buffer.ok_or_else(|| DeviceError::Rejected {
                    call: "draw",
                    detail: "indexed draw without an index buffer".into(),
                })?;
                Some((buffer, format))
            }
            None => None,
        };

        let pipeline = self.pipeline_key(call.primitive, index_buffer.map(|(_, f)| f))?;

        // Both faces culled: triangles produce nothing.
        let triangles = matches!(
            pipeline.primitive.topology,
            wgpu::PrimitiveTopology::TriangleList | wgpu::PrimitiveTopology::TriangleStrip
        );
        if self.fixed.cull_mode == CullMode::Both && triangles {
            return Ok(());
        }

        let end = call.start.checked_add(call.count).ok_or_else(|| DeviceError::Rejected {
            call: "draw",
            detail: format!("range {}+{} overflows", call.start, call.count),
        })?;

        self.commands.push(RenderCommand::Draw(RecordedDraw {
            pipeline,
            target: self.framebuffer,
            program,
            vertex_buffer,
            index_buffer,
            textures: self.program_textures(program),
            uniforms: self.program_uniforms(program),
            viewport: self.viewport,
            scissor: self.fixed.scissor_test.then_some(self.scissor),
            stencil_reference: self.fixed.stencil_reference,
            elements: call.start..end,
            base_vertex: call.base_vertex,
        }));
        Ok(())
    }
}
