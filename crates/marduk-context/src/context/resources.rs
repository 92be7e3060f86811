use std::rc::Rc;

use bytemuck::Pod;

use crate::device::{BufferDesc, BufferKind, DeviceBackend, FramebufferDesc, RawHandle};
use crate::error::{BindingError, ConfigError, Result};
use crate::resource::{
    Framebuffer, GpuResource, IndexBuffer, Program, ProgramDesc, ResourceHeader, ResourceKind, Texture, TextureDesc,
    VertexBuffer, check_bounds,
};
use crate::state::IndexType;

use super::Context;

impl<D: DeviceBackend> Context<D> {
    fn header(&mut self, kind: ResourceKind, handle: RawHandle, bytes: usize) -> ResourceHeader {
        self.stats.record_resource_created(kind, bytes);
        log::trace!("created {kind} {handle} ({bytes} bytes)");
        ResourceHeader::new(kind, handle, bytes, &self.releases)
    }

    /// Creates a program. Its samplers are wired to the units matching their
    /// declaration index.
    pub fn create_program(&mut self, desc: ProgramDesc) -> Result<Rc<Program>> {
        let result = self.device.create_program(&desc);
        let handle = self.escalate(result, || format!("create program `{}`", desc.label))?;

        for unit in 0..desc.samplers.len() as u32 {
            let result = self.device.set_sampler(handle, unit, unit);
            self.note(result, || format!("sampler {unit} of `{}`", desc.label));
        }

        let header = self.header(ResourceKind::Program, handle, 0);
        Ok(Rc::new(Program::new(header, desc)))
    }

    pub fn create_vertex_buffer(&mut self, count: u32, stride: u32) -> Result<Rc<VertexBuffer>> {
        let size = count as u64 * stride as u64;
        if size == 0 {
            return Err(ConfigError::EmptyResource(ResourceKind::VertexBuffer).into());
        }

        let result = self.device.create_buffer(&BufferDesc { kind: BufferKind::Vertex, size });
        let handle = self.escalate(result, || format!("create vertex buffer of {size} bytes"))?;

        let header = self.header(ResourceKind::VertexBuffer, handle, size as usize);
        Ok(Rc::new(VertexBuffer::new(header, count, stride)))
    }

    pub fn create_index_buffer(&mut self, count: u32, index_type: IndexType) -> Result<Rc<IndexBuffer>> {
        let size = count as u64 * index_type.size() as u64;
        if size == 0 {
            return Err(ConfigError::EmptyResource(ResourceKind::IndexBuffer).into());
        }

        let result = self.device.create_buffer(&BufferDesc { kind: BufferKind::Index, size });
        let handle = self.escalate(result, || format!("create index buffer of {size} bytes"))?;

        let header = self.header(ResourceKind::IndexBuffer, handle, size as usize);
        Ok(Rc::new(IndexBuffer::new(header, count, index_type)))
    }

    /// Allocates texture storage, checked against the device limit for its kind.
    pub fn create_texture(&mut self, desc: TextureDesc) -> Result<Rc<Texture>> {
        if desc.is_empty() {
            return Err(ConfigError::EmptyResource(ResourceKind::Texture).into());
        }
        let max = self.limits.max_size_for(desc.kind);
        if desc.max_extent() > max {
            return Err(ConfigError::TextureTooLarge {
                kind: desc.kind.as_str(),
                size: desc.max_extent(),
                max,
            }
            .into());
        }

        let result = self.device.create_texture(&desc);
        let handle = self.escalate(result, || format!("create {} texture", desc.kind))?;

        let header = self.header(ResourceKind::Texture, handle, desc.byte_size());
        Ok(Rc::new(Texture::new(header, desc)))
    }

    /// Creates an offscreen canvas, optionally rendering into `color`.
    pub fn create_texture_framebuffer(
        &mut self,
        width: u32,
        height: u32,
        color: Option<Rc<Texture>>,
    ) -> Result<Rc<Framebuffer>> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyResource(ResourceKind::Framebuffer).into());
        }
        let max = self.limits.max_texture_size;
        if width.max(height) > max {
            return Err(ConfigError::TextureTooLarge {
                kind: "framebuffer",
                size: width.max(height),
                max,
            }
            .into());
        }
        if color.as_ref().is_some_and(|t| t.is_destroyed()) {
            return Err(BindingError::Destroyed(ResourceKind::Texture).into());
        }

        let desc = FramebufferDesc {
            width,
            height,
            color: color.as_ref().map(|t| t.handle()),
        };
        let result = self.device.create_framebuffer(&desc);
        let handle = self.escalate(result, || format!("create {width}x{height} framebuffer"))?;

        let header = self.header(ResourceKind::Framebuffer, handle, 0);
        Ok(Rc::new(Framebuffer::offscreen(header, width, height, color)))
    }

    // ── uploads ───────────────────────────────────────────────────────────

    /// Uploads `vertices` starting at vertex `first`.
    pub fn write_vertices<T: Pod>(&mut self, buffer: &VertexBuffer, first: u32, vertices: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        self.write_elements(buffer.header(), buffer.stride(), buffer.count(), first, bytes)
    }

    /// Uploads raw indices starting at index `first`. `T` must match the
    /// buffer's index size.
    pub fn write_indices<T: Pod>(&mut self, buffer: &IndexBuffer, first: u32, indices: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let size = buffer.index_type().size() as u32;
        self.write_elements(buffer.header(), size, buffer.count(), first, bytes)
    }

    fn write_elements(
        &mut self,
        header: &ResourceHeader,
        element_size: u32,
        available: u32,
        first: u32,
        bytes: &[u8],
    ) -> Result<()> {
        if header.is_destroyed() {
            return Err(BindingError::Destroyed(header.kind()).into());
        }

        let elements = bytes.len().div_ceil(element_size as usize);
        let elements = u32::try_from(elements).unwrap_or(u32::MAX);
        check_bounds(first, elements, available)?;

        let offset = first as u64 * element_size as u64;
        let result = self.device.write_buffer(header.handle(), offset, bytes);
        self.escalate(result, || format!("write {} bytes to {}", bytes.len(), header.kind()))?;
        Ok(())
    }

    // ── destruction ───────────────────────────────────────────────────────

    /// Destroys `resource` now.
    ///
    /// Any slot bound to it is cleared first; the owner's `Rc` stays valid but
    /// the resource can no longer be bound. Destroying twice is a no-op.
    pub fn destroy<R: GpuResource>(&mut self, resource: &Rc<R>) {
        let header = resource.header();
        if !header.mark_destroyed() {
            return;
        }

        let addr = Rc::as_ptr(resource).cast::<()>();
        self.unbind_address(header.kind(), addr);
        self.delete_on_device(header.kind(), header.handle(), header.bytes());
    }

    /// Destroys an offscreen framebuffer. If it is current, the screen becomes current.
    ///
    /// The screen itself cannot be destroyed.
    pub fn destroy_framebuffer(&mut self, framebuffer: &Rc<Framebuffer>) {
        let Some(header) = framebuffer.header() else {
            log::warn!("ignoring request to destroy the screen framebuffer");
            return;
        };
        if !header.mark_destroyed() {
            return;
        }

        let addr = Rc::as_ptr(framebuffer).cast::<()>();
        self.unbind_address(ResourceKind::Framebuffer, addr);
        self.delete_on_device(ResourceKind::Framebuffer, header.handle(), header.bytes());
    }

    fn unbind_address(&mut self, kind: ResourceKind, addr: *const ()) {
        match kind {
            ResourceKind::Program if self.slots.program.refers_to(addr) => {
                let result = self.device.bind_program(None);
                self.slots.program.clear();
                self.note(result, || "unbind destroyed program".to_owned());
            }
            ResourceKind::VertexBuffer if self.slots.vertex_buffer.refers_to(addr) => {
                let result = self.device.bind_vertex_buffer(None);
                self.slots.vertex_buffer.clear();
                self.note(result, || "unbind destroyed vertex buffer".to_owned());
            }
            ResourceKind::IndexBuffer if self.slots.index_buffer.refers_to(addr) => {
                let result = self.device.bind_index_buffer(None);
                self.slots.index_buffer.clear();
                self.note(result, || "unbind destroyed index buffer".to_owned());
            }
            ResourceKind::Texture => {
                let units: Vec<usize> = (0..self.slots.textures.len())
                    .filter(|&unit| self.slots.textures[unit].refers_to(addr))
                    .collect();
                for unit in units {
                    if self.set_active_texture_unit(unit).is_ok() {
                        let result = self.device.bind_texture(None);
                        self.note(result, || format!("unbind destroyed texture from unit {unit}"));
                    }
                    self.slots.textures[unit].clear();
                }
            }
            ResourceKind::Framebuffer if self.slots.framebuffer.refers_to(addr) => {
                self.set_default_framebuffer_current();
            }
            _ => {}
        }
    }

    fn delete_on_device(&mut self, kind: ResourceKind, handle: RawHandle, bytes: usize) {
        let result = self.device.delete(kind, handle);
        self.note(result, || format!("delete {kind} {handle}"));
        self.stats.record_resource_destroyed(kind, bytes);
        log::trace!("deleted {kind} {handle}");
    }

    /// Unbinds every slot whose object was dropped by its owner.
    ///
    /// The device still has those objects bound; each gets the matching
    /// unbind call before its slot is cleared. A dropped current framebuffer
    /// is replaced by the screen.
    pub(super) fn unbind_dangling(&mut self) {
        self.ensure_framebuffer();

        if self.slots.program.is_dangling() {
            let result = self.device.bind_program(None);
            self.stats.record_state_change();
            self.slots.program.clear();
            self.note(result, || "unbind dropped program".to_owned());
        }
        if self.slots.vertex_buffer.is_dangling() {
            let result = self.device.bind_vertex_buffer(None);
            self.stats.record_state_change();
            self.slots.vertex_buffer.clear();
            self.note(result, || "unbind dropped vertex buffer".to_owned());
        }
        if self.slots.index_buffer.is_dangling() {
            let result = self.device.bind_index_buffer(None);
            self.stats.record_state_change();
            self.slots.index_buffer.clear();
            self.note(result, || "unbind dropped index buffer".to_owned());
        }

        for unit in 0..self.slots.textures.len() {
            if !self.slots.textures[unit].is_dangling() {
                continue;
            }
            if self.set_active_texture_unit(unit).is_ok() {
                let result = self.device.bind_texture(None);
                self.stats.record_state_change();
                self.note(result, || format!("unbind dropped texture from unit {unit}"));
            }
            self.slots.textures[unit].clear();
        }
    }

    /// Deletes device objects whose owners dropped them without destroying them.
    ///
    /// Called by [`begin_frame`](Self::begin_frame). Bindings of dropped
    /// objects are released on the device before anything is deleted.
    pub fn maintain(&mut self) {
        self.unbind_dangling();

        if self.releases.is_empty() {
            return;
        }
        let released = self.releases.drain();
        log::debug!("releasing {} dropped resources", released.len());

        for pending in released {
            self.delete_on_device(pending.kind, pending.handle, pending.bytes);
        }
    }
}
