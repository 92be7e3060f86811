use std::rc::Rc;

use crate::error::BindingError;
use crate::state::PrimitiveType;

use super::{IndexBuffer, VertexBuffer};

/// A drawable slice of geometry: buffers plus the element range to draw.
///
/// With an index buffer, `start` and `count` address indices and `base` is
/// added to every index; otherwise they address vertices.
#[derive(Debug, Clone)]
pub struct PrimitiveRange {
    pub primitive: PrimitiveType,
    pub vertex_buffer: Rc<VertexBuffer>,
    pub index_buffer: Option<Rc<IndexBuffer>>,
    pub start: u32,
    pub count: u32,
    pub base: i32,
}

impl PrimitiveRange {
    /// Every vertex of `vertex_buffer`.
    pub fn vertices(primitive: PrimitiveType, vertex_buffer: &Rc<VertexBuffer>) -> Self {
        Self {
            primitive,
            vertex_buffer: Rc::clone(vertex_buffer),
            index_buffer: None,
            start: 0,
            count: vertex_buffer.count(),
            base: 0,
        }
    }

    /// Every index of `index_buffer`, into `vertex_buffer`.
    pub fn indexed(primitive: PrimitiveType, vertex_buffer: &Rc<VertexBuffer>, index_buffer: &Rc<IndexBuffer>) -> Self {
        Self {
            primitive,
            vertex_buffer: Rc::clone(vertex_buffer),
            index_buffer: Some(Rc::clone(index_buffer)),
            start: 0,
            count: index_buffer.count(),
            base: 0,
        }
    }

    pub fn slice(mut self, start: u32, count: u32) -> Self {
        self.start = start;
        self.count = count;
        self
    }

    pub fn with_base(mut self, base: i32) -> Self {
        self.base = base;
        self
    }

    /// Elements the range may address.
    pub fn available(&self) -> u32 {
        match &self.index_buffer {
            Some(indices) => indices.count(),
            None => self.vertex_buffer.count(),
        }
    }

    pub(crate) fn check_bounds(&self) -> Result<(), BindingError> {
        check_bounds(self.start, self.count, self.available())
    }
}

pub(crate) fn check_bounds(start: u32, count: u32, available: u32) -> Result<(), BindingError> {
    let end = start as u64 + count as u64;
    if end > available as u64 {
        return Err(BindingError::RangeOutOfBounds { start, end, available });
    }
    Ok(())
}
