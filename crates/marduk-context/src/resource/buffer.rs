use crate::state::IndexType;

use super::{GpuResource, ResourceHeader};

/// Vertex storage. `count` vertices of `stride` bytes each.
#[derive(Debug)]
pub struct VertexBuffer {
    header: ResourceHeader,
    count: u32,
    stride: u32,
}

impl VertexBuffer {
    pub(crate) fn new(header: ResourceHeader, count: u32, stride: u32) -> Self {
        Self { header, count, stride }
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }
}

impl GpuResource for VertexBuffer {
    fn header(&self) -> &ResourceHeader {
        &self.header
    }
}

#[derive(Debug)]
pub struct IndexBuffer {
    header: ResourceHeader,
    count: u32,
    index_type: IndexType,
}

impl IndexBuffer {
    pub(crate) fn new(header: ResourceHeader, count: u32, index_type: IndexType) -> Self {
        Self { header, count, index_type }
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }
}

impl GpuResource for IndexBuffer {
    fn header(&self) -> &ResourceHeader {
        &self.header
    }
}
