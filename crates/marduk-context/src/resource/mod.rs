//! GPU objects owned by the caller.
//!
//! Resources are created through the context and handed out as `Rc`. Binding
//! slots only hold `Weak` references, so a resource dropped by its owner is
//! simply "no longer bound". Dropped resources queue their device handle on a
//! [`ReleaseQueue`]; the context deletes them on the device at the next
//! maintenance point.

mod buffer;
mod framebuffer;
mod program;
mod range;
mod texture;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::device::RawHandle;

pub use buffer::{IndexBuffer, VertexBuffer};
pub use framebuffer::Framebuffer;
pub use program::{Program, ProgramDesc, SamplerDecl, UniformDecl};
pub use range::PrimitiveRange;
pub(crate) use range::check_bounds;
pub use texture::{Texture, TextureDesc, TextureKind};

text_enum! {
    pub enum ResourceKind : "resource kind" {
        Program => "program",
        VertexBuffer => "vertex buffer",
        IndexBuffer => "index buffer",
        Texture => "texture",
        Framebuffer => "framebuffer",
    }
}

impl ResourceKind {
    pub const COUNT: usize = ResourceKind::ALL.len();

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A device object whose owner let go of it without destroying it explicitly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct PendingRelease {
    pub kind: ResourceKind,
    pub handle: RawHandle,
    pub bytes: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ReleaseQueue(Rc<RefCell<Vec<PendingRelease>>>);

impl ReleaseQueue {
    fn push(&self, release: PendingRelease) {
        self.0.borrow_mut().push(release);
    }

    pub(crate) fn drain(&self) -> Vec<PendingRelease> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Identity and lifetime bookkeeping shared by every device object.
#[derive(Debug)]
pub struct ResourceHeader {
    kind: ResourceKind,
    handle: RawHandle,
    bytes: usize,
    destroyed: Cell<bool>,
    releases: ReleaseQueue,
}

impl ResourceHeader {
    pub(crate) fn new(kind: ResourceKind, handle: RawHandle, bytes: usize, releases: &ReleaseQueue) -> Self {
        Self {
            kind,
            handle,
            bytes,
            destroyed: Cell::new(false),
            releases: releases.clone(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[inline]
    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    /// Device memory footprint in bytes, as accounted by the statistics.
    #[inline]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Marks the resource destroyed. Returns `false` if it already was.
    pub(crate) fn mark_destroyed(&self) -> bool {
        !self.destroyed.replace(true)
    }
}

impl Drop for ResourceHeader {
    fn drop(&mut self) {
        if !self.destroyed.get() {
            self.releases.push(PendingRelease {
                kind: self.kind,
                handle: self.handle,
                bytes: self.bytes,
            });
        }
    }
}

/// Implemented by every resource type that owns a device object.
pub trait GpuResource {
    fn header(&self) -> &ResourceHeader;

    #[inline]
    fn handle(&self) -> RawHandle {
        self.header().handle()
    }

    #[inline]
    fn is_destroyed(&self) -> bool {
        self.header().is_destroyed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_live_header_queues_its_release() {
        let queue = ReleaseQueue::default();
        drop(ResourceHeader::new(ResourceKind::Texture, RawHandle::new(7), 64, &queue));

        assert_eq!(
            queue.drain(),
            vec![PendingRelease { kind: ResourceKind::Texture, handle: RawHandle::new(7), bytes: 64 }]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn destroyed_headers_are_not_released_twice() {
        let queue = ReleaseQueue::default();
        let header = ResourceHeader::new(ResourceKind::Program, RawHandle::new(1), 0, &queue);
        assert!(header.mark_destroyed());
        assert!(!header.mark_destroyed());
        drop(header);
        assert!(queue.is_empty());
    }
}
