use std::rc::{Rc, Weak};

use crate::coords::Recti;
use crate::resource::{Framebuffer, IndexBuffer, Program, Texture, VertexBuffer};

/// Non-owning record of the object bound in one role.
///
/// A slot whose target was dropped reads as unbound.
#[derive(Debug)]
pub(crate) struct Slot<T>(Option<Weak<T>>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Slot<T> {
    pub(crate) fn get(&self) -> Option<Rc<T>> {
        self.0.as_ref().and_then(Weak::upgrade)
    }

    /// Returns `true` if the slot currently refers to exactly `target`.
    ///
    /// `None` matches only an empty slot: a dangling one still has its old
    /// object bound on the device.
    pub(crate) fn holds(&self, target: Option<&Rc<T>>) -> bool {
        match target {
            Some(target) => self.get().is_some_and(|bound| Rc::ptr_eq(&bound, target)),
            None => self.0.is_none(),
        }
    }

    /// Returns `true` if the slot was set to an object that has since been dropped.
    pub(crate) fn is_dangling(&self) -> bool {
        self.0.as_ref().is_some_and(|weak| weak.strong_count() == 0)
    }

    pub(crate) fn set(&mut self, target: Option<&Rc<T>>) {
        self.0 = target.map(Rc::downgrade);
    }

    pub(crate) fn clear(&mut self) {
        self.0 = None;
    }

    /// Returns `true` if the slot refers to the object at `addr`, live or not.
    pub(crate) fn refers_to(&self, addr: *const ()) -> bool {
        self.0.as_ref().is_some_and(|weak| std::ptr::eq(weak.as_ptr().cast::<()>(), addr))
    }
}

/// What the device has bound, as last set through the context.
#[derive(Debug)]
pub(crate) struct BindingSlots {
    pub program: Slot<Program>,
    pub vertex_buffer: Slot<VertexBuffer>,
    pub index_buffer: Slot<IndexBuffer>,
    pub framebuffer: Slot<Framebuffer>,
    pub textures: Vec<Slot<Texture>>,
    pub active_unit: usize,
    pub culling_inverted: bool,
    pub viewport: Recti,
    pub scissor: Recti,
    /// Derived: the scissor rectangle does not cover the current framebuffer.
    pub scissor_enabled: bool,
}

impl BindingSlots {
    pub(crate) fn new(texture_units: usize, bounds: Recti) -> Self {
        Self {
            program: Slot::default(),
            vertex_buffer: Slot::default(),
            index_buffer: Slot::default(),
            framebuffer: Slot::default(),
            textures: (0..texture_units).map(|_| Slot::default()).collect(),
            active_unit: 0,
            culling_inverted: false,
            viewport: bounds,
            scissor: bounds,
            scissor_enabled: false,
        }
    }
}
