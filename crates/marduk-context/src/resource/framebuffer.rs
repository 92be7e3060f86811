use std::cell::Cell;
use std::rc::Rc;

use crate::coords::Recti;
use crate::device::RawHandle;

use super::{ResourceHeader, Texture};

#[derive(Debug)]
enum Target {
    Screen,
    Offscreen {
        header: ResourceHeader,
        color: Option<Rc<Texture>>,
    },
}

/// A render target: the window surface or an offscreen, texture-backed canvas.
///
/// The screen framebuffer is owned by the context and never destroyed; its
/// size follows the window.
#[derive(Debug)]
pub struct Framebuffer {
    target: Target,
    size: Cell<(u32, u32)>,
}

impl Framebuffer {
    pub(crate) fn screen(width: u32, height: u32) -> Self {
        Self {
            target: Target::Screen,
            size: Cell::new((width, height)),
        }
    }

    pub(crate) fn offscreen(header: ResourceHeader, width: u32, height: u32, color: Option<Rc<Texture>>) -> Self {
        Self {
            target: Target::Offscreen { header, color },
            size: Cell::new((width, height)),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.get().0
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.get().1
    }

    /// Width over height; 1.0 for a degenerate (zero-height) target.
    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = self.size.get();
        if h == 0 { 1.0 } else { w as f32 / h as f32 }
    }

    /// Full-target rectangle at the origin.
    #[inline]
    pub fn bounds(&self) -> Recti {
        let (w, h) = self.size.get();
        Recti::from_size(w, h)
    }

    #[inline]
    pub fn is_screen(&self) -> bool {
        matches!(self.target, Target::Screen)
    }

    /// Device handle to bind; `None` is the screen.
    #[inline]
    pub fn handle(&self) -> Option<RawHandle> {
        self.header().map(ResourceHeader::handle)
    }

    pub fn color_texture(&self) -> Option<&Rc<Texture>> {
        match &self.target {
            Target::Offscreen { color, .. } => color.as_ref(),
            Target::Screen => None,
        }
    }

    /// `false` for the screen, which cannot be destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.header().is_some_and(ResourceHeader::is_destroyed)
    }

    pub(crate) fn header(&self) -> Option<&ResourceHeader> {
        match &self.target {
            Target::Offscreen { header, .. } => Some(header),
            Target::Screen => None,
        }
    }

    pub(crate) fn set_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }
}
