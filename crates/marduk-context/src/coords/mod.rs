//! Pixel-space geometry used by the binding slots.
//!
//! Device space:
//! - Physical pixels of the current framebuffer
//! - Origin at the framebuffer origin
//! - Integer coordinates, matching what viewport and scissor calls accept

mod color;
mod rect;

pub use color::ColorRgba;
pub use rect::Recti;
