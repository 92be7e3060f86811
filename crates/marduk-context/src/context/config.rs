use winit::dpi::PhysicalSize;

use crate::state::RenderState;
use crate::stats::DEFAULT_HISTORY;

/// Construction parameters for a [`Context`](super::Context).
///
/// Keep this structure small. Everything here is read once at creation.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Pipeline state force-applied when the context is created.
    pub initial_state: RenderState,

    /// Size of the screen framebuffer in physical pixels.
    ///
    /// Follow window resizes with [`Context::resize_screen`](super::Context::resize_screen).
    pub screen_size: PhysicalSize<u32>,

    /// Upper bound on tracked texture units.
    ///
    /// The slot table is sized from the device's combined unit count; a cap
    /// trims it for backends that report very large counts.
    pub max_texture_units: Option<usize>,

    /// Closed frames kept for rate computation.
    pub stats_history: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            initial_state: RenderState::default(),
            screen_size: PhysicalSize::new(800, 600),
            max_texture_units: None,
            stats_history: DEFAULT_HISTORY,
        }
    }
}

impl ContextConfig {
    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.screen_size = PhysicalSize::new(width, height);
        self
    }

    pub fn with_initial_state(mut self, state: RenderState) -> Self {
        self.initial_state = state;
        self
    }
}
