//! The render context: sole writer of device state.
//!
//! A [`Context`] owns a [`DeviceBackend`] and mirrors what it has bound. Every
//! pipeline-state and binding request is diffed against that mirror so only
//! real changes reach the device. Shared uniforms and samplers are pushed
//! into a program right before it draws.
//!
//! Device errors never abort a call. They are logged, counted and kept as
//! [`last_device_error`](Context::last_device_error); the cached record is
//! updated as if the call had succeeded.

mod bindings;
mod cache;
mod config;
mod draw;
mod resources;

use core::fmt;
use std::rc::Rc;
use std::time::Instant;

use crate::device::{DeviceBackend, DeviceLimits};
use crate::error::{ConfigError, DeviceError, DeviceResult, Result};
use crate::resource::{Framebuffer, ReleaseQueue};
use crate::shared::{SamplerType, SharedId, SharedProgramState, SharedRegistry, UniformType};
use crate::state::RenderState;
use crate::stats::Stats;

use bindings::BindingSlots;

pub use config::ContextConfig;

pub struct Context<D: DeviceBackend> {
    device: D,
    limits: DeviceLimits,
    state: RenderState,
    slots: BindingSlots,
    screen: Rc<Framebuffer>,
    shared: SharedRegistry,
    shared_state: Option<Rc<dyn SharedProgramState>>,
    stats: Stats,
    releases: ReleaseQueue,
    device_errors: u64,
    last_device_error: Option<DeviceError>,
}

impl<D: DeviceBackend> fmt::Debug for Context<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.state)
            .field("slots", &self.slots)
            .field("shared", &self.shared.len())
            .field("device_errors", &self.device_errors)
            .finish_non_exhaustive()
    }
}

impl<D: DeviceBackend> Context<D> {
    /// Probes the device limits and brings the device to `config.initial_state`.
    ///
    /// Every pipeline-state call is issued once, whatever the device had set.
    pub fn new(device: D, config: ContextConfig) -> Result<Self, ConfigError> {
        config.initial_state.validate()?;

        let limits = device.query_limits();
        log::debug!("device limits: {limits:?}");

        let units = limits.max_combined_texture_units as usize;
        let units = config.max_texture_units.map_or(units, |cap| units.min(cap));

        let size = config.screen_size;
        let screen = Rc::new(Framebuffer::screen(size.width, size.height));

        let mut ctx = Self {
            device,
            limits,
            state: config.initial_state,
            slots: BindingSlots::new(units, screen.bounds()),
            screen,
            shared: SharedRegistry::new(),
            shared_state: None,
            stats: Stats::new(config.stats_history),
            releases: ReleaseQueue::default(),
            device_errors: 0,
            last_device_error: None,
        };
        ctx.slots.framebuffer.set(Some(&ctx.screen));
        ctx.restore();

        log::debug!(
            "render context ready: {}x{} screen, {units} texture units",
            size.width,
            size.height
        );
        Ok(ctx)
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// The last applied pipeline state.
    #[inline]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    #[inline]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Device errors reported since creation.
    #[inline]
    pub fn device_error_count(&self) -> u64 {
        self.device_errors
    }

    #[inline]
    pub fn last_device_error(&self) -> Option<&DeviceError> {
        self.last_device_error.as_ref()
    }

    /// Closes the statistics frame and releases resources dropped since the last frame.
    pub fn begin_frame(&mut self) {
        self.begin_frame_at(Instant::now());
    }

    pub fn begin_frame_at(&mut self, now: Instant) {
        self.maintain();
        self.stats.begin_frame_at(now);
    }

    // ── shared registry ───────────────────────────────────────────────────

    #[inline]
    pub fn shared_registry(&self) -> &SharedRegistry {
        &self.shared
    }

    pub fn reserve_uniform(&mut self, name: &str, ty: UniformType) -> Result<SharedId, ConfigError> {
        self.shared.reserve_uniform(name, ty)
    }

    pub fn reserve_sampler(&mut self, name: &str, ty: SamplerType) -> Result<SharedId, ConfigError> {
        self.shared.reserve_sampler(name, ty)
    }

    pub fn lookup_uniform_id(&self, name: &str, ty: UniformType) -> SharedId {
        self.shared.lookup_uniform_id(name, ty)
    }

    pub fn lookup_sampler_id(&self, name: &str, ty: SamplerType) -> SharedId {
        self.shared.lookup_sampler_id(name, ty)
    }

    /// Shader declarations for every shared signature, in registration order.
    pub fn shared_declaration(&self) -> &str {
        self.shared.declaration()
    }

    /// Installs the provider asked for shared values on every draw.
    ///
    /// With `None`, programs keep whatever shared values they last received.
    pub fn set_shared_program_state(&mut self, provider: Option<Rc<dyn SharedProgramState>>) {
        self.shared_state = provider;
    }

    pub fn shared_program_state(&self) -> Option<&Rc<dyn SharedProgramState>> {
        self.shared_state.as_ref()
    }

    // ── device error channel ──────────────────────────────────────────────

    /// Logs and counts a failed device call. `what` names the slot or field and
    /// the requested value; it is only built on failure.
    fn note<T>(&mut self, result: DeviceResult<T>, what: impl FnOnce() -> String) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                log::error!("{}: {err}", what());
                self.device_errors += 1;
                self.last_device_error = Some(err);
                None
            }
        }
    }

    /// Like [`note`](Self::note), but hands the error back to the caller.
    fn escalate<T>(&mut self, result: DeviceResult<T>, what: impl FnOnce() -> String) -> Result<T, DeviceError> {
        result.map_err(|err| {
            log::error!("{}: {err}", what());
            self.device_errors += 1;
            self.last_device_error = Some(err.clone());
            err
        })
    }
}
