use std::rc::Rc;

use winit::dpi::PhysicalSize;

use crate::coords::Recti;
use crate::device::{Capability, DeviceBackend, TextureBinding};
use crate::error::{BindingError, ConfigError};
use crate::resource::{Framebuffer, GpuResource, IndexBuffer, Program, ResourceKind, Texture, VertexBuffer};
use crate::state::{CullMode, RenderState, StateField};

use super::Context;

fn effective_cull(mode: CullMode, inverted: bool) -> CullMode {
    if inverted { mode.inverted() } else { mode }
}

fn ensure_live<T: GpuResource>(target: Option<&Rc<T>>) -> Result<(), BindingError> {
    match target {
        Some(t) if t.is_destroyed() => Err(BindingError::Destroyed(t.header().kind())),
        _ => Ok(()),
    }
}

impl<D: DeviceBackend> Context<D> {
    /// Issues a device call for every field of `desired` that differs from the
    /// last applied state.
    ///
    /// An invalid state is rejected before anything is issued.
    pub fn apply(&mut self, desired: &RenderState) -> Result<(), ConfigError> {
        desired.validate()?;

        let current = self.state;
        for field in current.changed_fields(desired) {
            self.issue(field, desired);
        }
        self.state = *desired;
        Ok(())
    }

    /// Issues every pipeline-state call regardless of the cached record.
    pub fn force_apply(&mut self, desired: &RenderState) -> Result<(), ConfigError> {
        desired.validate()?;

        for field in StateField::ALL {
            self.issue(field, desired);
        }
        self.state = *desired;
        Ok(())
    }

    fn issue(&mut self, field: StateField, state: &RenderState) {
        let cull = effective_cull(state.cull_mode, self.slots.culling_inverted);
        let device = &mut self.device;

        let result = match field {
            StateField::DepthTest => device.set_capability(Capability::DepthTest, state.depth_testing),
            StateField::DepthWrite => device.set_depth_write(state.depth_writing),
            StateField::ColorWrite => device.set_color_write(state.color_writing),
            StateField::StencilTest => device.set_capability(Capability::StencilTest, state.stencil_testing),
            StateField::Wireframe => device.set_polygon_mode(state.wireframe),
            StateField::LineSmooth => device.set_capability(Capability::LineSmooth, state.line_smoothing),
            StateField::Multisample => device.set_capability(Capability::Multisample, state.multisampling),
            StateField::LineWidth => device.set_line_width(state.line_width),
            StateField::Cull => device.set_cull_mode(cull),
            StateField::Blend => device.set_blend_factors(state.src_factor, state.dst_factor),
            StateField::DepthFunction => device.set_depth_function(state.depth_function),
            StateField::StencilFunction => {
                device.set_stencil_function(state.stencil_function, state.stencil_ref, state.stencil_mask)
            }
            StateField::StencilOperations => {
                device.set_stencil_operations(state.stencil_fail_op, state.depth_fail_op, state.depth_pass_op)
            }
        };

        self.stats.record_state_change();
        log::trace!("{}", field.describe(state));
        self.note(result, || field.describe(state));
    }

    /// Re-issues every pipeline-state call and every live binding.
    ///
    /// Use after something outside the context may have changed device state,
    /// e.g. surface recreation. Slots whose objects were dropped are cleared.
    pub fn restore(&mut self) {
        self.unbind_dangling();

        let state = self.state;
        for field in StateField::ALL {
            self.issue(field, &state);
        }

        let target = self.current_framebuffer();
        self.slots.framebuffer.set(Some(&target));
        let result = self.device.bind_framebuffer(target.handle());
        self.note(result, || "restore framebuffer".to_owned());

        let viewport = self.slots.viewport;
        let result = self.device.set_viewport(viewport);
        self.note(result, || format!("restore viewport {viewport:?}"));

        let scissor = self.slots.scissor;
        let result = self.device.set_scissor(scissor);
        self.note(result, || format!("restore scissor {scissor:?}"));
        self.derive_scissor_enable(true);

        let program = self.slots.program.get();
        self.slots.program.set(program.as_ref());
        let result = self.device.bind_program(program.map(|p| p.handle()));
        self.note(result, || "restore program".to_owned());

        let buffer = self.slots.vertex_buffer.get();
        self.slots.vertex_buffer.set(buffer.as_ref());
        let result = self.device.bind_vertex_buffer(buffer.map(|b| b.handle()));
        self.note(result, || "restore vertex buffer".to_owned());

        let buffer = self.slots.index_buffer.get();
        self.slots.index_buffer.set(buffer.as_ref());
        let result = self.device.bind_index_buffer(buffer.map(|b| b.handle()));
        self.note(result, || "restore index buffer".to_owned());

        for unit in 0..self.slots.textures.len() {
            let Some(texture) = self.slots.textures[unit].get() else {
                self.slots.textures[unit].clear();
                continue;
            };
            let result = self.device.set_active_texture_unit(unit as u32);
            self.note(result, || format!("restore texture unit {unit}"));
            let result = self.device.bind_texture(Some(texture_binding(&texture)));
            self.note(result, || format!("restore texture on unit {unit}"));
        }

        let active = self.slots.active_unit;
        let result = self.device.set_active_texture_unit(active as u32);
        self.note(result, || format!("restore active texture unit {active}"));

        log::debug!("device state restored");
    }

    // ── framebuffer ───────────────────────────────────────────────────────

    /// The framebuffer draws go to. Falls back to the screen if the bound
    /// target was dropped.
    pub fn current_framebuffer(&self) -> Rc<Framebuffer> {
        self.slots.framebuffer.get().unwrap_or_else(|| Rc::clone(&self.screen))
    }

    pub fn screen(&self) -> &Rc<Framebuffer> {
        &self.screen
    }

    /// Binds `target` and resets the viewport to its full size.
    ///
    /// Fails without touching anything if `target` was destroyed. Rebinding
    /// the current target issues nothing.
    pub fn set_current_framebuffer(&mut self, target: &Rc<Framebuffer>) -> Result<(), BindingError> {
        if target.is_destroyed() {
            return Err(BindingError::Destroyed(ResourceKind::Framebuffer));
        }
        if self.slots.framebuffer.holds(Some(target)) {
            return Ok(());
        }

        self.bind_framebuffer(target);
        Ok(())
    }

    pub fn set_default_framebuffer_current(&mut self) {
        let screen = Rc::clone(&self.screen);
        self.bind_framebuffer(&screen);
    }

    /// Rebinds the screen if the current framebuffer was dropped by its owner,
    /// so the device never targets an object the cache no longer tracks.
    pub(super) fn ensure_framebuffer(&mut self) {
        if self.slots.framebuffer.is_dangling() {
            log::debug!("current framebuffer was dropped; falling back to the screen");
            self.set_default_framebuffer_current();
        }
    }

    pub(super) fn bind_framebuffer(&mut self, target: &Rc<Framebuffer>) {
        let result = self.device.bind_framebuffer(target.handle());
        self.stats.record_state_change();
        self.slots.framebuffer.set(Some(target));
        self.note(result, || match target.handle() {
            Some(handle) => format!("bind framebuffer {handle}"),
            None => "bind screen framebuffer".to_owned(),
        });

        self.set_viewport_area(target.bounds());
        self.derive_scissor_enable(false);
    }

    /// Follows a window resize.
    ///
    /// If the screen is the current target its viewport is reset to the new
    /// size and the scissor enable is re-derived.
    pub fn resize_screen(&mut self, size: PhysicalSize<u32>) {
        self.ensure_framebuffer();
        self.screen.set_size(size.width, size.height);
        log::debug!("screen resized to {}x{}", size.width, size.height);

        if self.slots.framebuffer.holds(Some(&self.screen)) {
            self.set_viewport_area(self.screen.bounds());
            self.derive_scissor_enable(false);
        }
    }

    // ── viewport & scissor ────────────────────────────────────────────────

    pub fn viewport_area(&self) -> Recti {
        self.slots.viewport
    }

    pub fn set_viewport_area(&mut self, rect: Recti) {
        self.ensure_framebuffer();
        if self.slots.viewport == rect {
            return;
        }
        let result = self.device.set_viewport(rect);
        self.stats.record_state_change();
        self.slots.viewport = rect;
        self.note(result, || format!("viewport {rect:?}"));
    }

    pub fn scissor_area(&self) -> Recti {
        self.slots.scissor
    }

    /// Sets the scissor rectangle.
    ///
    /// Scissor testing is on exactly when the rectangle does not cover the
    /// whole current framebuffer.
    pub fn set_scissor_area(&mut self, rect: Recti) {
        self.ensure_framebuffer();
        if self.slots.scissor != rect {
            let result = self.device.set_scissor(rect);
            self.stats.record_state_change();
            self.slots.scissor = rect;
            self.note(result, || format!("scissor {rect:?}"));
        }
        self.derive_scissor_enable(false);
    }

    #[inline]
    pub fn is_scissor_enabled(&self) -> bool {
        self.slots.scissor_enabled
    }

    fn derive_scissor_enable(&mut self, force: bool) {
        let bounds = self.current_framebuffer().bounds();
        let enabled = !self.slots.scissor.covers(bounds);
        if enabled == self.slots.scissor_enabled && !force {
            return;
        }

        let result = self.device.set_capability(Capability::ScissorTest, enabled);
        self.stats.record_state_change();
        self.slots.scissor_enabled = enabled;
        self.note(result, || format!("scissor test = {enabled}"));
    }

    // ── culling ───────────────────────────────────────────────────────────

    #[inline]
    pub fn culling_inverted(&self) -> bool {
        self.slots.culling_inverted
    }

    /// Swaps front and back culling, for mirrored views.
    pub fn set_culling_inversion(&mut self, inverted: bool) {
        if self.slots.culling_inverted == inverted {
            return;
        }

        let before = effective_cull(self.state.cull_mode, self.slots.culling_inverted);
        self.slots.culling_inverted = inverted;
        let after = effective_cull(self.state.cull_mode, inverted);

        if before != after {
            let result = self.device.set_cull_mode(after);
            self.stats.record_state_change();
            self.note(result, || format!("cull mode = {after} (inverted)"));
        }
    }

    // ── objects ───────────────────────────────────────────────────────────

    pub fn current_program(&self) -> Option<Rc<Program>> {
        self.slots.program.get()
    }

    pub fn current_vertex_buffer(&self) -> Option<Rc<VertexBuffer>> {
        self.slots.vertex_buffer.get()
    }

    pub fn current_index_buffer(&self) -> Option<Rc<IndexBuffer>> {
        self.slots.index_buffer.get()
    }

    /// Binds `program`, or unbinds with `None`. Same identity issues nothing.
    pub fn set_current_program(&mut self, program: Option<&Rc<Program>>) -> Result<(), BindingError> {
        ensure_live(program)?;
        if self.slots.program.holds(program) {
            return Ok(());
        }

        let handle = program.map(|p| p.handle());
        let result = self.device.bind_program(handle);
        self.stats.record_state_change();
        self.slots.program.set(program);
        self.note(result, || format!("bind program {handle:?}"));
        Ok(())
    }

    pub fn set_current_vertex_buffer(&mut self, buffer: Option<&Rc<VertexBuffer>>) -> Result<(), BindingError> {
        ensure_live(buffer)?;
        if self.slots.vertex_buffer.holds(buffer) {
            return Ok(());
        }

        let handle = buffer.map(|b| b.handle());
        let result = self.device.bind_vertex_buffer(handle);
        self.stats.record_state_change();
        self.slots.vertex_buffer.set(buffer);
        self.note(result, || format!("bind vertex buffer {handle:?}"));
        Ok(())
    }

    pub fn set_current_index_buffer(&mut self, buffer: Option<&Rc<IndexBuffer>>) -> Result<(), BindingError> {
        ensure_live(buffer)?;
        if self.slots.index_buffer.holds(buffer) {
            return Ok(());
        }

        let handle = buffer.map(|b| b.handle());
        let result = self.device.bind_index_buffer(handle);
        self.stats.record_state_change();
        self.slots.index_buffer.set(buffer);
        self.note(result, || format!("bind index buffer {handle:?}"));
        Ok(())
    }

    // ── texture units ─────────────────────────────────────────────────────

    #[inline]
    pub fn texture_unit_count(&self) -> usize {
        self.slots.textures.len()
    }

    #[inline]
    pub fn active_texture_unit(&self) -> usize {
        self.slots.active_unit
    }

    pub fn current_texture(&self, unit: usize) -> Option<Rc<Texture>> {
        self.slots.textures.get(unit).and_then(|slot| slot.get())
    }

    fn check_unit(&self, unit: usize) -> Result<(), BindingError> {
        let count = self.slots.textures.len();
        if unit >= count {
            return Err(BindingError::TextureUnitOutOfRange { unit, count });
        }
        Ok(())
    }

    /// Selects the unit later texture calls apply to.
    pub fn set_active_texture_unit(&mut self, unit: usize) -> Result<(), BindingError> {
        self.check_unit(unit)?;
        if self.slots.active_unit == unit {
            return Ok(());
        }

        let result = self.device.set_active_texture_unit(unit as u32);
        self.stats.record_state_change();
        self.slots.active_unit = unit;
        self.note(result, || format!("active texture unit {unit}"));
        Ok(())
    }

    /// Binds `texture` on `unit`, activating the unit first if needed.
    ///
    /// Binding what the unit already holds issues nothing, not even the
    /// unit switch.
    pub fn set_current_texture(&mut self, unit: usize, texture: Option<&Rc<Texture>>) -> Result<(), BindingError> {
        self.check_unit(unit)?;
        ensure_live(texture)?;
        if self.slots.textures[unit].holds(texture) {
            return Ok(());
        }

        self.set_active_texture_unit(unit)?;
        let result = self.device.bind_texture(texture.map(|t| texture_binding(t)));
        self.stats.record_state_change();
        self.slots.textures[unit].set(texture);
        self.note(result, || format!("bind texture on unit {unit}"));
        Ok(())
    }
}

fn texture_binding(texture: &Texture) -> TextureBinding {
    TextureBinding {
        kind: texture.kind(),
        handle: texture.handle(),
    }
}

#[cfg(test)]
mod tests {
    use crate::context::{Context, ContextConfig};
    use crate::coords::Recti;
    use crate::device::{Capability, CallLog, DeviceCall, DeviceLimits, RecordingDevice};
    use crate::error::{BindingError, ConfigError};
    use crate::resource::{GpuResource, ProgramDesc, ResourceKind, TextureDesc};
    use crate::state::{BlendFactor, CullMode, RenderState};

    fn context() -> (Context<RecordingDevice>, CallLog) {
        let device = RecordingDevice::new();
        let log = device.log();
        let ctx = Context::new(device, ContextConfig::default().with_screen_size(800, 600)).unwrap();
        log.clear();
        (ctx, log)
    }

    #[test]
    fn creation_force_applies_every_field() {
        let device = RecordingDevice::new();
        let log = device.log();
        let _ctx = Context::new(device, ContextConfig::default()).unwrap();
        assert_eq!(log.count(DeviceCall::is_render_state), 13);
    }

    #[test]
    fn apply_issues_only_changed_fields() {
        let (mut ctx, log) = context();
        let desired = RenderState {
            depth_testing: false,
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            ..RenderState::default()
        };
        ctx.apply(&desired).unwrap();
        assert_eq!(
            log.take(),
            vec![
                DeviceCall::SetCapability(Capability::DepthTest, false),
                DeviceCall::SetBlendFactors(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
            ]
        );

        ctx.apply(&desired).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn invalid_state_touches_nothing() {
        let (mut ctx, log) = context();
        let bad = RenderState { line_width: 0.0, depth_testing: false, ..RenderState::default() };
        assert_eq!(ctx.apply(&bad), Err(ConfigError::InvalidLineWidth(0.0)));
        assert!(ctx.force_apply(&bad).is_err());
        assert!(log.is_empty());
        assert!(ctx.state().depth_testing);
    }

    #[test]
    fn rejected_calls_still_update_the_record() {
        let mut device = RecordingDevice::new();
        device.reject_if(|call| matches!(call, DeviceCall::SetLineWidth(w) if *w > 1.0));
        let mut ctx = Context::new(device, ContextConfig::default()).unwrap();

        let wide = RenderState { line_width: 3.0, ..RenderState::default() };
        ctx.apply(&wide).unwrap();
        assert_eq!(ctx.state().line_width, 3.0);
        assert_eq!(ctx.device_error_count(), 1);
        assert!(ctx.last_device_error().is_some());

        // Not retried.
        ctx.apply(&wide).unwrap();
        assert_eq!(ctx.device_error_count(), 1);
    }

    #[test]
    fn culling_inversion_swaps_effective_mode() {
        let (mut ctx, log) = context();
        ctx.set_culling_inversion(true);
        assert_eq!(log.take(), vec![DeviceCall::SetCullMode(CullMode::Front)]);

        // Applying Front while inverted means culling back faces on the device.
        let front = RenderState { cull_mode: CullMode::Front, ..RenderState::default() };
        ctx.apply(&front).unwrap();
        assert_eq!(log.take(), vec![DeviceCall::SetCullMode(CullMode::Back)]);
    }

    #[test]
    fn inversion_without_effect_issues_nothing() {
        let (mut ctx, log) = context();
        let none = RenderState { cull_mode: CullMode::None, ..RenderState::default() };
        ctx.apply(&none).unwrap();
        log.clear();

        ctx.set_culling_inversion(true);
        assert!(log.is_empty());
        assert!(ctx.culling_inverted());
    }

    #[test]
    fn scissor_enable_follows_coverage() {
        let (mut ctx, log) = context();
        assert!(!ctx.is_scissor_enabled());

        ctx.set_scissor_area(Recti::new(10, 10, 100, 100));
        assert!(ctx.is_scissor_enabled());
        assert_eq!(
            log.take(),
            vec![
                DeviceCall::SetScissor(Recti::new(10, 10, 100, 100)),
                DeviceCall::SetCapability(Capability::ScissorTest, true),
            ]
        );

        ctx.set_scissor_area(Recti::from_size(800, 600));
        assert!(!ctx.is_scissor_enabled());
    }

    #[test]
    fn framebuffer_switch_resets_viewport_and_rederives_scissor() {
        let (mut ctx, log) = context();
        let fb = ctx.create_texture_framebuffer(100, 100, None).unwrap();
        ctx.set_scissor_area(Recti::from_size(100, 100));
        assert!(ctx.is_scissor_enabled());
        log.clear();

        ctx.set_current_framebuffer(&fb).unwrap();
        assert_eq!(ctx.viewport_area(), Recti::from_size(100, 100));
        assert!(!ctx.is_scissor_enabled());
        assert_eq!(
            log.take(),
            vec![
                DeviceCall::BindFramebuffer(fb.handle()),
                DeviceCall::SetViewport(Recti::from_size(100, 100)),
                DeviceCall::SetCapability(Capability::ScissorTest, false),
            ]
        );

        ctx.set_current_framebuffer(&fb).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn destroyed_framebuffer_is_refused() {
        let (mut ctx, log) = context();
        let fb = ctx.create_texture_framebuffer(64, 64, None).unwrap();
        ctx.destroy_framebuffer(&fb);
        log.clear();

        assert_eq!(
            ctx.set_current_framebuffer(&fb),
            Err(BindingError::Destroyed(ResourceKind::Framebuffer))
        );
        assert!(log.is_empty());
        assert!(ctx.current_framebuffer().is_screen());
    }

    #[test]
    fn same_program_binds_once() {
        let (mut ctx, log) = context();
        let program = ctx.create_program(ProgramDesc::new("flat")).unwrap();
        log.clear();

        ctx.set_current_program(Some(&program)).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        assert_eq!(log.count(|c| matches!(c, DeviceCall::BindProgram(_))), 1);

        ctx.set_current_program(None).unwrap();
        assert_eq!(log.last(), Some(DeviceCall::BindProgram(None)));
    }

    #[test]
    fn dropped_program_reads_as_unbound() {
        let (mut ctx, log) = context();
        let program = ctx.create_program(ProgramDesc::new("a")).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        drop(program);

        assert!(ctx.current_program().is_none());
        log.clear();
        let other = ctx.create_program(ProgramDesc::new("b")).unwrap();
        ctx.set_current_program(Some(&other)).unwrap();
        assert_eq!(log.last(), Some(DeviceCall::BindProgram(Some(other.handle()))));
    }

    #[test]
    fn unbinding_a_dropped_program_reaches_the_device() {
        let (mut ctx, log) = context();
        let program = ctx.create_program(ProgramDesc::new("a")).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        drop(program);
        log.clear();

        ctx.set_current_program(None).unwrap();
        assert_eq!(log.take(), vec![DeviceCall::BindProgram(None)]);

        ctx.set_current_program(None).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn scissor_against_a_dropped_framebuffer_uses_the_screen() {
        let (mut ctx, log) = context();
        let fb = ctx.create_texture_framebuffer(64, 64, None).unwrap();
        ctx.set_current_framebuffer(&fb).unwrap();
        drop(fb);
        log.clear();

        ctx.set_scissor_area(Recti::from_size(64, 64));
        let calls = log.take();
        assert_eq!(calls[0], DeviceCall::BindFramebuffer(None));
        assert_eq!(calls.last(), Some(&DeviceCall::SetCapability(Capability::ScissorTest, true)));
        assert!(ctx.is_scissor_enabled());
    }

    #[test]
    fn texture_binding_activates_unit_first() {
        let (mut ctx, log) = context();
        let texture = ctx.create_texture(TextureDesc::rgba8(8, 8)).unwrap();
        log.clear();

        ctx.set_current_texture(2, Some(&texture)).unwrap();
        let calls = log.take();
        assert_eq!(calls[0], DeviceCall::SetActiveTextureUnit(2));
        assert!(matches!(calls[1], DeviceCall::BindTexture(Some(_))));
        assert_eq!(ctx.active_texture_unit(), 2);

        ctx.set_current_texture(2, Some(&texture)).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn texture_unit_range_is_checked() {
        let limits = DeviceLimits { max_combined_texture_units: 4, ..DeviceLimits::default() };
        let mut ctx = Context::new(RecordingDevice::with_limits(limits), ContextConfig::default()).unwrap();
        assert_eq!(
            ctx.set_active_texture_unit(4),
            Err(BindingError::TextureUnitOutOfRange { unit: 4, count: 4 })
        );
    }

    #[test]
    fn texture_unit_cap_applies() {
        let config = ContextConfig { max_texture_units: Some(2), ..ContextConfig::default() };
        let ctx = Context::new(RecordingDevice::new(), config).unwrap();
        assert_eq!(ctx.texture_unit_count(), 2);
    }

    #[test]
    fn resize_updates_screen_viewport() {
        let (mut ctx, log) = context();
        ctx.resize_screen(winit::dpi::PhysicalSize::new(1024, 768));
        assert_eq!(ctx.viewport_area(), Recti::from_size(1024, 768));
        assert_eq!(ctx.screen().width(), 1024);
        // The old full-screen scissor no longer covers the larger screen.
        assert_eq!(
            log.take(),
            vec![
                DeviceCall::SetViewport(Recti::from_size(1024, 768)),
                DeviceCall::SetCapability(Capability::ScissorTest, true),
            ]
        );
    }

    #[test]
    fn restore_reissues_state_and_live_bindings() {
        let (mut ctx, log) = context();
        let program = ctx.create_program(ProgramDesc::new("p")).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        log.clear();

        ctx.restore();
        assert_eq!(log.count(DeviceCall::is_render_state), 13);
        assert_eq!(log.count(|c| *c == DeviceCall::BindProgram(Some(program.handle()))), 1);
        assert_eq!(log.count(|c| *c == DeviceCall::BindFramebuffer(None)), 1);
    }
}
