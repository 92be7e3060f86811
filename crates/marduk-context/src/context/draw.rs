use std::rc::Rc;

use crate::coords::ColorRgba;
use crate::device::{ClearRequest, DeviceBackend, DrawCall};
use crate::error::{BindingError, ConfigError, Result};
use crate::resource::{GpuResource, PrimitiveRange, Program, ResourceKind, check_bounds};
use crate::shared::UniformValue;
use crate::state::{IndexType, PrimitiveType};

use super::Context;

impl<D: DeviceBackend> Context<D> {
    // ── clears ────────────────────────────────────────────────────────────

    pub fn clear_color_buffer(&mut self, color: ColorRgba) {
        self.clear_buffers(Some(color), None, None);
    }

    pub fn clear_depth_buffer(&mut self, depth: f32) {
        self.clear_buffers(None, Some(depth), None);
    }

    pub fn clear_stencil_buffer(&mut self, stencil: u32) {
        self.clear_buffers(None, None, Some(stencil));
    }

    /// Clears the selected buffers of the current framebuffer.
    pub fn clear_buffers(&mut self, color: Option<ColorRgba>, depth: Option<f32>, stencil: Option<u32>) {
        let request = ClearRequest { color, depth, stencil };
        if request == ClearRequest::default() {
            return;
        }
        self.ensure_framebuffer();
        let result = self.device.clear(&request);
        self.note(result, || format!("clear {request:?}"));
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Draws `range` with the current program.
    ///
    /// The range's buffers are bound through the cache and shared values are
    /// pushed into the program first. Nothing is bound or drawn if the call
    /// cannot succeed.
    pub fn render(&mut self, range: &PrimitiveRange) -> Result<()> {
        let program = self.slots.program.get().ok_or(BindingError::NoProgram)?;
        range.check_bounds()?;
        if range.vertex_buffer.is_destroyed() {
            return Err(BindingError::Destroyed(ResourceKind::VertexBuffer).into());
        }
        if range.index_buffer.as_ref().is_some_and(|ib| ib.is_destroyed()) {
            return Err(BindingError::Destroyed(ResourceKind::IndexBuffer).into());
        }

        self.set_current_vertex_buffer(Some(&range.vertex_buffer))?;
        let index_type = match &range.index_buffer {
            Some(indices) => {
                self.set_current_index_buffer(Some(indices))?;
                Some(indices.index_type())
            }
            None => None,
        };

        self.draw(&program, range.primitive, range.start, range.count, range.base, index_type);
        Ok(())
    }

    /// Draws from whatever buffers are bound. Indexed if an index buffer is.
    pub fn render_primitives(&mut self, primitive: PrimitiveType, start: u32, count: u32, base: i32) -> Result<()> {
        let program = self.slots.program.get().ok_or(BindingError::NoProgram)?;
        let vertices = self.slots.vertex_buffer.get().ok_or(BindingError::NoVertexBuffer)?;

        let (available, index_type) = match self.slots.index_buffer.get() {
            Some(indices) => (indices.count(), Some(indices.index_type())),
            None => (vertices.count(), None),
        };
        check_bounds(start, count, available)?;

        self.draw(&program, primitive, start, count, base, index_type);
        Ok(())
    }

    fn draw(
        &mut self,
        program: &Rc<Program>,
        primitive: PrimitiveType,
        start: u32,
        count: u32,
        base_vertex: i32,
        index_type: Option<IndexType>,
    ) {
        if count == 0 {
            return;
        }

        self.unbind_dangling();
        self.push_shared_state(program);

        let call = DrawCall {
            primitive,
            start,
            count,
            base_vertex,
            index_type,
        };
        let result = self.device.draw(&call);
        if self.note(result, || format!("draw {count} {primitive} from {start}")).is_some() {
            self.stats.record_primitives(primitive, count);
        }
    }

    /// Hands every shared input `program` declares to the device, as the
    /// installed provider reports it.
    ///
    /// Sampler `i` of a program reads unit `i`, so shared textures are bound
    /// on the unit matching their declaration index.
    fn push_shared_state(&mut self, program: &Rc<Program>) {
        let Some(provider) = self.shared_state.clone() else {
            return;
        };

        for (location, decl) in program.uniforms().iter().enumerate() {
            let Some(signature) = self.shared.uniform(&decl.name, decl.ty) else {
                continue;
            };
            let Some(value) = provider.uniform_value(signature) else {
                continue;
            };
            if value.ty() != decl.ty {
                log::warn!(
                    "shared uniform `{}` expects {}, provider gave {}; skipped",
                    decl.name,
                    decl.ty,
                    value.ty()
                );
                continue;
            }

            let result = self.device.set_uniform(program.handle(), location as u32, &value);
            self.note(result, || format!("shared uniform `{}` of `{}`", decl.name, program.label()));
        }

        for (unit, decl) in program.samplers().iter().enumerate() {
            let Some(signature) = self.shared.sampler(&decl.name, decl.ty) else {
                continue;
            };
            let Some(texture) = provider.sampler_texture(signature) else {
                continue;
            };
            if let Err(err) = self.set_current_texture(unit, Some(&texture)) {
                log::warn!("shared sampler `{}` of `{}` not bound: {err}", decl.name, program.label());
            }
        }
    }

    /// Sets a uniform of `program` directly, outside the shared registry.
    pub fn set_program_uniform(&mut self, program: &Rc<Program>, name: &str, value: UniformValue) -> Result<()> {
        if program.is_destroyed() {
            return Err(BindingError::Destroyed(ResourceKind::Program).into());
        }

        let location = program.uniform_location(name).ok_or_else(|| ConfigError::UnknownUniform {
            program: program.label().to_owned(),
            name: name.to_owned(),
        })?;

        let declared = program.uniforms()[location as usize].ty;
        if declared != value.ty() {
            return Err(ConfigError::UniformTypeMismatch {
                name: name.to_owned(),
                declared: declared.as_str(),
                given: value.ty().as_str(),
            }
            .into());
        }

        let result = self.device.set_uniform(program.handle(), location, &value);
        self.note(result, || format!("uniform `{name}` of `{}`", program.label()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::context::{Context, ContextConfig};
    use crate::coords::ColorRgba;
    use crate::device::{CallLog, ClearRequest, DeviceCall, RecordingDevice};
    use crate::error::{BindingError, ConfigError, ContextError};
    use crate::resource::{GpuResource, PrimitiveRange, ProgramDesc, TextureDesc};
    use crate::shared::{SamplerType, SharedValues, UniformType, UniformValue};
    use crate::state::{IndexType, PrimitiveType};

    fn context() -> (Context<RecordingDevice>, CallLog) {
        let device = RecordingDevice::new();
        let log = device.log();
        let ctx = Context::new(device, ContextConfig::default()).unwrap();
        log.clear();
        (ctx, log)
    }

    fn draws(log: &CallLog) -> usize {
        log.count(|c| matches!(c, DeviceCall::Draw(_)))
    }

    #[test]
    fn render_without_program_draws_nothing() {
        let (mut ctx, log) = context();
        let vb = ctx.create_vertex_buffer(3, 12).unwrap();
        log.clear();

        let err = ctx.render(&PrimitiveRange::vertices(PrimitiveType::TriangleList, &vb));
        assert_eq!(err, Err(ContextError::Binding(BindingError::NoProgram)));
        assert!(log.is_empty());
    }

    #[test]
    fn render_primitives_needs_a_vertex_buffer() {
        let (mut ctx, _log) = context();
        let program = ctx.create_program(ProgramDesc::new("p")).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        assert_eq!(
            ctx.render_primitives(PrimitiveType::PointList, 0, 1, 0),
            Err(ContextError::Binding(BindingError::NoVertexBuffer))
        );
    }

    #[test]
    fn render_binds_range_and_records_stats() {
        let (mut ctx, log) = context();
        let program = ctx.create_program(ProgramDesc::new("p")).unwrap();
        let vb = ctx.create_vertex_buffer(4, 16).unwrap();
        let ib = ctx.create_index_buffer(6, IndexType::U16).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        log.clear();

        let range = PrimitiveRange::indexed(PrimitiveType::TriangleList, &vb, &ib);
        ctx.render(&range).unwrap();
        ctx.render(&range).unwrap();

        assert_eq!(log.count(|c| matches!(c, DeviceCall::BindVertexBuffer(_))), 1);
        assert_eq!(log.count(|c| matches!(c, DeviceCall::BindIndexBuffer(_))), 1);
        assert_eq!(draws(&log), 2);
        assert_eq!(ctx.stats().current_frame().triangle_count, 4);
        assert_eq!(ctx.stats().current_frame().operation_count, 2);
    }

    #[test]
    fn out_of_range_draws_are_refused() {
        let (mut ctx, log) = context();
        let program = ctx.create_program(ProgramDesc::new("p")).unwrap();
        let vb = ctx.create_vertex_buffer(3, 12).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        log.clear();

        let range = PrimitiveRange::vertices(PrimitiveType::TriangleList, &vb).slice(2, 3);
        assert!(matches!(
            ctx.render(&range),
            Err(ContextError::Binding(BindingError::RangeOutOfBounds { .. }))
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn empty_draws_are_skipped() {
        let (mut ctx, log) = context();
        let program = ctx.create_program(ProgramDesc::new("p")).unwrap();
        let vb = ctx.create_vertex_buffer(3, 12).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        ctx.set_current_vertex_buffer(Some(&vb)).unwrap();

        ctx.render_primitives(PrimitiveType::TriangleList, 0, 0, 0).unwrap();
        assert_eq!(draws(&log), 0);
        assert_eq!(ctx.stats().current_frame().operation_count, 0);
    }

    #[test]
    fn shared_uniforms_are_pushed_after_binding() {
        let (mut ctx, log) = context();
        let view = ctx.reserve_uniform("viewMatrix", UniformType::Mat4).unwrap();
        let program = ctx
            .create_program(
                ProgramDesc::new("lit")
                    .uniform("tint", UniformType::Vec4)
                    .uniform("viewMatrix", UniformType::Mat4),
            )
            .unwrap();
        let vb = ctx.create_vertex_buffer(3, 12).unwrap();

        let values = Rc::new(SharedValues::new());
        values.set_uniform(view, UniformValue::identity_mat4());
        ctx.set_shared_program_state(Some(values.clone()));

        ctx.set_current_program(Some(&program)).unwrap();
        log.clear();
        ctx.render(&PrimitiveRange::vertices(PrimitiveType::TriangleList, &vb)).unwrap();

        let calls = log.take();
        let uniform = calls
            .iter()
            .position(|c| matches!(c, DeviceCall::SetUniform { location: 1, .. }))
            .expect("shared uniform pushed");
        let draw = calls.iter().position(|c| matches!(c, DeviceCall::Draw(_))).unwrap();
        assert!(uniform < draw);
        assert_eq!(calls.iter().filter(|c| matches!(c, DeviceCall::SetUniform { .. })).count(), 1);
    }

    #[test]
    fn mistyped_shared_values_are_skipped() {
        let (mut ctx, log) = context();
        let time = ctx.reserve_uniform("time", UniformType::Float).unwrap();
        let program = ctx
            .create_program(ProgramDesc::new("p").uniform("time", UniformType::Float))
            .unwrap();
        let vb = ctx.create_vertex_buffer(1, 12).unwrap();

        let values = Rc::new(SharedValues::new());
        values.set_uniform(time, UniformValue::Vec2([0.0, 1.0]));
        ctx.set_shared_program_state(Some(values));
        ctx.set_current_program(Some(&program)).unwrap();
        log.clear();

        ctx.render(&PrimitiveRange::vertices(PrimitiveType::PointList, &vb)).unwrap();
        assert_eq!(log.count(|c| matches!(c, DeviceCall::SetUniform { .. })), 0);
        assert_eq!(draws(&log), 1);
    }

    #[test]
    fn shared_samplers_bind_on_their_declaration_unit() {
        let (mut ctx, _log) = context();
        let diffuse = ctx.reserve_sampler("diffuseMap", SamplerType::Sampler2D).unwrap();
        let program = ctx
            .create_program(
                ProgramDesc::new("p")
                    .sampler("shadowMap", SamplerType::Sampler2D)
                    .sampler("diffuseMap", SamplerType::Sampler2D),
            )
            .unwrap();
        let texture = ctx.create_texture(TextureDesc::rgba8(4, 4)).unwrap();
        let vb = ctx.create_vertex_buffer(3, 12).unwrap();

        let values = Rc::new(SharedValues::new());
        values.set_sampler(diffuse, texture.clone());
        ctx.set_shared_program_state(Some(values));
        ctx.set_current_program(Some(&program)).unwrap();

        ctx.render(&PrimitiveRange::vertices(PrimitiveType::TriangleList, &vb)).unwrap();
        assert!(Rc::ptr_eq(&ctx.current_texture(1).unwrap(), &texture));
        assert!(ctx.current_texture(0).is_none());
    }

    #[test]
    fn no_provider_pushes_nothing() {
        let (mut ctx, log) = context();
        ctx.reserve_uniform("time", UniformType::Float).unwrap();
        let program = ctx
            .create_program(ProgramDesc::new("p").uniform("time", UniformType::Float))
            .unwrap();
        let vb = ctx.create_vertex_buffer(1, 12).unwrap();
        ctx.set_current_program(Some(&program)).unwrap();
        log.clear();

        ctx.render(&PrimitiveRange::vertices(PrimitiveType::PointList, &vb)).unwrap();
        assert_eq!(log.count(|c| matches!(c, DeviceCall::SetUniform { .. })), 0);
    }

    #[test]
    fn program_uniforms_are_type_checked() {
        let (mut ctx, log) = context();
        let program = ctx
            .create_program(ProgramDesc::new("p").uniform("alpha", UniformType::Float))
            .unwrap();
        log.clear();

        ctx.set_program_uniform(&program, "alpha", UniformValue::Float(0.5)).unwrap();
        assert_eq!(
            log.take(),
            vec![DeviceCall::SetUniform {
                program: program.handle(),
                location: 0,
                value: UniformValue::Float(0.5),
            }]
        );

        assert_eq!(
            ctx.set_program_uniform(&program, "alpha", UniformValue::Vec3([0.0; 3])),
            Err(ContextError::Config(ConfigError::UniformTypeMismatch {
                name: "alpha".into(),
                declared: "float",
                given: "vec3",
            }))
        );
        assert!(matches!(
            ctx.set_program_uniform(&program, "beta", UniformValue::Float(1.0)),
            Err(ContextError::Config(ConfigError::UnknownUniform { .. }))
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn clears_forward_the_selected_buffers() {
        let (mut ctx, log) = context();
        ctx.clear_color_buffer(ColorRgba::black());
        ctx.clear_buffers(None, Some(1.0), Some(0));
        ctx.clear_buffers(None, None, None);

        assert_eq!(
            log.take(),
            vec![
                DeviceCall::Clear(ClearRequest { color: Some(ColorRgba::black()), ..ClearRequest::default() }),
                DeviceCall::Clear(ClearRequest { color: None, depth: Some(1.0), stencil: Some(0) }),
            ]
        );
    }
}
