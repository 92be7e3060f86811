//! End-to-end behaviour of the render context against the recording device.

use std::rc::Rc;
use std::time::{Duration, Instant};

use marduk_context::coords::{ColorRgba, Recti};
use marduk_context::device::{CallLog, DeviceCall, RecordingDevice};
use marduk_context::resource::{GpuResource, PrimitiveRange, ProgramDesc, ResourceKind, TextureDesc};
use marduk_context::shared::{SamplerType, SharedId, SharedValues, UniformType, UniformValue};
use marduk_context::state::{BlendFactor, CullMode, IndexType, PrimitiveType, RenderState};
use marduk_context::stats::Stats;
use marduk_context::{ConfigError, Context, ContextConfig};

fn context() -> (Context<RecordingDevice>, CallLog) {
    let device = RecordingDevice::new();
    let log = device.log();
    let ctx = Context::new(device, ContextConfig::default().with_screen_size(640, 480)).unwrap();
    log.clear();
    (ctx, log)
}

fn state_calls(log: &CallLog) -> usize {
    log.count(DeviceCall::is_render_state)
}

#[test]
fn blend_change_is_one_call_then_none_then_full_reissue() {
    let (mut ctx, log) = context();

    let defaults = RenderState::default();
    assert!(defaults.depth_testing);
    assert_eq!(defaults.cull_mode, CullMode::Back);
    assert_eq!((defaults.src_factor, defaults.dst_factor), (BlendFactor::One, BlendFactor::Zero));

    let blended = RenderState::alpha_blended();
    ctx.apply(&blended).unwrap();
    assert_eq!(
        log.take(),
        vec![DeviceCall::SetBlendFactors(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)]
    );

    ctx.apply(&blended).unwrap();
    assert!(log.is_empty());

    ctx.force_apply(&blended).unwrap();
    assert_eq!(state_calls(&log), 13);
    assert_eq!(log.len(), 13);
}

#[test]
fn state_calls_match_changed_fields_over_a_sequence() {
    let (mut ctx, log) = context();
    let sequence = [
        RenderState { depth_testing: false, ..RenderState::default() },
        RenderState { depth_testing: false, wireframe: true, line_width: 2.0, ..RenderState::default() },
        RenderState::alpha_blended(),
        RenderState { stencil_testing: true, stencil_ref: 1, ..RenderState::alpha_blended() },
        RenderState::default(),
    ];

    let mut previous = RenderState::default();
    let mut expected = 0;
    for state in &sequence {
        expected += previous.changed_fields(state).count();
        ctx.apply(state).unwrap();
        previous = *state;
    }
    assert_eq!(state_calls(&log), expected);
    assert_eq!(log.len(), expected);
}

#[test]
fn rebinding_the_same_objects_is_free() {
    let (mut ctx, log) = context();
    let program = ctx.create_program(ProgramDesc::new("p")).unwrap();
    let vb = ctx.create_vertex_buffer(3, 12).unwrap();
    let ib = ctx.create_index_buffer(3, IndexType::U32).unwrap();
    let texture = ctx.create_texture(TextureDesc::rgba8(2, 2)).unwrap();
    let fb = ctx.create_texture_framebuffer(64, 64, Some(texture.clone())).unwrap();
    log.clear();

    for _ in 0..2 {
        ctx.set_current_program(Some(&program)).unwrap();
        ctx.set_current_vertex_buffer(Some(&vb)).unwrap();
        ctx.set_current_index_buffer(Some(&ib)).unwrap();
        ctx.set_current_texture(0, Some(&texture)).unwrap();
        ctx.set_current_framebuffer(&fb).unwrap();
    }

    assert_eq!(log.count(DeviceCall::is_bind), 5);
}

#[test]
fn scissor_enable_is_derived_against_the_current_target() {
    let (mut ctx, _log) = context();

    ctx.set_scissor_area(Recti::from_size(640, 480));
    assert!(!ctx.is_scissor_enabled());

    ctx.set_scissor_area(Recti::new(0, 0, 320, 240));
    assert!(ctx.is_scissor_enabled());

    // A smaller target fully inside the scissor rectangle turns it off again.
    let small = ctx.create_texture_framebuffer(320, 240, None).unwrap();
    ctx.set_current_framebuffer(&small).unwrap();
    assert!(!ctx.is_scissor_enabled());

    ctx.set_default_framebuffer_current();
    assert!(ctx.is_scissor_enabled());
}

#[test]
fn shared_registry_scenario() {
    let (mut ctx, _log) = context();

    assert_eq!(ctx.reserve_uniform("viewMatrix", UniformType::Mat4).unwrap().get(), 0);
    assert_eq!(ctx.reserve_sampler("diffuseMap", SamplerType::Sampler2D).unwrap().get(), 0);

    let lines: Vec<&str> = ctx.shared_declaration().lines().collect();
    assert_eq!(lines, vec!["uniform mat4 viewMatrix;", "uniform sampler2D diffuseMap;"]);
}

#[test]
fn reserving_time_twice_and_with_another_type() {
    let (mut ctx, _log) = context();
    let id = ctx.reserve_uniform("time", UniformType::Float).unwrap();
    assert_eq!(ctx.reserve_uniform("time", UniformType::Float), Ok(id));
    assert!(matches!(
        ctx.reserve_uniform("time", UniformType::Vec2),
        Err(ConfigError::SharedTypeMismatch { .. })
    ));
    assert_eq!(ctx.lookup_uniform_id("time", UniformType::Float), id);
}

#[test]
fn missing_sampler_lookup_is_invalid_and_pure() {
    let (ctx, _log) = context();
    assert_eq!(ctx.lookup_sampler_id("missing", SamplerType::Sampler2D), SharedId::INVALID);
    assert_eq!(SharedId::INVALID.get(), -1);
    assert!(ctx.shared_registry().is_empty());
}

#[test]
fn triangle_accounting_across_frames() {
    let t0 = Instant::now();
    let mut stats = Stats::starting_at(60, t0);
    stats.begin_frame_at(t0);

    for _ in 0..3 {
        stats.record_primitives(PrimitiveType::TriangleList, 300);
    }
    assert_eq!(stats.current_frame().triangle_count, 300);

    stats.begin_frame_at(t0 + Duration::from_millis(20));
    assert_eq!(stats.last_frame().unwrap().triangle_count, 300);
    assert_eq!(stats.current_frame().triangle_count, 0);
    assert_eq!(stats.current_frame().operation_count, 0);
}

#[test]
fn shared_camera_reaches_every_program() {
    let (mut ctx, log) = context();
    let view = ctx.reserve_uniform("viewMatrix", UniformType::Mat4).unwrap();

    let a = ctx
        .create_program(ProgramDesc::new("a").uniform("viewMatrix", UniformType::Mat4))
        .unwrap();
    let b = ctx
        .create_program(
            ProgramDesc::new("b")
                .uniform("color", UniformType::Vec4)
                .uniform("viewMatrix", UniformType::Mat4),
        )
        .unwrap();
    let vb = ctx.create_vertex_buffer(3, 12).unwrap();

    let camera = Rc::new(SharedValues::new());
    camera.set_uniform(view, UniformValue::identity_mat4());
    ctx.set_shared_program_state(Some(camera));
    log.clear();

    let range = PrimitiveRange::vertices(PrimitiveType::TriangleList, &vb);
    for program in [&a, &b] {
        ctx.set_current_program(Some(program)).unwrap();
        ctx.render(&range).unwrap();
    }

    let pushed: Vec<_> = log
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            DeviceCall::SetUniform { program, location, .. } => Some((program, location)),
            _ => None,
        })
        .collect();
    assert_eq!(pushed, vec![(a.handle(), 0), (b.handle(), 1)]);
    assert_eq!(ctx.stats().current_frame().triangle_count, 2);
}

#[test]
fn dropped_bound_texture_is_unbound_and_released() {
    let (mut ctx, log) = context();
    let texture = ctx.create_texture(TextureDesc::rgba8(4, 4)).unwrap();
    ctx.set_current_texture(1, Some(&texture)).unwrap();
    ctx.set_active_texture_unit(0).unwrap();
    let handle = texture.handle();
    drop(texture);
    log.clear();

    assert!(ctx.current_texture(1).is_none());
    ctx.begin_frame();
    assert_eq!(
        log.take(),
        vec![
            DeviceCall::SetActiveTextureUnit(1),
            DeviceCall::BindTexture(None),
            DeviceCall::Delete(ResourceKind::Texture, handle),
        ]
    );

    // Binding a fresh texture to the same unit is a real bind again.
    let fresh = ctx.create_texture(TextureDesc::rgba8(4, 4)).unwrap();
    log.clear();
    ctx.set_current_texture(1, Some(&fresh)).unwrap();
    assert_eq!(log.count(DeviceCall::is_bind), 1);
}

#[test]
fn drawing_after_a_bound_texture_is_dropped_samples_nothing() {
    let (mut ctx, log) = context();
    let program = ctx.create_program(ProgramDesc::new("p").sampler("tex", SamplerType::Sampler2D)).unwrap();
    let vb = ctx.create_vertex_buffer(3, 12).unwrap();
    let texture = ctx.create_texture(TextureDesc::rgba8(4, 4)).unwrap();
    ctx.set_current_program(Some(&program)).unwrap();
    ctx.set_current_texture(0, Some(&texture)).unwrap();
    drop(texture);
    log.clear();

    ctx.render(&PrimitiveRange::vertices(PrimitiveType::TriangleList, &vb)).unwrap();
    let calls = log.calls();
    let unbind = calls.iter().position(|c| *c == DeviceCall::BindTexture(None)).unwrap();
    let draw = calls.iter().position(|c| matches!(c, DeviceCall::Draw(_))).unwrap();
    assert!(unbind < draw);
    assert!(ctx.current_texture(0).is_none());
}

#[test]
fn dropped_bound_buffers_and_program_are_unbound_before_release() {
    let (mut ctx, log) = context();
    let program = ctx.create_program(ProgramDesc::new("p")).unwrap();
    let vb = ctx.create_vertex_buffer(3, 12).unwrap();
    let ib = ctx.create_index_buffer(3, IndexType::U32).unwrap();
    ctx.set_current_program(Some(&program)).unwrap();
    ctx.render(&PrimitiveRange::indexed(PrimitiveType::TriangleList, &vb, &ib)).unwrap();
    drop((program, vb, ib));
    log.clear();

    ctx.begin_frame();
    let calls = log.take();
    let first_delete = calls.iter().position(|c| matches!(c, DeviceCall::Delete(..))).unwrap();
    let unbinds = [
        DeviceCall::BindProgram(None),
        DeviceCall::BindVertexBuffer(None),
        DeviceCall::BindIndexBuffer(None),
    ];
    for unbind in &unbinds {
        let at = calls.iter().position(|c| c == unbind).unwrap();
        assert!(at < first_delete, "{unbind:?} issued after a delete");
    }
    assert_eq!(ctx.device().live_handles(), 0);
}

#[test]
fn clearing_after_the_current_framebuffer_is_dropped_targets_the_screen() {
    let (mut ctx, log) = context();
    let fb = ctx.create_texture_framebuffer(64, 64, None).unwrap();
    ctx.set_current_framebuffer(&fb).unwrap();
    drop(fb);
    log.clear();

    assert!(ctx.current_framebuffer().is_screen());
    ctx.clear_color_buffer(ColorRgba::black());
    let calls = log.take();
    assert_eq!(calls[0], DeviceCall::BindFramebuffer(None));
    assert!(matches!(calls.last(), Some(DeviceCall::Clear(_))));
    assert_eq!(ctx.viewport_area(), Recti::from_size(640, 480));

    // The screen is already current again; the next frame only deletes.
    ctx.begin_frame();
    assert!(log.take().iter().all(|c| matches!(c, DeviceCall::Delete(..))));
}
