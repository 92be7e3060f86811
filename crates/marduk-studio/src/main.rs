//! Headless walkthrough of the render context: a few frames of state
//! changes and draws recorded by the wgpu backend, with per-frame stats.

use std::rc::Rc;

use anyhow::Context as _;
use bytemuck::{Pod, Zeroable};
use marduk_context::coords::{ColorRgba, Recti};
use marduk_context::device::{CommandQueue, RenderCommand, WgpuBackend};
use marduk_context::logging::{LoggingConfig, init_logging};
use marduk_context::resource::{PrimitiveRange, ProgramDesc, TextureDesc};
use marduk_context::shared::{SamplerType, SharedValues, UniformType, UniformValue};
use marduk_context::state::{IndexType, PrimitiveType, RenderState};
use marduk_context::{Context, ContextConfig};
use winit::dpi::PhysicalSize;

const FRAMES: u32 = 3;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let backend = WgpuBackend::new(&wgpu::Limits::default(), wgpu::Features::empty());
    let queue = backend.queue();

    let config = ContextConfig::default().with_screen_size(820, 560);
    let mut ctx = Context::new(backend, config).context("failed to create render context")?;
    log::info!("device limits: {:?}", ctx.limits());

    ctx.reserve_uniform("viewMatrix", UniformType::Mat4)?;
    ctx.reserve_uniform("time", UniformType::Float)?;
    ctx.reserve_sampler("diffuseMap", SamplerType::Sampler2D)?;
    log::debug!("shared declarations:\n{}", ctx.shared_declaration());

    let program = ctx
        .create_program(
            ProgramDesc::new("textured")
                .uniform("viewMatrix", UniformType::Mat4)
                .uniform("time", UniformType::Float)
                .uniform("tint", UniformType::Vec4)
                .sampler("diffuseMap", SamplerType::Sampler2D),
        )
        .context("failed to create program")?;

    let quad = [
        Vertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
        Vertex { position: [1.0, -1.0, 0.0], uv: [1.0, 1.0] },
        Vertex { position: [1.0, 1.0, 0.0], uv: [1.0, 0.0] },
        Vertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 0.0] },
    ];
    let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];

    let vertices = ctx.create_vertex_buffer(quad.len() as u32, size_of::<Vertex>() as u32)?;
    ctx.write_vertices(&vertices, 0, &quad)?;
    let index_buffer = ctx.create_index_buffer(indices.len() as u32, IndexType::U16)?;
    ctx.write_indices(&index_buffer, 0, &indices)?;

    let diffuse = ctx.create_texture(TextureDesc::rgba8(256, 256))?;
    let offscreen = ctx.create_texture_framebuffer(256, 256, None)?;

    let shared = Rc::new(SharedValues::new());
    shared.set_uniform(ctx.lookup_uniform_id("viewMatrix", UniformType::Mat4), UniformValue::Mat4(IDENTITY));
    shared.set_sampler(ctx.lookup_sampler_id("diffuseMap", SamplerType::Sampler2D), diffuse.clone());
    ctx.set_shared_program_state(Some(shared.clone()));

    ctx.set_program_uniform(&program, "tint", UniformValue::Vec4([1.0, 0.8, 0.6, 1.0]))?;
    ctx.set_current_program(Some(&program))?;

    let time_id = ctx.lookup_uniform_id("time", UniformType::Float);
    let quad_range = PrimitiveRange::indexed(PrimitiveType::TriangleList, &vertices, &index_buffer);

    for frame in 0..FRAMES {
        ctx.begin_frame();
        shared.set_uniform(time_id, UniformValue::Float(frame as f32 / 60.0));

        // Offscreen pass.
        ctx.set_current_framebuffer(&offscreen)?;
        ctx.clear_buffers(Some(ColorRgba::transparent()), Some(1.0), None);
        ctx.apply(&RenderState::default())?;
        ctx.render(&quad_range)?;

        // Blended pass on screen, clipped to the left half.
        ctx.set_default_framebuffer_current();
        ctx.clear_color_buffer(ColorRgba::black());
        ctx.apply(&RenderState { depth_testing: false, ..RenderState::alpha_blended() })?;
        ctx.set_scissor_area(Recti::from_size(410, 560));
        ctx.render(&quad_range)?;
        ctx.render(&quad_range.clone().slice(0, 3))?;
        ctx.set_scissor_area(Recti::from_size(820, 560));

        drain(&queue, frame);
    }

    ctx.resize_screen(PhysicalSize::new(1024, 768));
    ctx.destroy(&diffuse);
    ctx.destroy_framebuffer(&offscreen);
    ctx.begin_frame();

    report(&ctx);
    Ok(())
}

fn drain(queue: &CommandQueue, frame: u32) {
    let commands = queue.take();
    let draws = commands.iter().filter(|c| matches!(c, RenderCommand::Draw(_))).count();
    log::info!(
        "frame {frame}: {} commands ({draws} draws, {} clears)",
        commands.len(),
        commands.len() - draws
    );
    for command in &commands {
        log::trace!("{command:?}");
    }
}

fn report(ctx: &Context<WgpuBackend>) {
    let stats = ctx.stats();
    log::info!("frame rate: {:.1} fps over {} frames", stats.frame_rate(), stats.frame_count());
    for (age, frame) in stats.frames().enumerate() {
        log::info!(
            "  -{age}: {} ops, {} state changes, {} triangles, {} vertices",
            frame.operation_count,
            frame.state_change_count,
            frame.triangle_count,
            frame.vertex_count
        );
    }
    log::info!("resident resources: {} bytes", stats.total_resource_bytes());
    if let Some(err) = ctx.last_device_error() {
        log::warn!("{} device errors, last: {err}", ctx.device_error_count());
    }
}

#[rustfmt::skip]
const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];
