//! Logical enum to wgpu translation table.
//!
//! Every mapping from the context's vocabulary to wgpu values lives here.
//! Values wgpu cannot express map to `None`.

use crate::state::{BlendFactor, CompareFunction, CullMode, IndexType, PrimitiveType, StencilOp};

pub fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
    }
}

/// Additive blending with the same factors for color and alpha.
///
/// `One`/`Zero` is a plain overwrite and maps to no blending at all.
pub fn blend_state(src: BlendFactor, dst: BlendFactor) -> Option<wgpu::BlendState> {
    if src == BlendFactor::One && dst == BlendFactor::Zero {
        return None;
    }

    let component = wgpu::BlendComponent {
        src_factor: blend_factor(src),
        dst_factor: blend_factor(dst),
        operation: wgpu::BlendOperation::Add,
    };
    Some(wgpu::BlendState {
        color: component,
        alpha: component,
    })
}

pub fn compare_function(function: CompareFunction) -> wgpu::CompareFunction {
    match function {
        CompareFunction::Never => wgpu::CompareFunction::Never,
        CompareFunction::Always => wgpu::CompareFunction::Always,
        CompareFunction::Equal => wgpu::CompareFunction::Equal,
        CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
        CompareFunction::Less => wgpu::CompareFunction::Less,
        CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunction::Greater => wgpu::CompareFunction::Greater,
        CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
    }
}

/// Plain increment/decrement saturate.
pub fn stencil_operation(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Replace => wgpu::StencilOperation::Replace,
        StencilOp::Increment => wgpu::StencilOperation::IncrementClamp,
        StencilOp::Decrement => wgpu::StencilOperation::DecrementClamp,
        StencilOp::Invert => wgpu::StencilOperation::Invert,
        StencilOp::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOp::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

pub fn stencil_face(
    function: CompareFunction,
    fail: StencilOp,
    depth_fail: StencilOp,
    depth_pass: StencilOp,
) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare: compare_function(function),
        fail_op: stencil_operation(fail),
        depth_fail_op: stencil_operation(depth_fail),
        pass_op: stencil_operation(depth_pass),
    }
}

/// Face culled by the rasterizer. `Both` has no wgpu equivalent and maps to
/// `None`; the lowering backend drops such draws instead.
pub fn cull_face(mode: CullMode) -> Option<wgpu::Face> {
    match mode {
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
        CullMode::None | CullMode::Both => None,
    }
}

pub fn polygon_mode(wireframe: bool) -> wgpu::PolygonMode {
    if wireframe {
        wgpu::PolygonMode::Line
    } else {
        wgpu::PolygonMode::Fill
    }
}

/// Loops and fans have no native topology.
pub fn topology(primitive: PrimitiveType) -> Option<wgpu::PrimitiveTopology> {
    match primitive {
        PrimitiveType::PointList => Some(wgpu::PrimitiveTopology::PointList),
        PrimitiveType::LineList => Some(wgpu::PrimitiveTopology::LineList),
        PrimitiveType::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
        PrimitiveType::TriangleList => Some(wgpu::PrimitiveTopology::TriangleList),
        PrimitiveType::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
        PrimitiveType::LineLoop | PrimitiveType::TriangleFan => None,
    }
}

pub fn index_format(index_type: IndexType) -> Option<wgpu::IndexFormat> {
    match index_type {
        IndexType::U8 => None,
        IndexType::U16 => Some(wgpu::IndexFormat::Uint16),
        IndexType::U32 => Some(wgpu::IndexFormat::Uint32),
    }
}

pub fn color_writes(enabled: bool) -> wgpu::ColorWrites {
    if enabled {
        wgpu::ColorWrites::ALL
    } else {
        wgpu::ColorWrites::empty()
    }
}
