use crate::error::ConfigError;

use super::{BlendFactor, CompareFunction, CullMode, StencilOp};

/// Pipeline settings requested by a caller.
///
/// Compared by value. The defaults mirror a freshly created device: depth
/// testing and writing on, back-face culling, opaque (`One`/`Zero`) blending.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderState {
    pub depth_testing: bool,
    pub depth_writing: bool,
    pub color_writing: bool,
    pub stencil_testing: bool,
    pub wireframe: bool,
    pub line_smoothing: bool,
    pub multisampling: bool,
    /// Rasterized line width in pixels. Must be positive and finite.
    pub line_width: f32,
    pub cull_mode: CullMode,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub depth_function: CompareFunction,
    pub stencil_function: CompareFunction,
    pub stencil_ref: u32,
    pub stencil_mask: u32,
    pub stencil_fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub depth_pass_op: StencilOp,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_testing: true,
            depth_writing: true,
            color_writing: true,
            stencil_testing: false,
            wireframe: false,
            line_smoothing: false,
            multisampling: true,
            line_width: 1.0,
            cull_mode: CullMode::Back,
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            depth_function: CompareFunction::Less,
            stencil_function: CompareFunction::Always,
            stencil_ref: 0,
            stencil_mask: !0,
            stencil_fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            depth_pass_op: StencilOp::Keep,
        }
    }
}

impl RenderState {
    /// Standard "over" alpha blending on top of the defaults.
    pub fn alpha_blended() -> Self {
        Self {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            ..Self::default()
        }
    }

    /// Returns `true` if this state blends at all (`One`/`Zero` is a plain overwrite).
    #[inline]
    pub fn is_blending(&self) -> bool {
        !(self.src_factor == BlendFactor::One && self.dst_factor == BlendFactor::Zero)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.line_width.is_finite() && self.line_width > 0.0) {
            return Err(ConfigError::InvalidLineWidth(self.line_width));
        }
        Ok(())
    }

    /// Iterates the fields whose values differ between `self` and `other`.
    pub fn changed_fields<'a>(&'a self, other: &'a RenderState) -> impl Iterator<Item = StateField> + 'a {
        StateField::ALL
            .iter()
            .copied()
            .filter(move |field| !field.matches(self, other))
    }
}

/// Unit of diffing: each field maps to exactly one device call.
///
/// Members that the device sets together (both blend factors, the stencil
/// function with its reference and mask, the three stencil operations) form
/// one field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StateField {
    DepthTest,
    DepthWrite,
    ColorWrite,
    StencilTest,
    Wireframe,
    LineSmooth,
    Multisample,
    LineWidth,
    Cull,
    Blend,
    DepthFunction,
    StencilFunction,
    StencilOperations,
}

impl StateField {
    pub const ALL: [StateField; 13] = [
        StateField::DepthTest,
        StateField::DepthWrite,
        StateField::ColorWrite,
        StateField::StencilTest,
        StateField::Wireframe,
        StateField::LineSmooth,
        StateField::Multisample,
        StateField::LineWidth,
        StateField::Cull,
        StateField::Blend,
        StateField::DepthFunction,
        StateField::StencilFunction,
        StateField::StencilOperations,
    ];

    /// Returns `true` if `a` and `b` agree on every member of this field.
    pub fn matches(self, a: &RenderState, b: &RenderState) -> bool {
        match self {
            StateField::DepthTest => a.depth_testing == b.depth_testing,
            StateField::DepthWrite => a.depth_writing == b.depth_writing,
            StateField::ColorWrite => a.color_writing == b.color_writing,
            StateField::StencilTest => a.stencil_testing == b.stencil_testing,
            StateField::Wireframe => a.wireframe == b.wireframe,
            StateField::LineSmooth => a.line_smoothing == b.line_smoothing,
            StateField::Multisample => a.multisampling == b.multisampling,
            StateField::LineWidth => a.line_width == b.line_width,
            StateField::Cull => a.cull_mode == b.cull_mode,
            StateField::Blend => a.src_factor == b.src_factor && a.dst_factor == b.dst_factor,
            StateField::DepthFunction => a.depth_function == b.depth_function,
            StateField::StencilFunction => {
                a.stencil_function == b.stencil_function
                    && a.stencil_ref == b.stencil_ref
                    && a.stencil_mask == b.stencil_mask
            }
            StateField::StencilOperations => {
                a.stencil_fail_op == b.stencil_fail_op
                    && a.depth_fail_op == b.depth_fail_op
                    && a.depth_pass_op == b.depth_pass_op
            }
        }
    }

    /// Human-readable value of this field in `state`, for diagnostics.
    pub fn describe(self, state: &RenderState) -> String {
        match self {
            StateField::DepthTest => format!("depth test = {}", state.depth_testing),
            StateField::DepthWrite => format!("depth write = {}", state.depth_writing),
            StateField::ColorWrite => format!("color write = {}", state.color_writing),
            StateField::StencilTest => format!("stencil test = {}", state.stencil_testing),
            StateField::Wireframe => format!("wireframe = {}", state.wireframe),
            StateField::LineSmooth => format!("line smoothing = {}", state.line_smoothing),
            StateField::Multisample => format!("multisampling = {}", state.multisampling),
            StateField::LineWidth => format!("line width = {}", state.line_width),
            StateField::Cull => format!("cull mode = {}", state.cull_mode),
            StateField::Blend => format!("blend = {}/{}", state.src_factor, state.dst_factor),
            StateField::DepthFunction => format!("depth function = {}", state.depth_function),
            StateField::StencilFunction => format!(
                "stencil function = {} ref {} mask {:#x}",
                state.stencil_function, state.stencil_ref, state.stencil_mask
            ),
            StateField::StencilOperations => format!(
                "stencil ops = {}/{}/{}",
                state.stencil_fail_op, state.depth_fail_op, state.depth_pass_op
            ),
        }
    }
}
