//! Declarative pipeline state.
//!
//! A [`RenderState`] carries intent only (no GPU handles). The context diffs it
//! field-group by field-group ([`StateField`]) against what it last applied.

mod render_state;
mod types;

pub use render_state::{RenderState, StateField};
pub use types::{BlendFactor, CompareFunction, CullMode, IndexType, PrimitiveType, StencilOp};
