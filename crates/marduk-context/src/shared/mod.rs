//! Shared program state.
//!
//! Programs that declare a uniform or sampler whose name and type match a
//! registered [`SharedSignature`] receive its value from the active
//! [`SharedProgramState`] provider whenever they are used for drawing.

mod provider;
mod registry;
mod types;

pub use provider::{SharedProgramState, SharedValues};
pub use registry::{SharedRegistry, SharedSignature, SignatureType};
pub use types::{SamplerType, SharedId, SharedKind, UniformType, UniformValue};
