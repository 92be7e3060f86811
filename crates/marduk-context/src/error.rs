//! Error types for the render context.
//!
//! Three families, matching how callers are expected to react:
//! - [`ConfigError`]: the request itself is malformed; surfaced at the call, no state touched.
//! - [`DeviceError`]: the backend rejected a call; logged and counted by the context.
//! - [`BindingError`]: a resource cannot be bound or drawn right now; nothing is applied.

use thiserror::Error;

use crate::device::RawHandle;
use crate::resource::ResourceKind;
use crate::shared::SharedKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("shared {kind} `{name}` is registered as {registered}, not {requested}")]
    SharedTypeMismatch {
        kind: SharedKind,
        name: String,
        registered: &'static str,
        requested: &'static str,
    },

    #[error("invalid {kind} value `{value}`")]
    InvalidEnumValue { kind: &'static str, value: String },

    #[error("line width must be positive and finite, got {0}")]
    InvalidLineWidth(f32),

    #[error("{kind} of size {size} exceeds the device limit of {max}")]
    TextureTooLarge {
        kind: &'static str,
        size: u32,
        max: u32,
    },

    #[error("{0} must have a non-zero size")]
    EmptyResource(ResourceKind),

    #[error("program `{program}` declares no uniform named `{name}`")]
    UnknownUniform { program: String, name: String },

    #[error("uniform `{name}` is declared as {declared}, got a {given} value")]
    UniformTypeMismatch {
        name: String,
        declared: &'static str,
        given: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("device rejected {call}: {detail}")]
    Rejected { call: &'static str, detail: String },

    #[error("{call} is not supported by this backend: {detail}")]
    Unsupported { call: &'static str, detail: String },

    #[error("unknown device handle {0}")]
    InvalidHandle(RawHandle),

    #[error("device is out of resources")]
    OutOfResources,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("{0} has been destroyed")]
    Destroyed(ResourceKind),

    #[error("texture unit {unit} is out of range (device exposes {count})")]
    TextureUnitOutOfRange { unit: usize, count: usize },

    #[error("no program is bound")]
    NoProgram,

    #[error("no vertex buffer is bound")]
    NoVertexBuffer,

    #[error("range {start}..{end} exceeds {available} elements")]
    RangeOutOfBounds { start: u32, end: u64, available: u32 },
}

/// Umbrella error for fallible context operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

pub type Result<T, E = ContextError> = std::result::Result<T, E>;

/// Result type returned by [`DeviceBackend`](crate::device::DeviceBackend) calls.
pub type DeviceResult<T = ()> = std::result::Result<T, DeviceError>;
