//! Marduk render context crate.
//!
//! This crate owns the device-facing state cache used by higher layers:
//! pipeline state diffing, binding slots, the shared uniform/sampler
//! registry and frame statistics.

#[macro_use]
mod macros;

pub mod context;
pub mod device;
pub mod error;
pub mod resource;
pub mod shared;
pub mod state;
pub mod stats;
pub mod time;

pub mod coords;
pub mod logging;

pub use context::{Context, ContextConfig};
pub use error::{BindingError, ConfigError, ContextError, DeviceError, Result};
