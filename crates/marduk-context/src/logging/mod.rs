//! Logger setup.
//!
//! The library only emits through the `log` facade; binaries and tests pick
//! the backend. This module installs `env_logger` for the ones that want it.

mod init;

pub use init::{LoggingConfig, init_logging};
