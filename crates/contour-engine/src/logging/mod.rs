//! Logging utilities.
//!
//! Renderer code only talks to the `log` facade; binaries and tools call
//! [`init_logging`] once to install `env_logger`.

mod init;

pub use init::{init_logging, LoggingConfig};