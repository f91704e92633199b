//! Shared plumbing for the provisioner binaries.

pub mod logging;

pub use logging::{init_logging, LogFormat};
