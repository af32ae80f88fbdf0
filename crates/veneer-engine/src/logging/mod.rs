//! Logging setup.
//!
//! Every module logs through the `log` facade; this is the one place that
//! installs a backend (`env_logger`) for hosts that do not bring their own.

mod init;

pub use init::{init_logging, LoggingConfig};
