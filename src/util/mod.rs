//! Utility modules for repo-spider

pub mod logging;

pub use logging::{init_from_env, init_logging, LoggingConfig};
