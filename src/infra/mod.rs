//! Infrastructure: error taxonomy and configuration management.

pub mod config;
pub mod error;

pub use config::{BatchConfiguration, ConfigManager, DEFAULT_TIMESTAMP_SERVERS};
pub use error::{SignError, SignResult};
