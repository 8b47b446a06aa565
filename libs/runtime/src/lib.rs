//! Process runtime for the student portal server: layered configuration,
//! home directory resolution and logging bootstrap.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, CliArgs, LoggingConfig, Section, ServerConfig, StoreConfig,
};
