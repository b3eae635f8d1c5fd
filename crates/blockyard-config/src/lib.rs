//! Configuration system for the Blockyard server.
//!
//! Settings persist to disk as a RON file, can be overridden from the
//! command line via clap, and tolerate missing or unknown fields so older
//! and newer config files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, ServerConfig, SimulationConfig, WorldConfig, default_config_dir,
};
pub use error::ConfigError;
