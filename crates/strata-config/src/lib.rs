//! Runtime configuration persisted to disk as RON, with clap CLI overrides
//! and hot-reload detection.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{ArenaConfig, Config, DebugConfig, TerrainConfig, WorldConfig};
pub use error::ConfigError;
