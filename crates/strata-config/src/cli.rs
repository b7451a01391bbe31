//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments for the strata tools.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Voxel chunk streaming, meshing and buffer packing")]
pub struct CliArgs {
    /// Voxels along each chunk edge.
    #[arg(long)]
    pub chunk_edge: Option<usize>,

    /// Worker threads (0 = one per logical CPU).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Radius, in chunks, streamed around the origin.
    #[arg(long)]
    pub view_radius: Option<i32>,

    /// Terrain noise seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(edge) = args.chunk_edge {
            self.world.chunk_edge = edge;
        }
        if let Some(workers) = args.workers {
            self.world.worker_threads = workers;
        }
        if let Some(radius) = args.view_radius {
            self.world.view_radius = radius;
        }
        if let Some(seed) = args.seed {
            self.terrain.seed = seed;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs::parse_from(["strata", "--chunk-edge", "16", "--seed", "7"]);
        config.apply_cli_overrides(&args);
        assert_eq!(config.world.chunk_edge, 16);
        assert_eq!(config.terrain.seed, 7);
        // Non-overridden fields retain defaults
        assert_eq!(config.world.view_radius, 2);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_config_dir_and_log_level() {
        let args = CliArgs::parse_from([
            "strata",
            "--config",
            "/tmp/strata",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/strata")));
        let mut config = Config::default();
        config.apply_cli_overrides(&args);
        assert_eq!(config.debug.log_level, "debug");
    }
}
