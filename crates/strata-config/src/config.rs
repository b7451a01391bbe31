//! World, arena, terrain and logging settings, persisted as `config.ron`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Directory name under the platform config directory.
const APP_DIR: &str = "strata";

/// File name of the persisted configuration.
const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Chunk and worker settings.
    pub world: WorldConfig,
    /// Mesh buffer arena settings.
    pub arena: ArenaConfig,
    /// Terrain generation settings.
    pub terrain: TerrainConfig,
    /// Logging settings.
    pub debug: DebugConfig,
}

/// Chunk streaming and worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Voxels along each chunk edge (1..=64).
    pub chunk_edge: usize,
    /// Worker threads for generation and meshing (0 = one per logical CPU).
    pub worker_threads: usize,
    /// Maximum queued jobs before submissions are refused.
    pub job_queue_capacity: usize,
    /// Mesh uploads applied to the arena per `update` call.
    pub uploads_per_frame: usize,
    /// Radius, in chunks, of the cube streamed around the viewer.
    pub view_radius: i32,
}

/// Mesh buffer arena configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    /// Bytes reserved up front.
    pub initial_capacity_bytes: usize,
    /// Hard ceiling for growth (`None` = unbounded).
    pub max_capacity_bytes: Option<usize>,
    /// Fragmentation ratio above which the arena is defragmented.
    pub defragment_threshold: f32,
}

/// Heightmap terrain configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Noise seed.
    pub seed: u32,
    /// Mean surface height in voxels.
    pub base_height: i32,
    /// Maximum deviation from `base_height`.
    pub amplitude: f64,
    /// Horizontal noise frequency.
    pub frequency: f64,
    /// Depth of the grass + dirt cap above stone.
    pub dirt_depth: i32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_edge: 32,
            worker_threads: 0,
            job_queue_capacity: 256,
            uploads_per_frame: 10,
            view_radius: 2,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_capacity_bytes: 1 << 20,
            max_capacity_bytes: None,
            defragment_threshold: 0.5,
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 154_555_112,
            base_height: 10,
            amplitude: 25.0,
            frequency: 0.006,
            dirt_depth: 8,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

impl Config {
    /// Platform config directory for this application, if the OS exposes one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR))
    }

    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .map_err(ConfigError::read(&config_path))?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Config read from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Default config written to {}", config_path.display());
            Ok(config)
        }
    }

    /// Writes `config.ron` into `config_dir`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::write(config_dir))?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        std::fs::write(&config_path, serialized).map_err(ConfigError::write(&config_path))?;
        Ok(())
    }

    /// Re-reads `config.ron` and returns the new settings if they differ
    /// from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents =
            std::fs::read_to_string(&config_path).map_err(ConfigError::read(&config_path))?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config file changed on disk");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
