//! Headless demo: streams heightmap terrain around the origin, meshes it on
//! the worker pool and packs the meshes into the arena.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p strata-demo -- --view-radius 3 --seed 7`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use strata_arena::{ArenaError, BufferArena};
use strata_config::{CliArgs, Config};
use strata_mesh::{MeshNeighborhood, QuadInstance, greedy_mesh};
use strata_voxel::{BlockId, BlockRegistry, ChunkCoord, ChunkError, DIRT, GRASS, STONE, VoxelChunk};
use strata_world::{HeightmapGenerator, HeightmapParams, World, WorldError};
use tracing::{error, info, warn};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

fn demonstrate_palette_chunk() -> Result<(), ChunkError> {
    let mut chunk = VoxelChunk::new(32)?;
    info!("Palette chunk: uniform air uses {} bytes", chunk.storage_bytes());

    for x in 0..32 {
        for z in 0..32 {
            chunk.set_block(x, 0, z, STONE)?;
            chunk.set_block(x, 1, z, DIRT)?;
        }
    }
    chunk.set_block(5, 2, 5, GRASS)?;
    info!(
        "Palette chunk: 4 block types at {} bits per voxel, {} bytes",
        chunk.bits_per_voxel(),
        chunk.storage_bytes()
    );

    chunk.fill_uniform(STONE);
    chunk.compact();
    info!(
        "Palette chunk: refilled with stone, uniform={}, {} bytes",
        chunk.is_uniform(),
        chunk.storage_bytes()
    );
    Ok(())
}

fn demonstrate_greedy_mesh(registry: &BlockRegistry) -> Result<(), ChunkError> {
    let mut chunk = VoxelChunk::new(16)?;
    for x in 0..16 {
        for z in 0..16 {
            for y in 0..4 {
                chunk.set_block(x, y, z, if y == 3 { GRASS } else { STONE })?;
            }
        }
    }

    let hood = MeshNeighborhood::isolated(&chunk);
    let mesh = greedy_mesh(&hood, registry);
    info!(
        "Greedy mesh: {} exposed faces merged into {} quads ({} bytes)",
        hood.exposed_face_count(),
        mesh.quad_count(),
        mesh.quad_count() * QuadInstance::STRIDE
    );
    Ok(())
}

fn demonstrate_arena() -> Result<(), ArenaError> {
    let mut arena: BufferArena<u32> = BufferArena::with_capacity(64);
    arena.add_data(0, &[1; 24])?;
    arena.add_data(1, &[2; 16])?;
    arena.add_data(2, &[3; 24])?;
    arena.remove_data(1)?;
    info!(
        "Arena: {} live bytes, fragmentation {:.2}",
        arena.live_bytes(),
        arena.fragmentation()
    );
    arena.add_data(3, &[4; 40])?;
    info!("Arena: grew to {} bytes for a 40 byte payload", arena.capacity());
    arena.defragment();
    info!(
        "Arena: defragmented, largest free run {} bytes",
        arena.largest_free_run()
    );
    Ok(())
}

/// Runs `update` until the world has nothing left to do.
fn settle(world: &mut World) -> Result<usize, WorldError> {
    let start = Instant::now();
    let mut frames = 0;
    loop {
        world.update()?;
        frames += 1;
        if world.is_idle() {
            return Ok(frames);
        }
        if start.elapsed() > SETTLE_TIMEOUT {
            warn!("World did not settle within {:?}", SETTLE_TIMEOUT);
            return Ok(frames);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn run_world(config: &Config) -> Result<(), WorldError> {
    let generator = Arc::new(HeightmapGenerator::new(HeightmapParams::from(&config.terrain)));
    let mut world = World::new(config, generator.clone())?;

    let radius = config.world.view_radius;
    let start = Instant::now();
    let delta = world.stream_around(ChunkCoord::new(0, 0, 0), radius)?;
    let frames = settle(&mut world)?;
    let stats = world.stats();
    info!(
        "Streamed {} chunks in {} frames ({:.1?}): {} meshed, arena {} / {} bytes",
        delta.requested,
        frames,
        start.elapsed(),
        stats.meshed_chunks,
        stats.arena_live_bytes,
        stats.arena_capacity
    );

    // Dig through the surface block above the origin column.
    let surface = generator.surface_height(0, 0) - 1;
    match world.set_block(0, surface, 0, BlockId::AIR) {
        Ok(()) => {
            let frames = settle(&mut world)?;
            info!("Removed block at (0, {surface}, 0); remeshed in {frames} frames");
        }
        Err(WorldError::NotLoaded(coord)) => {
            warn!("Surface chunk {coord} is outside the view radius");
        }
        Err(e) => return Err(e),
    }

    let commands = world.draw_commands();
    let instances: u32 = commands.iter().map(|c| c.instance_count).sum();
    let stats = world.stats();
    info!(
        "Draw list: {} indirect draws, {} quad instances, fragmentation {:.2}",
        commands.len(),
        instances,
        stats.arena_fragmentation
    );

    world.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    if let Err(e) =
        strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config))
    {
        eprintln!("Failed to initialize logging: {e}");
    }
    info!("Config directory: {}", config_dir.display());

    let registry = BlockRegistry::with_defaults();
    if let Err(e) = demonstrate_palette_chunk() {
        warn!("Palette chunk demo failed: {e}");
    }
    if let Err(e) = demonstrate_greedy_mesh(&registry) {
        warn!("Greedy mesh demo failed: {e}");
    }
    if let Err(e) = demonstrate_arena() {
        warn!("Arena demo failed: {e}");
    }

    if let Err(e) = run_world(&config) {
        error!("World demo failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
