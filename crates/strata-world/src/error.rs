//! Errors surfaced by the world context.

use strata_arena::ArenaError;
use strata_voxel::{ChunkCoord, ChunkError};
use thiserror::Error;

/// Errors returned by [`World`](crate::World) operations.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A chunk rejected a voxel access or construction.
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    /// The mesh arena failed; growth failures land here.
    #[error(transparent)]
    Arena(#[from] ArenaError),
    /// The chunk holding the requested position is not loaded.
    #[error("chunk {0} is not loaded")]
    NotLoaded(ChunkCoord),
    /// A chunk of the wrong size was offered to the world.
    #[error("chunk edge {found} does not match world edge {expected}")]
    EdgeMismatch {
        /// Edge length the world was built with.
        expected: usize,
        /// Edge length of the offered chunk.
        found: usize,
    },
    /// The configuration cannot drive a world.
    #[error("invalid world config: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
