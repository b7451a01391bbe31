//! Ordered locking of a chunk and its neighbors for one meshing pass.
//!
//! Every multi-chunk reader locks its participants in ascending
//! [`ChunkCoord`] order, so two overlapping passes can never wait on each
//! other in a cycle. Writers only ever hold one chunk lock at a time.

use std::sync::{Mutex, MutexGuard, PoisonError};

use strata_mesh::{ChunkMesh, MeshNeighborhood, greedy_mesh};
use strata_voxel::{BlockRegistry, ChunkCoord, VoxelChunk};

use crate::store::ChunkStore;

/// Locks one chunk, recovering the data if a previous holder panicked.
pub fn lock_chunk(chunk: &Mutex<VoxelChunk>) -> MutexGuard<'_, VoxelChunk> {
    chunk.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Meshes the chunk at `coord` while holding the locks of it and all of
/// its live neighbors.
///
/// Returns `None` if the chunk is no longer stored.
pub fn mesh_with_neighbors(
    store: &ChunkStore,
    coord: ChunkCoord,
    registry: &BlockRegistry,
) -> Option<ChunkMesh> {
    let participants = store.participants(coord)?;
    let guards: Vec<_> = participants
        .iter()
        .map(|(_, _, chunk)| lock_chunk(chunk))
        .collect();

    let mut center = None;
    let mut neighbors = [None; 6];
    for ((_, direction, _), guard) in participants.iter().zip(&guards) {
        let chunk: &VoxelChunk = guard;
        match direction {
            None => center = Some(chunk),
            Some(d) => neighbors[d.index()] = Some(chunk),
        }
    }

    let hood = MeshNeighborhood::new(center?, neighbors);
    Some(greedy_mesh(&hood, registry))
}
