//! Read-only view of a chunk and its up-to-six face neighbors.
//!
//! [`MeshNeighborhood`] borrows chunk data for the duration of one meshing
//! pass. The caller is responsible for holding whatever locks guard that
//! data; the view itself never locks.

use strata_voxel::{FaceDirection, VoxelChunk};

/// A center chunk plus the face neighbors that are currently loaded.
#[derive(Clone, Copy, Debug)]
pub struct MeshNeighborhood<'a> {
    center: &'a VoxelChunk,
    neighbors: [Option<&'a VoxelChunk>; 6],
}

impl<'a> MeshNeighborhood<'a> {
    /// A neighborhood with no loaded neighbors.
    pub fn isolated(center: &'a VoxelChunk) -> Self {
        Self {
            center,
            neighbors: [None; 6],
        }
    }

    /// A neighborhood from explicit neighbor slots, indexed by [`FaceDirection`].
    ///
    /// # Panics
    ///
    /// Every neighbor must share the center's edge length. Debug builds
    /// assert this; release builds panic on the first out-of-range read.
    pub fn new(center: &'a VoxelChunk, neighbors: [Option<&'a VoxelChunk>; 6]) -> Self {
        debug_assert!(
            neighbors.iter().flatten().all(|n| n.edge() == center.edge()),
            "neighbor edge differs from center edge {}",
            center.edge()
        );
        Self { center, neighbors }
    }

    /// Returns the neighborhood with `chunk` installed along `direction`.
    ///
    /// # Panics
    ///
    /// Same edge requirement as [`MeshNeighborhood::new`].
    pub fn with_neighbor(mut self, direction: FaceDirection, chunk: &'a VoxelChunk) -> Self {
        debug_assert_eq!(
            chunk.edge(),
            self.center.edge(),
            "neighbor edge differs from center edge"
        );
        self.neighbors[direction.index()] = Some(chunk);
        self
    }

    /// The chunk being meshed.
    pub fn center(&self) -> &'a VoxelChunk {
        self.center
    }

    /// The neighbor along `direction`, if loaded.
    pub fn neighbor(&self, direction: FaceDirection) -> Option<&'a VoxelChunk> {
        self.neighbors[direction.index()]
    }

    /// Whether the face of voxel `(x, y, z)` pointing along `direction` borders
    /// empty space.
    ///
    /// Inside the chunk the adjacent voxel decides. Across the boundary the
    /// coordinate wraps into the neighbor's local space; a missing neighbor
    /// counts as open and the face is visible.
    pub fn is_face_exposed(&self, x: usize, y: usize, z: usize, direction: FaceDirection) -> bool {
        let edge = self.center.edge() as i32;
        let (nx, ny, nz) = direction.offset(x as i32, y as i32, z as i32);

        if (0..edge).contains(&nx) && (0..edge).contains(&ny) && (0..edge).contains(&nz) {
            let index = self.center.linear_index(nx as usize, ny as usize, nz as usize);
            return self.center.block_at_index(index).is_air();
        }

        match self.neighbors[direction.index()] {
            None => true,
            Some(neighbor) => {
                let ne = neighbor.edge() as i32;
                let index = neighbor.linear_index(
                    nx.rem_euclid(ne) as usize,
                    ny.rem_euclid(ne) as usize,
                    nz.rem_euclid(ne) as usize,
                );
                neighbor.block_at_index(index).is_air()
            }
        }
    }

    /// Whether `(x, y, z)` is solid and its face along `direction` is exposed.
    pub fn is_render_candidate(
        &self,
        x: usize,
        y: usize,
        z: usize,
        direction: FaceDirection,
    ) -> bool {
        let index = self.center.linear_index(x, y, z);
        !self.center.block_at_index(index).is_air() && self.is_face_exposed(x, y, z, direction)
    }

    /// Counts every exposed unit face of the center chunk, without merging.
    pub fn exposed_face_count(&self) -> usize {
        let edge = self.center.edge();
        let mut count = 0;
        for z in 0..edge {
            for y in 0..edge {
                for x in 0..edge {
                    for direction in FaceDirection::ALL {
                        if self.is_render_candidate(x, y, z, direction) {
                            count += 1;
                        }
                    }
                }
            }
        }
        count
    }
}
