//! Mesh output of one greedy meshing pass.

use strata_voxel::FaceDirection;

use crate::quad::{Quad, QuadInstance};

/// The merged quads covering every exposed face of one chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkMesh {
    /// Quads in emission order (by direction, then scan order).
    pub quads: Vec<Quad>,
}

impl ChunkMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self { quads: Vec::new() }
    }

    /// Appends a quad.
    pub fn push(&mut self, quad: Quad) {
        self.quads.push(quad);
    }

    /// Count quads facing a specific direction.
    pub fn count_quads_for_direction(&self, direction: FaceDirection) -> usize {
        self.quads.iter().filter(|q| q.direction == direction).count()
    }

    /// Total number of quads.
    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    /// Returns `true` if nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Total unit faces covered by all quads.
    pub fn covered_faces(&self) -> usize {
        self.quads.iter().map(Quad::area).sum()
    }

    /// Packs every quad into its instance record.
    pub fn instances(&self) -> Vec<QuadInstance> {
        self.quads.iter().map(QuadInstance::encode).collect()
    }

    /// The opaque byte payload handed to the buffer arena.
    pub fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.instances()).to_vec()
    }
}
