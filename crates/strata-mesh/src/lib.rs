//! Greedy meshing of voxel chunks into packed quad instances.

pub mod chunk_mesh;
pub mod greedy;
pub mod invalidation;
pub mod neighborhood;
pub mod quad;

pub use chunk_mesh::ChunkMesh;
pub use greedy::greedy_mesh;
pub use invalidation::{ChunkMeshState, MeshInvalidator};
pub use neighborhood::MeshNeighborhood;
pub use quad::{Quad, QuadInstance};
pub use strata_voxel::FaceDirection;
