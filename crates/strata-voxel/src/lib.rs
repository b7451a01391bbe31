//! Voxel storage with palette compression, block types, face directions, and chunk adjacency.

pub mod bit_packed;
pub mod chunk;
pub mod coords;
pub mod face_direction;
pub mod neighbor_graph;
pub mod registry;

pub use bit_packed::BitPackedArray;
pub use chunk::{ChunkError, DEFAULT_CHUNK_EDGE, MAX_CHUNK_EDGE, VoxelChunk, bits_for_palette_len};
pub use coords::ChunkCoord;
pub use face_direction::FaceDirection;
pub use neighbor_graph::{GraphError, NeighborGraph, NeighborSlots};
pub use registry::{
    BEDROCK, BlockId, BlockRegistry, BlockTypeDef, DIRT, FaceTextures, GRASS, LOG, OAK_LEAVES,
    RegistryError, SAND, STONE,
};
