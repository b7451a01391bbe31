//! World context: chunk storage, terrain generation, background generation
//! and meshing, and arena uploads driven once per frame.

mod error;
mod locking;
mod store;

pub mod generation;
pub mod pool;
pub mod world;

pub use error::WorldError;
pub use generation::{FlatGenerator, Generator, HeightmapGenerator, HeightmapParams, generate_chunk};
pub use locking::{lock_chunk, mesh_with_neighbors};
pub use pool::{Job, JobContext, JobResult, WorkerPool};
pub use store::{ChunkStore, SharedChunk};
pub use world::{FrameReport, MeshArena, StreamDelta, World, WorldSettings, WorldStats};
