//! Free-list byte arena that packs many chunk mesh payloads into one buffer.

pub mod arena;
pub mod snapshot;
pub mod store;

pub use arena::{ArenaError, BufferArena};
pub use snapshot::{ArenaSnapshot, DrawIndirectCommand, Placement, QUAD_TEMPLATE_VERTICES};
pub use store::{BackingStore, StoreError, VecStore};
