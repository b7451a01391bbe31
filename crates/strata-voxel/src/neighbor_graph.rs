//! Six-directional adjacency between live chunks.
//!
//! Edges are non-owning: the graph stores [`ChunkCoord`] keys, never chunk
//! data. Every mutation updates both endpoints, so `a → b` along `d` exists
//! exactly when `b → a` along `d.opposite()` does.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::coords::ChunkCoord;
use crate::face_direction::FaceDirection;

/// Per-node neighbor slots, indexed by [`FaceDirection`] discriminant.
pub type NeighborSlots = [Option<ChunkCoord>; 6];

/// Errors returned when wiring the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The two chunks do not share the face named by `direction`.
    #[error("chunk {to} is not the {direction:?} neighbor of {from}")]
    NotAdjacent {
        /// Chunk being wired.
        from: ChunkCoord,
        /// Requested direction.
        direction: FaceDirection,
        /// Proposed neighbor.
        to: ChunkCoord,
    },
}

/// Symmetric adjacency between live chunks.
#[derive(Debug, Default)]
pub struct NeighborGraph {
    links: FxHashMap<ChunkCoord, NeighborSlots>,
}

impl NeighborGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects `chunk → neighbor` along `direction` and `neighbor → chunk`
    /// along the opposite direction.
    ///
    /// Any partner previously held in either slot is disconnected first so
    /// the relation stays symmetric.
    pub fn add_neighbor(
        &mut self,
        chunk: ChunkCoord,
        direction: FaceDirection,
        neighbor: ChunkCoord,
    ) -> Result<(), GraphError> {
        if chunk.neighbor(direction) != neighbor {
            return Err(GraphError::NotAdjacent {
                from: chunk,
                direction,
                to: neighbor,
            });
        }
        self.remove_neighbor(chunk, direction);
        self.remove_neighbor(neighbor, direction.opposite());

        self.slots_mut(chunk)[direction.index()] = Some(neighbor);
        self.slots_mut(neighbor)[direction.opposite().index()] = Some(chunk);
        Ok(())
    }

    /// Disconnects `chunk` from its neighbor along `direction` (both ways).
    ///
    /// Returns the former neighbor, if any.
    pub fn remove_neighbor(
        &mut self,
        chunk: ChunkCoord,
        direction: FaceDirection,
    ) -> Option<ChunkCoord> {
        let former = self.links.get_mut(&chunk)?[direction.index()].take()?;
        if let Some(slots) = self.links.get_mut(&former) {
            slots[direction.opposite().index()] = None;
        }
        Some(former)
    }

    /// Returns the neighbor of `chunk` along `direction`.
    pub fn neighbor(&self, chunk: ChunkCoord, direction: FaceDirection) -> Option<ChunkCoord> {
        self.links.get(&chunk)?[direction.index()]
    }

    /// Returns all six neighbor slots of `chunk` (all `None` if unknown).
    pub fn neighbors(&self, chunk: ChunkCoord) -> NeighborSlots {
        self.links.get(&chunk).copied().unwrap_or_default()
    }

    /// Adds `chunk` as a node and wires it to every adjacent chunk for which
    /// `is_live` returns `true`.
    ///
    /// Returns the chunks it was connected to.
    pub fn attach(
        &mut self,
        chunk: ChunkCoord,
        is_live: impl Fn(ChunkCoord) -> bool,
    ) -> Vec<ChunkCoord> {
        self.slots_mut(chunk);
        let mut connected = Vec::new();
        for direction in FaceDirection::ALL {
            let other = chunk.neighbor(direction);
            if is_live(other) {
                self.slots_mut(chunk)[direction.index()] = Some(other);
                self.slots_mut(other)[direction.opposite().index()] = Some(chunk);
                connected.push(other);
            }
        }
        connected
    }

    /// Removes `chunk` and every edge touching it.
    ///
    /// Returns the chunks it was connected to.
    pub fn detach(&mut self, chunk: ChunkCoord) -> Vec<ChunkCoord> {
        let Some(slots) = self.links.remove(&chunk) else {
            return Vec::new();
        };
        let mut former = Vec::new();
        for direction in FaceDirection::ALL {
            if let Some(other) = slots[direction.index()] {
                if let Some(other_slots) = self.links.get_mut(&other) {
                    other_slots[direction.opposite().index()] = None;
                }
                former.push(other);
            }
        }
        former
    }

    /// Returns `true` if `chunk` is a node of the graph.
    pub fn contains(&self, chunk: ChunkCoord) -> bool {
        self.links.contains_key(&chunk)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Checks that every edge has its mirror.
    pub fn is_symmetric(&self) -> bool {
        self.links.iter().all(|(&chunk, slots)| {
            FaceDirection::ALL.into_iter().all(|direction| match slots[direction.index()] {
                Some(other) => self.neighbor(other, direction.opposite()) == Some(chunk),
                None => true,
            })
        })
    }

    fn slots_mut(&mut self, chunk: ChunkCoord) -> &mut NeighborSlots {
        self.links.entry(chunk).or_default()
    }
}
