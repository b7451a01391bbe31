//! Concurrent chunk storage plus the adjacency graph over it.
//!
//! Chunk data lives behind one mutex per chunk so workers can mesh
//! different chunks in parallel. The map itself is a [`DashMap`]; callers
//! clone the `Arc` out and drop the map guard before locking a chunk.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use dashmap::DashMap;
use strata_voxel::{ChunkCoord, FaceDirection, NeighborGraph, NeighborSlots, VoxelChunk};

/// A chunk shared between the owner and worker threads.
pub type SharedChunk = Arc<Mutex<VoxelChunk>>;

/// All live chunks and their neighbor links.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: DashMap<ChunkCoord, SharedChunk>,
    graph: RwLock<NeighborGraph>,
}

impl ChunkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `chunk` at `coord` and links it to every live neighbor.
    ///
    /// Returns the neighbors it was linked to. A chunk already stored at
    /// `coord` is replaced.
    pub fn insert(&self, coord: ChunkCoord, chunk: VoxelChunk) -> Vec<ChunkCoord> {
        self.chunks.insert(coord, Arc::new(Mutex::new(chunk)));
        let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
        graph.detach(coord);
        graph.attach(coord, |other| self.chunks.contains_key(&other))
    }

    /// Removes the chunk at `coord` and every edge touching it.
    ///
    /// Returns the chunk and its former neighbors.
    pub fn remove(&self, coord: ChunkCoord) -> Option<(SharedChunk, Vec<ChunkCoord>)> {
        let former = self
            .graph
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .detach(coord);
        let (_, chunk) = self.chunks.remove(&coord)?;
        Some((chunk, former))
    }

    /// The chunk at `coord`.
    pub fn get(&self, coord: ChunkCoord) -> Option<SharedChunk> {
        self.chunks.get(&coord).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if a chunk is stored at `coord`.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if no chunk is stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Coordinates of every stored chunk, in no particular order.
    pub fn coords(&self) -> Vec<ChunkCoord> {
        self.chunks.iter().map(|entry| *entry.key()).collect()
    }

    /// Neighbor slots of `coord`.
    pub fn neighbors(&self, coord: ChunkCoord) -> NeighborSlots {
        self.graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .neighbors(coord)
    }

    /// The chunk at `coord` plus each linked neighbor, tagged with the
    /// direction it lies in (`None` for the center).
    ///
    /// The result is sorted by coordinate, which is the order locks must
    /// be taken in.
    pub fn participants(
        &self,
        coord: ChunkCoord,
    ) -> Option<Vec<(ChunkCoord, Option<FaceDirection>, SharedChunk)>> {
        let center = self.get(coord)?;
        let slots = self.neighbors(coord);

        let mut participants = vec![(coord, None, center)];
        for direction in FaceDirection::ALL {
            if let Some(other) = slots[direction.index()]
                && let Some(chunk) = self.get(other)
            {
                participants.push((other, Some(direction), chunk));
            }
        }
        participants.sort_unstable_by_key(|(c, _, _)| *c);
        Some(participants)
    }

    /// Checks graph symmetry and that every node is a stored chunk.
    pub fn is_consistent(&self) -> bool {
        let graph = self.graph.read().unwrap_or_else(PoisonError::into_inner);
        graph.is_symmetric()
            && graph.len() == self.chunks.len()
            && self.chunks.iter().all(|entry| graph.contains(*entry.key()))
    }
}

#[cfg(test)]
mod tests {
    use strata_voxel::STONE;

    use super::*;

    fn chunk() -> VoxelChunk {
        VoxelChunk::with_fill(2, STONE).unwrap()
    }

    #[test]
    fn test_insert_links_live_neighbors() {
        let store = ChunkStore::new();
        let origin = ChunkCoord::new(0, 0, 0);
        assert!(store.insert(origin, chunk()).is_empty());
        let linked = store.insert(origin.neighbor(FaceDirection::PosY), chunk());
        assert_eq!(linked, vec![origin]);
        assert_eq!(
            store.neighbors(origin)[FaceDirection::PosY.index()],
            Some(ChunkCoord::new(0, 1, 0))
        );
        assert!(store.is_consistent());
    }

    #[test]
    fn test_remove_unlinks() {
        let store = ChunkStore::new();
        let a = ChunkCoord::new(0, 0, 0);
        let b = ChunkCoord::new(0, 0, 1);
        store.insert(a, chunk());
        store.insert(b, chunk());

        let (_, former) = store.remove(a).unwrap();
        assert_eq!(former, vec![b]);
        assert!(store.neighbors(b).iter().all(Option::is_none));
        assert!(store.remove(a).is_none());
        assert!(store.is_consistent());
    }

    #[test]
    fn test_reinsert_keeps_graph_consistent() {
        let store = ChunkStore::new();
        let a = ChunkCoord::new(0, 0, 0);
        store.insert(a, chunk());
        store.insert(ChunkCoord::new(1, 0, 0), chunk());
        store.insert(a, chunk());
        assert_eq!(store.len(), 2);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_participants_sorted_and_tagged() {
        let store = ChunkStore::new();
        let center = ChunkCoord::new(0, 0, 0);
        for coord in [
            center,
            ChunkCoord::new(1, 0, 0),
            ChunkCoord::new(-1, 0, 0),
            ChunkCoord::new(0, 0, -1),
        ] {
            store.insert(coord, chunk());
        }

        let participants = store.participants(center).unwrap();
        let coords: Vec<_> = participants.iter().map(|(c, _, _)| *c).collect();
        let mut sorted = coords.clone();
        sorted.sort();
        assert_eq!(coords, sorted);
        assert_eq!(participants.len(), 4);
        for (coord, direction, _) in &participants {
            match direction {
                None => assert_eq!(*coord, center),
                Some(d) => assert_eq!(center.neighbor(*d), *coord),
            }
        }
        assert!(store.participants(ChunkCoord::new(9, 9, 9)).is_none());
    }
}
