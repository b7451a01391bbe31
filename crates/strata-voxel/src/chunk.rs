//! Palette-compressed storage for one cubic chunk of voxels.
//!
//! A chunk starts out uniform: a single [`BlockId`] with no palette and no
//! index array. The first write of a differing id materializes a palette
//! (index 0 is always air) and a [`BitPackedArray`] of palette indices.
//! The index width is `max(4, ceil(log2(palette_len)))` bits and grows,
//! with a full re-encode, whenever the palette outgrows it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bit_packed::BitPackedArray;
use crate::registry::BlockId;

/// Default side length of a chunk in voxels.
pub const DEFAULT_CHUNK_EDGE: usize = 32;

/// Largest supported side length. Encoded quads spend six bits per coordinate.
pub const MAX_CHUNK_EDGE: usize = 64;

/// Narrowest index width used once a chunk holds a palette.
pub const MIN_PALETTE_BITS: u8 = 4;

/// Errors returned by chunk construction and voxel access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// A local coordinate lies outside `[0, edge)`.
    #[error("voxel ({x}, {y}, {z}) is outside a chunk of edge {edge}")]
    OutOfRange {
        /// Requested x.
        x: usize,
        /// Requested y.
        y: usize,
        /// Requested z.
        z: usize,
        /// Edge length of the chunk.
        edge: usize,
    },
    /// The requested edge length is zero or larger than [`MAX_CHUNK_EDGE`].
    #[error("chunk edge {edge} must be in 1..={max}")]
    InvalidEdge {
        /// Requested edge length.
        edge: usize,
        /// Largest supported edge length.
        max: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Storage {
    /// Every voxel holds the same id.
    Uniform(BlockId),
    /// Distinct ids in first-use order plus one packed palette index per voxel.
    Paletted {
        palette: Vec<BlockId>,
        indices: BitPackedArray,
    },
}

/// Voxel storage for one `edge × edge × edge` chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelChunk {
    edge: usize,
    storage: Storage,
}

impl VoxelChunk {
    /// Creates an all-air chunk.
    pub fn new(edge: usize) -> Result<Self, ChunkError> {
        Self::with_fill(edge, BlockId::AIR)
    }

    /// Creates a chunk filled entirely with `fill`.
    ///
    /// The result is uniform: no palette or index array is allocated.
    pub fn with_fill(edge: usize, fill: BlockId) -> Result<Self, ChunkError> {
        if edge == 0 || edge > MAX_CHUNK_EDGE {
            return Err(ChunkError::InvalidEdge {
                edge,
                max: MAX_CHUNK_EDGE,
            });
        }
        Ok(Self {
            edge,
            storage: Storage::Uniform(fill),
        })
    }

    /// Side length in voxels.
    pub fn edge(&self) -> usize {
        self.edge
    }

    /// Total number of voxels (`edge³`).
    pub fn volume(&self) -> usize {
        self.edge * self.edge * self.edge
    }

    /// Returns the block at `(x, y, z)`.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> Result<BlockId, ChunkError> {
        let index = self.checked_index(x, y, z)?;
        Ok(self.block_at_index(index))
    }

    /// Returns the block at a linear index (`x + y·edge + z·edge²`).
    ///
    /// # Panics
    ///
    /// Panics if `index >= volume()`.
    pub fn block_at_index(&self, index: usize) -> BlockId {
        match &self.storage {
            Storage::Uniform(id) => {
                assert!(index < self.volume(), "voxel index {index} out of bounds");
                *id
            }
            Storage::Paletted { palette, indices } => palette[indices.get(index) as usize],
        }
    }

    /// Writes `id` at `(x, y, z)`.
    ///
    /// Writing the uniform id into a uniform chunk is a no-op. Any other write
    /// to a uniform chunk first materializes the palette.
    pub fn set_block(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        id: BlockId,
    ) -> Result<(), ChunkError> {
        let index = self.checked_index(x, y, z)?;

        if let Storage::Uniform(current) = self.storage {
            if current == id {
                return Ok(());
            }
            self.materialize(current);
        }

        if let Storage::Paletted { palette, indices } = &mut self.storage {
            let palette_index = match palette.iter().position(|&p| p == id) {
                Some(existing) => existing,
                None => {
                    palette.push(id);
                    let needed = bits_for_palette_len(palette.len());
                    if needed != indices.bits() {
                        tracing::trace!(
                            palette_len = palette.len(),
                            from = indices.bits(),
                            to = needed,
                            "widening chunk index array"
                        );
                        *indices = indices.with_bits(needed);
                    }
                    palette.len() - 1
                }
            };
            indices.set(index, palette_index as u32);
        }
        Ok(())
    }

    /// Resets every voxel to `id`, releasing any palette and index array.
    pub fn fill_uniform(&mut self, id: BlockId) {
        self.storage = Storage::Uniform(id);
    }

    /// Releases all storage and reverts to uniform air (used when a chunk is unloaded).
    pub fn clear(&mut self) {
        self.fill_uniform(BlockId::AIR);
    }

    /// Returns `true` if the chunk has no palette storage.
    pub fn is_uniform(&self) -> bool {
        matches!(self.storage, Storage::Uniform(_))
    }

    /// The single id of a uniform chunk, or `None` once a palette exists.
    pub fn uniform_id(&self) -> Option<BlockId> {
        match self.storage {
            Storage::Uniform(id) => Some(id),
            Storage::Paletted { .. } => None,
        }
    }

    /// The palette, or `None` while uniform.
    pub fn palette(&self) -> Option<&[BlockId]> {
        match &self.storage {
            Storage::Uniform(_) => None,
            Storage::Paletted { palette, .. } => Some(palette),
        }
    }

    /// Bits per packed index; 0 while uniform.
    pub fn bits_per_voxel(&self) -> u8 {
        match &self.storage {
            Storage::Uniform(_) => 0,
            Storage::Paletted { indices, .. } => indices.bits(),
        }
    }

    /// Number of `u64` words in the packed index array; 0 while uniform.
    pub fn word_count(&self) -> usize {
        match &self.storage {
            Storage::Uniform(_) => 0,
            Storage::Paletted { indices, .. } => indices.word_count(),
        }
    }

    /// Bytes used by the packed index array; 0 while uniform.
    pub fn storage_bytes(&self) -> usize {
        self.word_count() * 8
    }

    /// Drops palette entries no voxel references and narrows the index width.
    ///
    /// Collapses back to uniform when only one id remains. Air keeps index 0
    /// whenever the palette survives. This scans every voxel; chunks never
    /// compact on their own.
    pub fn compact(&mut self) {
        let Storage::Paletted { palette, indices } = &self.storage else {
            return;
        };

        let mut used = vec![false; palette.len()];
        for i in 0..indices.len() {
            used[indices.get(i) as usize] = true;
        }

        let used_count = used.iter().filter(|&&u| u).count();
        if used_count <= 1 {
            let single = used
                .iter()
                .position(|&u| u)
                .map(|i| palette[i])
                .unwrap_or(BlockId::AIR);
            self.storage = Storage::Uniform(single);
            return;
        }

        // Air stays at index 0 even if no voxel references it.
        used[0] = true;
        let mut old_to_new = vec![0u32; palette.len()];
        let mut new_palette = Vec::with_capacity(used_count + 1);
        for (old_index, &is_used) in used.iter().enumerate() {
            if is_used {
                old_to_new[old_index] = new_palette.len() as u32;
                new_palette.push(palette[old_index]);
            }
        }

        let mut new_indices =
            BitPackedArray::new(bits_for_palette_len(new_palette.len()), indices.len());
        for i in 0..indices.len() {
            new_indices.set(i, old_to_new[indices.get(i) as usize]);
        }

        self.storage = Storage::Paletted {
            palette: new_palette,
            indices: new_indices,
        };
    }

    /// Converts `(x, y, z)` to a linear index (x varies fastest).
    pub fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.edge + z * self.edge * self.edge
    }

    fn checked_index(&self, x: usize, y: usize, z: usize) -> Result<usize, ChunkError> {
        if x >= self.edge || y >= self.edge || z >= self.edge {
            return Err(ChunkError::OutOfRange {
                x,
                y,
                z,
                edge: self.edge,
            });
        }
        Ok(self.linear_index(x, y, z))
    }

    /// Switches a uniform chunk to palette storage: `{air, uniform}` at 4 bits,
    /// every voxel pointing at the old uniform id.
    fn materialize(&mut self, uniform: BlockId) {
        let mut palette = vec![BlockId::AIR];
        if !uniform.is_air() {
            palette.push(uniform);
        }
        let fill_index = (palette.len() - 1) as u32;
        self.storage = Storage::Paletted {
            indices: BitPackedArray::filled(MIN_PALETTE_BITS, self.volume(), fill_index),
            palette,
        };
    }
}

/// Index width for a palette of `len` entries: `max(4, ceil(log2(len)))`.
pub fn bits_for_palette_len(len: usize) -> u8 {
    let needed = usize::BITS - len.saturating_sub(1).leading_zeros();
    (needed as u8).max(MIN_PALETTE_BITS)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chunk_is_uniform_air() {
        let chunk = VoxelChunk::new(DEFAULT_CHUNK_EDGE).unwrap();
        assert!(chunk.is_uniform());
        assert_eq!(chunk.uniform_id(), Some(BlockId::AIR));
        assert_eq!(chunk.palette(), None);
        assert_eq!(chunk.bits_per_voxel(), 0);
        assert_eq!(chunk.storage_bytes(), 0);
        assert_eq!(chunk.get_block(31, 31, 31), Ok(BlockId::AIR));
    }

    #[test]
    fn test_first_write_into_air_chunk() {
        let mut chunk = VoxelChunk::new(4).unwrap();
        chunk.set_block(0, 0, 0, BlockId(5)).unwrap();
        assert_eq!(chunk.get_block(0, 0, 0), Ok(BlockId(5)));
        assert!(!chunk.is_uniform());
        assert_eq!(chunk.bits_per_voxel(), 4);
        assert_eq!(chunk.palette(), Some(&[BlockId::AIR, BlockId(5)][..]));
        assert_eq!(chunk.get_block(1, 0, 0), Ok(BlockId::AIR));
    }

    #[test]
    fn test_materialize_from_solid_uniform() {
        let mut chunk = VoxelChunk::with_fill(4, BlockId(3)).unwrap();
        chunk.set_block(2, 2, 2, BlockId(9)).unwrap();
        assert_eq!(
            chunk.palette(),
            Some(&[BlockId::AIR, BlockId(3), BlockId(9)][..])
        );
        assert_eq!(chunk.bits_per_voxel(), 4);
        assert_eq!(chunk.get_block(2, 2, 2), Ok(BlockId(9)));
        assert_eq!(chunk.get_block(0, 0, 0), Ok(BlockId(3)));
        assert_eq!(chunk.get_block(3, 3, 3), Ok(BlockId(3)));
    }

    #[test]
    fn test_set_same_type_on_uniform_is_noop() {
        let mut chunk = VoxelChunk::with_fill(8, BlockId(3)).unwrap();
        chunk.set_block(0, 0, 0, BlockId(3)).unwrap();
        assert!(chunk.is_uniform());
        assert_eq!(chunk.storage_bytes(), 0);
    }

    #[test]
    fn test_fill_uniform_releases_storage() {
        let mut chunk = VoxelChunk::new(8).unwrap();
        chunk.set_block(1, 2, 3, BlockId(7)).unwrap();
        assert!(chunk.storage_bytes() > 0);
        chunk.fill_uniform(BlockId(2));
        assert!(chunk.is_uniform());
        assert_eq!(chunk.storage_bytes(), 0);
        assert_eq!(chunk.get_block(1, 2, 3), Ok(BlockId(2)));
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let mut chunk = VoxelChunk::new(4).unwrap();
        let err = chunk.set_block(4, 0, 0, BlockId(1)).unwrap_err();
        assert_eq!(
            err,
            ChunkError::OutOfRange {
                x: 4,
                y: 0,
                z: 0,
                edge: 4
            }
        );
        assert!(chunk.get_block(0, 0, 9).is_err());
        assert!(chunk.is_uniform());
    }

    #[test]
    fn test_invalid_edge_rejected() {
        assert!(matches!(
            VoxelChunk::new(0),
            Err(ChunkError::InvalidEdge { edge: 0, .. })
        ));
        assert!(VoxelChunk::new(MAX_CHUNK_EDGE + 1).is_err());
        assert!(VoxelChunk::new(MAX_CHUNK_EDGE).is_ok());
    }

    #[test]
    fn test_bits_for_palette_len() {
        assert_eq!(bits_for_palette_len(1), 4);
        assert_eq!(bits_for_palette_len(2), 4);
        assert_eq!(bits_for_palette_len(16), 4);
        assert_eq!(bits_for_palette_len(17), 5);
        assert_eq!(bits_for_palette_len(32), 5);
        assert_eq!(bits_for_palette_len(33), 6);
        assert_eq!(bits_for_palette_len(256), 8);
        assert_eq!(bits_for_palette_len(257), 9);
        assert_eq!(bits_for_palette_len(65536), 16);
    }

    #[test]
    fn test_bit_width_grows_with_distinct_ids() {
        let mut chunk = VoxelChunk::new(8).unwrap();
        // Palette = air + ids 1..=k, so palette_len = k + 1.
        for k in 1..=40u16 {
            let i = k as usize;
            chunk.set_block(i % 8, (i / 8) % 8, i / 64, BlockId(k)).unwrap();
            let palette_len = chunk.palette().map(|p| p.len()).unwrap();
            assert_eq!(palette_len, k as usize + 1);
            assert_eq!(chunk.bits_per_voxel(), bits_for_palette_len(palette_len));
            assert_eq!(
                chunk.word_count(),
                (512 * chunk.bits_per_voxel() as usize).div_ceil(64)
            );
        }
        // Every earlier write survives each re-encode.
        for k in 1..=40u16 {
            let i = k as usize;
            assert_eq!(chunk.get_block(i % 8, (i / 8) % 8, i / 64), Ok(BlockId(k)));
        }
        assert_eq!(chunk.get_block(0, 0, 0), Ok(BlockId::AIR));
    }

    #[test]
    fn test_round_trip_last_write_wins() {
        let mut chunk = VoxelChunk::new(DEFAULT_CHUNK_EDGE).unwrap();
        for z in 0..DEFAULT_CHUNK_EDGE {
            for y in 0..DEFAULT_CHUNK_EDGE {
                for x in 0..DEFAULT_CHUNK_EDGE {
                    let id = BlockId(((x * 7 + y * 3 + z) % 37) as u16);
                    chunk.set_block(x, y, z, id).unwrap();
                }
            }
        }
        chunk.set_block(5, 6, 7, BlockId(1000)).unwrap();
        for z in 0..DEFAULT_CHUNK_EDGE {
            for y in 0..DEFAULT_CHUNK_EDGE {
                for x in 0..DEFAULT_CHUNK_EDGE {
                    let expected = if (x, y, z) == (5, 6, 7) {
                        BlockId(1000)
                    } else {
                        BlockId(((x * 7 + y * 3 + z) % 37) as u16)
                    };
                    assert_eq!(
                        chunk.get_block(x, y, z),
                        Ok(expected),
                        "mismatch at ({x}, {y}, {z})"
                    );
                }
            }
        }
        assert_eq!(chunk.bits_per_voxel(), 6);
    }

    #[test]
    fn test_no_automatic_collapse_to_uniform() {
        let mut chunk = VoxelChunk::new(2).unwrap();
        chunk.set_block(0, 0, 0, BlockId(4)).unwrap();
        chunk.set_block(0, 0, 0, BlockId::AIR).unwrap();
        assert!(!chunk.is_uniform());
        assert_eq!(chunk.palette().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_compact_collapses_single_id() {
        let mut chunk = VoxelChunk::new(2).unwrap();
        chunk.set_block(1, 1, 1, BlockId(4)).unwrap();
        chunk.set_block(1, 1, 1, BlockId::AIR).unwrap();
        chunk.compact();
        assert!(chunk.is_uniform());
        assert_eq!(chunk.uniform_id(), Some(BlockId::AIR));
    }

    #[test]
    fn test_compact_collapses_to_solid_uniform() {
        let mut chunk = VoxelChunk::new(2).unwrap();
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    chunk.set_block(x, y, z, BlockId(6)).unwrap();
                }
            }
        }
        chunk.compact();
        assert_eq!(chunk.uniform_id(), Some(BlockId(6)));
    }

    #[test]
    fn test_compact_drops_unused_entries_and_narrows() {
        let mut chunk = VoxelChunk::new(4).unwrap();
        for k in 1..=20u16 {
            chunk.set_block(0, 0, 0, BlockId(k)).unwrap();
        }
        chunk.set_block(1, 0, 0, BlockId(3)).unwrap();
        assert_eq!(chunk.bits_per_voxel(), 5);

        chunk.compact();
        assert_eq!(
            chunk.palette(),
            Some(&[BlockId::AIR, BlockId(3), BlockId(20)][..])
        );
        assert_eq!(chunk.bits_per_voxel(), 4);
        assert_eq!(chunk.get_block(0, 0, 0), Ok(BlockId(20)));
        assert_eq!(chunk.get_block(1, 0, 0), Ok(BlockId(3)));
        assert_eq!(chunk.get_block(2, 0, 0), Ok(BlockId::AIR));
    }

    #[test]
    fn test_clear_reverts_to_air() {
        let mut chunk = VoxelChunk::new(4).unwrap();
        chunk.set_block(3, 3, 3, BlockId(8)).unwrap();
        chunk.clear();
        assert_eq!(chunk.uniform_id(), Some(BlockId::AIR));
        assert_eq!(chunk.storage_bytes(), 0);
    }
}
