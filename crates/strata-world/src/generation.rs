//! Terrain generation: the world-coordinate to block-id function that fills
//! freshly created chunks.

use noise::{NoiseFn, OpenSimplex};
use strata_config::TerrainConfig;
use strata_voxel::{BlockId, ChunkCoord, ChunkError, DIRT, GRASS, STONE, VoxelChunk};

/// Pure mapping from world voxel coordinates to block ids.
///
/// Implementations are shared by every worker thread.
pub trait Generator: Send + Sync {
    /// Block at world voxel `(x, y, z)`.
    fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId;

    /// A single id filling the whole chunk at `coord`, when that is known
    /// without sampling every voxel.
    fn uniform_fill(&self, _coord: ChunkCoord, _edge: usize) -> Option<BlockId> {
        None
    }
}

/// Builds the chunk at `coord`.
///
/// Uses [`Generator::uniform_fill`] when offered; otherwise samples every
/// voxel and finally [`compact`](VoxelChunk::compact)s the result.
pub fn generate_chunk(
    generator: &dyn Generator,
    coord: ChunkCoord,
    edge: usize,
) -> Result<VoxelChunk, ChunkError> {
    if let Some(id) = generator.uniform_fill(coord, edge) {
        return VoxelChunk::with_fill(edge, id);
    }

    let mut chunk = VoxelChunk::new(edge)?;
    let (ox, oy, oz) = coord.origin(edge);
    for z in 0..edge {
        for y in 0..edge {
            for x in 0..edge {
                let id = generator.block_at(ox + x as i32, oy + y as i32, oz + z as i32);
                if !id.is_air() {
                    chunk.set_block(x, y, z, id)?;
                }
            }
        }
    }
    chunk.compact();
    Ok(chunk)
}

// ---------------------------------------------------------------------------
// Flat
// ---------------------------------------------------------------------------

/// Solid `block` below `height`, air above.
#[derive(Clone, Copy, Debug)]
pub struct FlatGenerator {
    /// First air layer.
    pub height: i32,
    /// Fill below `height`.
    pub block: BlockId,
}

impl Generator for FlatGenerator {
    fn block_at(&self, _x: i32, y: i32, _z: i32) -> BlockId {
        if y < self.height { self.block } else { BlockId::AIR }
    }

    fn uniform_fill(&self, coord: ChunkCoord, edge: usize) -> Option<BlockId> {
        let (_, bottom, _) = coord.origin(edge);
        let top = bottom + edge as i32;
        if bottom >= self.height {
            Some(BlockId::AIR)
        } else if top <= self.height {
            Some(self.block)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Heightmap
// ---------------------------------------------------------------------------

/// Shape of the heightmap terrain.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapParams {
    /// Noise seed.
    pub seed: u32,
    /// Mean surface height.
    pub base_height: i32,
    /// Maximum deviation from `base_height`.
    pub amplitude: f64,
    /// Horizontal noise frequency.
    pub frequency: f64,
    /// Depth of the grass + dirt cap.
    pub dirt_depth: i32,
}

impl From<&TerrainConfig> for HeightmapParams {
    fn from(config: &TerrainConfig) -> Self {
        Self {
            seed: config.seed,
            base_height: config.base_height,
            amplitude: config.amplitude,
            frequency: config.frequency,
            dirt_depth: config.dirt_depth,
        }
    }
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self::from(&TerrainConfig::default())
    }
}

/// 2D OpenSimplex heightmap with a grass, dirt and stone column profile.
pub struct HeightmapGenerator {
    noise: OpenSimplex,
    params: HeightmapParams,
}

impl HeightmapGenerator {
    /// Create a generator with the given parameters.
    pub fn new(params: HeightmapParams) -> Self {
        Self {
            noise: OpenSimplex::new(params.seed),
            params,
        }
    }

    /// First air layer of column `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let f = self.params.frequency;
        let n = self.noise.get([x as f64 * f, z as f64 * f]).clamp(-1.0, 1.0);
        (self.params.base_height as f64 + n * self.params.amplitude) as i32
    }

    /// Inclusive bounds every column height falls within.
    pub fn height_bounds(&self) -> (i32, i32) {
        let base = self.params.base_height as f64;
        let amp = self.params.amplitude.abs();
        ((base - amp).floor() as i32 - 1, (base + amp).ceil() as i32 + 1)
    }

    /// Return a reference to the current parameters.
    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }

    fn column_block(&self, y: i32, height: i32) -> BlockId {
        if y >= height {
            BlockId::AIR
        } else if y == height - 1 {
            GRASS
        } else if y > height - self.params.dirt_depth {
            DIRT
        } else {
            STONE
        }
    }
}

impl Generator for HeightmapGenerator {
    fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.column_block(y, self.surface_height(x, z))
    }

    fn uniform_fill(&self, coord: ChunkCoord, edge: usize) -> Option<BlockId> {
        let (_, bottom, _) = coord.origin(edge);
        let top = bottom + edge as i32 - 1;
        let (min_height, max_height) = self.height_bounds();
        if bottom >= max_height {
            Some(BlockId::AIR)
        } else if top + self.params.dirt_depth.max(2) <= min_height {
            Some(STONE)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hides the fast path so every voxel is sampled.
    struct Sampled<'a>(&'a dyn Generator);

    impl Generator for Sampled<'_> {
        fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
            self.0.block_at(x, y, z)
        }
    }

    fn assert_same_voxels(a: &VoxelChunk, b: &VoxelChunk) {
        let edge = a.edge();
        for i in 0..edge * edge * edge {
            assert_eq!(a.block_at_index(i), b.block_at_index(i), "voxel {i}");
        }
    }

    #[test]
    fn test_flat_fast_path() {
        let flat = FlatGenerator {
            height: 4,
            block: STONE,
        };
        let above = generate_chunk(&flat, ChunkCoord::new(0, 1, 0), 4).unwrap();
        assert_eq!(above.uniform_id(), Some(BlockId::AIR));
        let below = generate_chunk(&flat, ChunkCoord::new(3, 0, -2), 4).unwrap();
        assert_eq!(below.uniform_id(), Some(STONE));
        let deep = generate_chunk(&flat, ChunkCoord::new(0, -5, 0), 4).unwrap();
        assert_eq!(deep.uniform_id(), Some(STONE));
    }

    #[test]
    fn test_flat_surface_chunk_is_mixed() {
        let flat = FlatGenerator {
            height: 2,
            block: DIRT,
        };
        let chunk = generate_chunk(&flat, ChunkCoord::new(0, 0, 0), 4).unwrap();
        assert!(!chunk.is_uniform());
        assert_eq!(chunk.get_block(3, 1, 3).unwrap(), DIRT);
        assert_eq!(chunk.get_block(3, 2, 3).unwrap(), BlockId::AIR);
    }

    #[test]
    fn test_sampled_uniform_chunk_is_compacted() {
        let flat = FlatGenerator {
            height: 100,
            block: STONE,
        };
        let chunk = generate_chunk(&Sampled(&flat), ChunkCoord::new(0, 0, 0), 4).unwrap();
        assert_eq!(chunk.uniform_id(), Some(STONE));
    }

    #[test]
    fn test_heightmap_is_deterministic() {
        let a = HeightmapGenerator::new(HeightmapParams::default());
        let b = HeightmapGenerator::new(HeightmapParams::default());
        for (x, z) in [(0, 0), (17, -3), (-250, 990)] {
            assert_eq!(a.surface_height(x, z), b.surface_height(x, z));
        }
        let coord = ChunkCoord::new(1, 0, -1);
        assert_same_voxels(
            &generate_chunk(&a, coord, 16).unwrap(),
            &generate_chunk(&b, coord, 16).unwrap(),
        );
    }

    #[test]
    fn test_heightmap_column_profile() {
        let generator = HeightmapGenerator::new(HeightmapParams::default());
        let depth = generator.params().dirt_depth;
        let h = generator.surface_height(5, 9);
        assert_eq!(generator.block_at(5, h, 9), BlockId::AIR);
        assert_eq!(generator.block_at(5, h - 1, 9), GRASS);
        assert_eq!(generator.block_at(5, h - 2, 9), DIRT);
        assert_eq!(generator.block_at(5, h - depth + 1, 9), DIRT);
        assert_eq!(generator.block_at(5, h - depth, 9), STONE);
    }

    #[test]
    fn test_heights_stay_within_bounds() {
        let generator = HeightmapGenerator::new(HeightmapParams::default());
        let (lo, hi) = generator.height_bounds();
        for x in (-500..500).step_by(37) {
            for z in (-500..500).step_by(41) {
                let h = generator.surface_height(x, z);
                assert!((lo..=hi).contains(&h), "{h} outside {lo}..={hi}");
            }
        }
    }

    #[test]
    fn test_heightmap_fast_path_agrees_with_sampling() {
        let generator = HeightmapGenerator::new(HeightmapParams::default());
        let edge = 8;
        for y in [-10, -6, 0, 1, 5, 8] {
            let coord = ChunkCoord::new(2, y, -1);
            let fast = generate_chunk(&generator, coord, edge).unwrap();
            let slow = generate_chunk(&Sampled(&generator), coord, edge).unwrap();
            assert_same_voxels(&fast, &slow);
        }
    }

    #[test]
    fn test_params_follow_config() {
        let mut config = TerrainConfig::default();
        config.seed = 9;
        config.dirt_depth = 3;
        let params = HeightmapParams::from(&config);
        assert_eq!(params.seed, 9);
        assert_eq!(params.dirt_depth, 3);
        assert_eq!(params.base_height, 10);
    }
}
