//! Merged quads and their packed per-instance encoding.
//!
//! [`QuadInstance`] is an 8-byte record meant for instanced drawing: the
//! renderer expands each instance from a 6-vertex unit quad template.
//!
//! Layout (two little-endian `u32` words):
//!   - word 0: `x` bits 0..6, `y` bits 6..12, `z` bits 12..18, direction bits 18..21
//!   - word 1: `width - 1` bits 0..6, `height - 1` bits 6..12, texture bits 16..32

use strata_voxel::{BlockId, FaceDirection, MAX_CHUNK_EDGE};

const COORD_BITS: u32 = 6;
const COORD_MASK: u32 = (1 << COORD_BITS) - 1;

static_assertions::const_assert!(MAX_CHUNK_EDGE <= 1 << COORD_BITS);

/// One merged, axis-aligned visible face produced by the mesher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quad {
    /// Chunk-local voxel coordinate of the quad's minimum corner voxel.
    pub origin: [u8; 3],
    /// Direction the face points.
    pub direction: FaceDirection,
    /// Run length along the direction's `u` sweep axis.
    pub width: u8,
    /// Run length along the direction's `v` sweep axis.
    pub height: u8,
    /// Block type the quad was built from.
    pub block: BlockId,
    /// Texture layer for this face of `block`.
    pub texture: u16,
}

impl Quad {
    /// Number of unit voxel faces covered.
    pub fn area(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Returns `true` if the quad covers the unit face of voxel `(x, y, z)`.
    pub fn covers(&self, x: usize, y: usize, z: usize) -> bool {
        let (layer_axis, u_axis, v_axis) = self.direction.sweep_axes();
        let p = [x, y, z];
        let o = self.origin.map(usize::from);
        p[layer_axis] == o[layer_axis]
            && (o[u_axis]..o[u_axis] + usize::from(self.width)).contains(&p[u_axis])
            && (o[v_axis]..o[v_axis] + usize::from(self.height)).contains(&p[v_axis])
    }
}

/// Packed per-instance quad record uploaded to the shared instance buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadInstance {
    /// Position and direction.
    pub position: u32,
    /// Extent and texture layer.
    pub extent: u32,
}

static_assertions::assert_eq_size!(QuadInstance, [u8; 8]);

impl QuadInstance {
    /// Size of one encoded quad in bytes.
    pub const STRIDE: usize = std::mem::size_of::<QuadInstance>();

    /// Packs a quad.
    pub fn encode(quad: &Quad) -> Self {
        debug_assert!(quad.width >= 1 && usize::from(quad.width) <= MAX_CHUNK_EDGE);
        debug_assert!(quad.height >= 1 && usize::from(quad.height) <= MAX_CHUNK_EDGE);
        let [x, y, z] = quad.origin.map(u32::from);
        let position = (x & COORD_MASK)
            | (y & COORD_MASK) << COORD_BITS
            | (z & COORD_MASK) << (2 * COORD_BITS)
            | u32::from(quad.direction as u8) << (3 * COORD_BITS);
        let extent = (u32::from(quad.width) - 1)
            | (u32::from(quad.height) - 1) << COORD_BITS
            | u32::from(quad.texture) << 16;
        Self { position, extent }
    }

    /// Chunk-local origin.
    pub fn origin(&self) -> [u8; 3] {
        [
            (self.position & COORD_MASK) as u8,
            (self.position >> COORD_BITS & COORD_MASK) as u8,
            (self.position >> (2 * COORD_BITS) & COORD_MASK) as u8,
        ]
    }

    /// Face direction, or `None` if the bits do not name one.
    pub fn direction(&self) -> Option<FaceDirection> {
        FaceDirection::from_u8((self.position >> (3 * COORD_BITS) & 0b111) as u8)
    }

    /// Run length along the `u` axis.
    pub fn width(&self) -> u8 {
        (self.extent & COORD_MASK) as u8 + 1
    }

    /// Run length along the `v` axis.
    pub fn height(&self) -> u8 {
        (self.extent >> COORD_BITS & COORD_MASK) as u8 + 1
    }

    /// Texture layer.
    pub fn texture(&self) -> u16 {
        (self.extent >> 16) as u16
    }
}
