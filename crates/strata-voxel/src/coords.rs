//! Chunk-grid coordinates and world ↔ chunk-local conversion.

use serde::{Deserialize, Serialize};

use crate::face_direction::FaceDirection;

/// Identifies a chunk's position on the chunk grid.
///
/// The derived `Ord` (x, then y, then z) is the global order in which chunk
/// locks are acquired when several chunks must be held at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// Chunk-grid X coordinate.
    pub x: i32,
    /// Chunk-grid Y coordinate.
    pub y: i32,
    /// Chunk-grid Z coordinate.
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the coordinate offset by `(dx, dy, dz)`.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Returns the adjacent chunk coordinate in `direction`.
    pub const fn neighbor(self, direction: FaceDirection) -> Self {
        let [dx, dy, dz] = direction.step();
        self.offset(dx, dy, dz)
    }

    /// Returns the direction from `self` to `other` if they share a face.
    pub fn direction_to(self, other: ChunkCoord) -> Option<FaceDirection> {
        FaceDirection::ALL
            .into_iter()
            .find(|&dir| self.neighbor(dir) == other)
    }

    /// The chunk containing world voxel `(wx, wy, wz)`.
    pub const fn from_world(wx: i32, wy: i32, wz: i32, edge: usize) -> Self {
        let e = edge as i32;
        Self {
            x: wx.div_euclid(e),
            y: wy.div_euclid(e),
            z: wz.div_euclid(e),
        }
    }

    /// World coordinate of this chunk's `(0, 0, 0)` voxel.
    pub const fn origin(self, edge: usize) -> (i32, i32, i32) {
        let e = edge as i32;
        (self.x * e, self.y * e, self.z * e)
    }

    /// Chunk-local coordinate of world voxel `(wx, wy, wz)`.
    pub const fn local_of(wx: i32, wy: i32, wz: i32, edge: usize) -> (usize, usize, usize) {
        let e = edge as i32;
        (
            wx.rem_euclid(e) as usize,
            wy.rem_euclid(e) as usize,
            wz.rem_euclid(e) as usize,
        )
    }

    /// Squared distance on the chunk grid (used for streaming order).
    pub fn distance_squared(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        let dz = i64::from(self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_follows_direction_table() {
        let c = ChunkCoord::new(1, 2, 3);
        assert_eq!(c.neighbor(FaceDirection::PosX), ChunkCoord::new(2, 2, 3));
        assert_eq!(c.neighbor(FaceDirection::NegY), ChunkCoord::new(1, 1, 3));
        assert_eq!(c.neighbor(FaceDirection::NegZ), ChunkCoord::new(1, 2, 2));
    }

    #[test]
    fn test_direction_to() {
        let c = ChunkCoord::new(0, 0, 0);
        for dir in FaceDirection::ALL {
            assert_eq!(c.direction_to(c.neighbor(dir)), Some(dir));
        }
        assert_eq!(c.direction_to(ChunkCoord::new(1, 1, 0)), None);
        assert_eq!(c.direction_to(c), None);
    }

    #[test]
    fn test_negative_world_coordinates() {
        assert_eq!(ChunkCoord::from_world(-1, 0, 31, 32), ChunkCoord::new(-1, 0, 0));
        assert_eq!(ChunkCoord::local_of(-1, 0, 31, 32), (31, 0, 31));
        assert_eq!(ChunkCoord::from_world(-32, -33, 32, 32), ChunkCoord::new(-1, -2, 1));
        assert_eq!(ChunkCoord::local_of(-32, -33, 32, 32), (0, 31, 0));
    }

    #[test]
    fn test_origin_roundtrip() {
        let c = ChunkCoord::new(-3, 4, 0);
        let (ox, oy, oz) = c.origin(16);
        assert_eq!((ox, oy, oz), (-48, 64, 0));
        assert_eq!(ChunkCoord::from_world(ox, oy, oz, 16), c);
        assert_eq!(ChunkCoord::local_of(ox, oy, oz, 16), (0, 0, 0));
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut coords = vec![
            ChunkCoord::new(0, 1, 0),
            ChunkCoord::new(-1, 5, 5),
            ChunkCoord::new(0, 0, 2),
            ChunkCoord::new(0, 0, -1),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                ChunkCoord::new(-1, 5, 5),
                ChunkCoord::new(0, 0, -1),
                ChunkCoord::new(0, 0, 2),
                ChunkCoord::new(0, 1, 0),
            ]
        );
    }
}
