//! The six axis-aligned directions a voxel face (or a chunk neighbor) can point.
//!
//! Opposites and offsets come from constant tables indexed by the enum
//! discriminant, so every lookup is total over the closed set of directions.

use serde::{Deserialize, Serialize};

/// One of the six cardinal directions a voxel face can point.
///
/// The `repr(u8)` discriminant is the index into [`FaceDirection::OPPOSITE`]
/// and [`FaceDirection::OFFSETS`], and the value stored in encoded quads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum FaceDirection {
    /// +X direction.
    PosX = 0,
    /// −X direction.
    NegX = 1,
    /// +Y direction (up).
    PosY = 2,
    /// −Y direction (down).
    NegY = 3,
    /// +Z direction.
    PosZ = 4,
    /// −Z direction.
    NegZ = 5,
}

static_assertions::const_assert_eq!(FaceDirection::ALL.len(), FaceDirection::OPPOSITE.len());
static_assertions::const_assert_eq!(FaceDirection::ALL.len(), FaceDirection::OFFSETS.len());

impl FaceDirection {
    /// All six directions in discriminant order.
    pub const ALL: [FaceDirection; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// Opposite direction, indexed by discriminant.
    pub const OPPOSITE: [FaceDirection; 6] = [
        Self::NegX,
        Self::PosX,
        Self::NegY,
        Self::PosY,
        Self::NegZ,
        Self::PosZ,
    ];

    /// Unit step `(dx, dy, dz)`, indexed by discriminant.
    pub const OFFSETS: [[i32; 3]; 6] = [
        [1, 0, 0],
        [-1, 0, 0],
        [0, 1, 0],
        [0, -1, 0],
        [0, 0, 1],
        [0, 0, -1],
    ];

    /// Returns the direction index (0–5).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a direction from its discriminant.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::PosX),
            1 => Some(Self::NegX),
            2 => Some(Self::PosY),
            3 => Some(Self::NegY),
            4 => Some(Self::PosZ),
            5 => Some(Self::NegZ),
            _ => None,
        }
    }

    /// Returns the opposite face direction.
    pub const fn opposite(self) -> Self {
        Self::OPPOSITE[self.index()]
    }

    /// Returns the unit step for this direction.
    pub const fn step(self) -> [i32; 3] {
        Self::OFFSETS[self.index()]
    }

    /// Returns the neighbor coordinate one step away in this direction.
    pub const fn offset(self, x: i32, y: i32, z: i32) -> (i32, i32, i32) {
        let [dx, dy, dz] = self.step();
        (x + dx, y + dy, z + dz)
    }

    /// Axis (0=X, 1=Y, 2=Z) this direction runs along.
    pub const fn axis(self) -> usize {
        match self {
            Self::PosX | Self::NegX => 0,
            Self::PosY | Self::NegY => 1,
            Self::PosZ | Self::NegZ => 2,
        }
    }

    /// Returns `true` for the three positive directions.
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::PosX | Self::PosY | Self::PosZ)
    }

    /// Returns the sweep axes for greedy meshing: `(layer_axis, u_axis, v_axis)`.
    ///
    /// `layer_axis` is the axis perpendicular to the face (the normal direction).
    /// `u_axis` and `v_axis` span the face plane. Each value is 0=X, 1=Y, 2=Z.
    pub const fn sweep_axes(self) -> (usize, usize, usize) {
        match self {
            Self::PosX | Self::NegX => (0, 2, 1), // layer=X, u=Z, v=Y
            Self::PosY | Self::NegY => (1, 0, 2), // layer=Y, u=X, v=Z
            Self::PosZ | Self::NegZ => (2, 0, 1), // layer=Z, u=X, v=Y
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_directions_unique() {
        for (i, a) in FaceDirection::ALL.iter().enumerate() {
            assert_eq!(a.index(), i);
            for b in &FaceDirection::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_opposite_is_involution() {
        for dir in FaceDirection::ALL {
            assert_ne!(dir.opposite(), dir);
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.opposite().axis(), dir.axis());
        }
    }

    #[test]
    fn test_opposite_offsets_cancel() {
        for dir in FaceDirection::ALL {
            let a = dir.step();
            let b = dir.opposite().step();
            assert_eq!([a[0] + b[0], a[1] + b[1], a[2] + b[2]], [0, 0, 0]);
        }
    }

    #[test]
    fn test_offset_neg_x() {
        assert_eq!(FaceDirection::NegX.offset(0, 5, 7), (-1, 5, 7));
    }

    #[test]
    fn test_from_u8_roundtrip() {
        for dir in FaceDirection::ALL {
            assert_eq!(FaceDirection::from_u8(dir as u8), Some(dir));
        }
        assert_eq!(FaceDirection::from_u8(6), None);
    }

    #[test]
    fn test_sweep_axes_span_plane() {
        for dir in FaceDirection::ALL {
            let (layer, u, v) = dir.sweep_axes();
            assert_eq!(layer, dir.axis());
            let mut axes = [layer, u, v];
            axes.sort_unstable();
            assert_eq!(axes, [0, 1, 2]);
        }
    }
}
