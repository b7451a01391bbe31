//! Remesh bookkeeping: which chunks an edit dirties, and whether a finished
//! rebuild is still the newest one for its chunk.

use strata_voxel::{ChunkCoord, FaceDirection};

/// Where a chunk's mesh stands relative to its voxel data.
///
/// Versions only grow. At most one rebuild is out at a time, and only the
/// result of that rebuild clears `remesh_pending`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkMeshState {
    /// Data version the kept mesh was built from.
    pub meshed_version: u64,
    /// A rebuild was handed out and has not reported back.
    pub remesh_pending: bool,
    /// Version the outstanding (or last) rebuild was requested for.
    pub requested_version: u64,
}

impl ChunkMeshState {
    /// State for a chunk entering the world after versions up to `floor`
    /// were handed out. Results for any of those are rejected.
    pub fn starting_at(floor: u64) -> Self {
        Self {
            meshed_version: floor,
            remesh_pending: false,
            requested_version: floor,
        }
    }

    /// Returns `true` if the kept mesh was not built from `data_version`.
    pub fn is_stale(&self, data_version: u64) -> bool {
        self.meshed_version != data_version
    }

    /// Returns `true` if a rebuild should be submitted now.
    pub fn needs_remesh(&self, data_version: u64) -> bool {
        !self.remesh_pending && self.is_stale(data_version)
    }

    /// Marks a rebuild for `data_version` as submitted when one is needed.
    ///
    /// Returns `false` if the mesh is current or a rebuild is already out.
    pub fn begin_remesh(&mut self, data_version: u64) -> bool {
        if !self.needs_remesh(data_version) {
            return false;
        }
        self.remesh_pending = true;
        self.requested_version = data_version;
        true
    }

    /// Records a rebuild that finished for `version`.
    ///
    /// Returns `true` if it is newer than the kept mesh, which it then
    /// replaces. Older or repeated versions are rejected.
    pub fn finish_remesh(&mut self, version: u64) -> bool {
        self.settle(version);
        if version <= self.meshed_version {
            return false;
        }
        self.meshed_version = version;
        true
    }

    /// Records a rebuild for `version` that produced nothing.
    pub fn abandon_remesh(&mut self, version: u64) {
        self.settle(version);
    }

    fn settle(&mut self, version: u64) {
        if version == self.requested_version {
            self.remesh_pending = false;
        }
    }
}

/// Determines which chunks need remeshing after a voxel edit.
pub struct MeshInvalidator;

impl MeshInvalidator {
    /// Returns the chunks whose meshes depend on the voxel at `local` inside
    /// `edited`.
    ///
    /// The edited chunk always comes first. A face neighbor is added when
    /// the voxel lies on the shared boundary, since that neighbor culls its
    /// own boundary faces against this voxel.
    pub fn invalidate(
        edited: ChunkCoord,
        local: (usize, usize, usize),
        edge: usize,
    ) -> Vec<ChunkCoord> {
        let mut dirty = vec![edited];
        let (x, y, z) = local;
        let last = edge.saturating_sub(1);

        for (coord, direction_low, direction_high) in [
            (x, FaceDirection::NegX, FaceDirection::PosX),
            (y, FaceDirection::NegY, FaceDirection::PosY),
            (z, FaceDirection::NegZ, FaceDirection::PosZ),
        ] {
            if coord == 0 {
                dirty.push(edited.neighbor(direction_low));
            }
            if coord == last {
                dirty.push(edited.neighbor(direction_high));
            }
        }

        dirty
    }
}
