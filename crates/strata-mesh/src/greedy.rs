//! Greedy meshing: merges coplanar, same-type exposed faces into larger
//! rectangular quads.

use strata_voxel::{BlockId, BlockRegistry, FaceDirection, VoxelChunk};

use crate::chunk_mesh::ChunkMesh;
use crate::neighborhood::MeshNeighborhood;
use crate::quad::Quad;

/// Converts abstract axis coordinates back to concrete `(x, y, z)`.
///
/// `layer_axis`, `u_axis`, `v_axis` are 0=X, 1=Y, 2=Z.
fn axes_to_xyz(
    layer_axis: usize,
    u_axis: usize,
    v_axis: usize,
    layer: usize,
    u: usize,
    v: usize,
) -> (usize, usize, usize) {
    let mut coords = [0usize; 3];
    coords[layer_axis] = layer;
    coords[u_axis] = u;
    coords[v_axis] = v;
    (coords[0], coords[1], coords[2])
}

/// Block id at `(x, y, z)` if its face along `direction` should be drawn.
fn candidate(
    hood: &MeshNeighborhood<'_>,
    chunk: &VoxelChunk,
    (x, y, z): (usize, usize, usize),
    direction: FaceDirection,
) -> Option<BlockId> {
    let block = chunk.block_at_index(chunk.linear_index(x, y, z));
    (!block.is_air() && hood.is_face_exposed(x, y, z, direction)).then_some(block)
}

/// Performs greedy meshing on the center chunk of `hood`.
///
/// For each direction the chunk is swept layer by layer. Within a layer the
/// first unvisited candidate face in `(v, u)` order seeds a quad, which grows
/// along `u` while the next face is an unvisited candidate of the same block,
/// then along `v` while every face of the next row qualifies. Every exposed
/// unit face ends up in exactly one quad.
///
/// Boundary faces consult the neighbor chunks in `hood`; a missing neighbor
/// leaves the face exposed.
pub fn greedy_mesh(hood: &MeshNeighborhood<'_>, registry: &BlockRegistry) -> ChunkMesh {
    let chunk = hood.center();
    let size = chunk.edge();
    let mut mesh = ChunkMesh::new();
    let mut visited = vec![false; size * size];

    for direction in FaceDirection::ALL {
        let (layer_axis, u_axis, v_axis) = direction.sweep_axes();
        let at = |layer, u, v| axes_to_xyz(layer_axis, u_axis, v_axis, layer, u, v);

        for layer in 0..size {
            visited.fill(false);

            for v in 0..size {
                for u in 0..size {
                    if visited[v * size + u] {
                        continue;
                    }
                    let Some(block) = candidate(hood, chunk, at(layer, u, v), direction) else {
                        continue;
                    };

                    // Extend width along u-axis.
                    let mut w = 1;
                    while u + w < size
                        && !visited[v * size + u + w]
                        && candidate(hood, chunk, at(layer, u + w, v), direction) == Some(block)
                    {
                        w += 1;
                    }

                    // Extend height along v-axis.
                    let mut h = 1;
                    'outer: while v + h < size {
                        for du in 0..w {
                            if visited[(v + h) * size + u + du]
                                || candidate(hood, chunk, at(layer, u + du, v + h), direction)
                                    != Some(block)
                            {
                                break 'outer;
                            }
                        }
                        h += 1;
                    }

                    for dv in 0..h {
                        for du in 0..w {
                            visited[(v + dv) * size + u + du] = true;
                        }
                    }

                    let (x, y, z) = at(layer, u, v);
                    mesh.push(Quad {
                        origin: [x as u8, y as u8, z as u8],
                        direction,
                        width: w as u8,
                        height: h as u8,
                        block,
                        texture: registry.face_texture(block, direction),
                    });
                }
            }
        }
    }

    tracing::trace!(
        edge = size,
        quads = mesh.quad_count(),
        "greedy mesh built"
    );
    mesh
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
