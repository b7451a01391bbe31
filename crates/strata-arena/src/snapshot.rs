//! Frozen, offset-ordered view of an arena for building one draw call.

/// One live payload inside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement<K> {
    /// Owner of the payload.
    pub id: K,
    /// Byte offset into the backing buffer.
    pub offset: usize,
    /// Byte length of the payload.
    pub len: usize,
}

/// Arguments of one non-indexed indirect draw.
///
/// Matches the layout graphics APIs expect for `multi_draw_indirect`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndirectCommand {
    /// Vertices per instance.
    pub vertex_count: u32,
    /// Number of instances.
    pub instance_count: u32,
    /// First vertex of the template.
    pub first_vertex: u32,
    /// First instance, in units of one instance record.
    pub first_instance: u32,
}

static_assertions::assert_eq_size!(DrawIndirectCommand, [u32; 4]);

/// Vertices in the unit quad template each instance expands from.
pub const QUAD_TEMPLATE_VERTICES: u32 = 6;

/// Every live placement of an arena at one instant, ascending by offset.
///
/// The snapshot owns its data, so the arena can keep changing while a frame
/// is built from it.
#[derive(Clone, Debug)]
pub struct ArenaSnapshot<K> {
    placements: Vec<Placement<K>>,
    capacity: usize,
}

impl<K> ArenaSnapshot<K> {
    pub(crate) fn new(mut placements: Vec<Placement<K>>, capacity: usize) -> Self {
        placements.sort_unstable_by_key(|p| p.offset);
        Self {
            placements,
            capacity,
        }
    }

    /// Placements in ascending offset order.
    pub fn placements(&self) -> &[Placement<K>] {
        &self.placements
    }

    /// Arena capacity when the snapshot was taken.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live payloads.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Returns `true` if the arena held nothing.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// One indirect draw per placement, treating each payload as a run of
    /// `stride`-byte instance records.
    pub fn draw_commands(&self, stride: usize) -> Vec<DrawIndirectCommand> {
        debug_assert!(stride > 0);
        self.placements
            .iter()
            .map(|p| DrawIndirectCommand {
                vertex_count: QUAD_TEMPLATE_VERTICES,
                instance_count: (p.len / stride) as u32,
                first_vertex: 0,
                first_instance: (p.offset / stride) as u32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::BufferArena;

    #[test]
    fn test_snapshot_is_offset_ordered() {
        let mut arena = BufferArena::<u32>::with_capacity(256);
        arena.add_data(7, &[0; 16]).unwrap();
        arena.add_data(3, &[0; 24]).unwrap();
        arena.add_data(5, &[0; 8]).unwrap();
        arena.remove_data(7).unwrap();
        arena.add_data(9, &[0; 8]).unwrap();

        let snapshot = arena.snapshot();
        let order: Vec<_> = snapshot.placements().iter().map(|p| (p.id, p.offset)).collect();
        assert_eq!(order, vec![(9, 0), (3, 16), (5, 40)]);
        assert_eq!(snapshot.capacity(), 256);
    }

    #[test]
    fn test_snapshot_survives_later_mutation() {
        let mut arena = BufferArena::<u32>::with_capacity(64);
        arena.add_data(1, &[0; 16]).unwrap();
        let snapshot = arena.snapshot();
        arena.remove_data(1).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(arena.snapshot().is_empty());
    }

    #[test]
    fn test_draw_commands_address_instances() {
        let mut arena = BufferArena::<u32>::with_capacity(256);
        arena.add_data(1, &[0; 48]).unwrap();
        arena.add_data(2, &[0; 16]).unwrap();

        let commands = arena.snapshot().draw_commands(8);
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].instance_count, 6);
        assert_eq!(commands[0].first_instance, 0);
        assert_eq!(commands[1].instance_count, 2);
        assert_eq!(commands[1].first_instance, 6);
        assert!(commands.iter().all(|c| c.vertex_count == 6 && c.first_vertex == 0));
        assert_eq!(bytemuck::cast_slice::<_, u8>(&commands).len(), 32);
    }
}
