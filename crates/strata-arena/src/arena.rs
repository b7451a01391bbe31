//! First-fit free-list allocator over one contiguous backing buffer.
//!
//! Every byte of `[0, capacity)` belongs to exactly one live allocation or
//! one free run, and no two free runs touch. Capacity only grows.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::ops::Range;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::snapshot::{ArenaSnapshot, Placement};
use crate::store::{BackingStore, StoreError, VecStore};

/// Errors returned by [`BufferArena`] operations.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// An in-place update does not fit the existing slot. Remove and re-add
    /// the payload instead.
    #[error("payload of {requested} bytes does not fit the existing {available}-byte slot")]
    AllocationTooSmall {
        /// Length of the new payload.
        requested: usize,
        /// Length of the current slot.
        available: usize,
    },
    /// The id has no allocation.
    #[error("no allocation for this id")]
    UnknownId,
    /// The id already has an allocation.
    #[error("id is already allocated")]
    AlreadyAllocated,
    /// Zero-length payloads cannot be placed.
    #[error("empty payload")]
    EmptyPayload,
    /// The backing store refused to grow.
    #[error("arena growth failed: {0}")]
    Grow(#[from] StoreError),
}

/// Multiplexes many variable-length payloads into one backing buffer.
///
/// Allocation is first-fit by ascending offset. When nothing fits, the
/// buffer grows by `max(capacity, requested)` bytes at the end; existing
/// offsets never move except through [`defragment`](Self::defragment).
#[derive(Debug)]
pub struct BufferArena<K, S = VecStore> {
    store: S,
    /// Free runs, offset -> length.
    free: BTreeMap<usize, usize>,
    offsets: FxHashMap<K, usize>,
    lengths: FxHashMap<K, usize>,
}

impl<K: Copy + Eq + Hash> BufferArena<K, VecStore> {
    /// An arena over a zeroed host buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(VecStore::new(capacity))
    }

    /// The bytes currently stored for `id`.
    pub fn data(&self, id: K) -> Option<&[u8]> {
        let range = self.range_of(id)?;
        Some(&self.store.as_slice()[range])
    }
}

impl<K: Copy + Eq + Hash, S: BackingStore> BufferArena<K, S> {
    /// Wraps `store`; its whole current length starts out free.
    pub fn new(store: S) -> Self {
        let mut free = BTreeMap::new();
        if !store.is_empty() {
            free.insert(0, store.len());
        }
        Self {
            store,
            free,
            offsets: FxHashMap::default(),
            lengths: FxHashMap::default(),
        }
    }

    /// Places `bytes` under `id` and returns the chosen offset.
    ///
    /// # Errors
    ///
    /// [`ArenaError::EmptyPayload`] for zero-length data,
    /// [`ArenaError::AlreadyAllocated`] if `id` is already placed and
    /// [`ArenaError::Grow`] if the store cannot grow far enough.
    pub fn add_data(&mut self, id: K, bytes: &[u8]) -> Result<usize, ArenaError> {
        let len = bytes.len();
        if len == 0 {
            return Err(ArenaError::EmptyPayload);
        }
        if self.offsets.contains_key(&id) {
            return Err(ArenaError::AlreadyAllocated);
        }

        let offset = loop {
            if let Some(offset) = self.first_fit(len) {
                break offset;
            }
            self.grow(len)?;
        };

        self.carve(offset, len);
        self.offsets.insert(id, offset);
        self.lengths.insert(id, len);
        self.store.write(offset, bytes);
        Ok(offset)
    }

    /// Releases the slot held by `id` and returns its former range.
    pub fn remove_data(&mut self, id: K) -> Result<Range<usize>, ArenaError> {
        let offset = self.offsets.remove(&id).ok_or(ArenaError::UnknownId)?;
        let len = self.lengths.remove(&id).ok_or(ArenaError::UnknownId)?;
        self.release(offset, len);
        Ok(offset..offset + len)
    }

    /// Overwrites the payload of `id` in place.
    ///
    /// A shorter payload shrinks the slot and returns the tail to the free
    /// list. A longer one is rejected; it never relocates implicitly.
    pub fn update_data(&mut self, id: K, bytes: &[u8]) -> Result<(), ArenaError> {
        let offset = *self.offsets.get(&id).ok_or(ArenaError::UnknownId)?;
        let available = *self.lengths.get(&id).ok_or(ArenaError::UnknownId)?;
        let requested = bytes.len();
        if requested == 0 {
            return Err(ArenaError::EmptyPayload);
        }
        if requested > available {
            return Err(ArenaError::AllocationTooSmall {
                requested,
                available,
            });
        }

        self.store.write(offset, bytes);
        if requested < available {
            self.lengths.insert(id, requested);
            self.release(offset + requested, available - requested);
        }
        Ok(())
    }

    /// Repacks every live payload from offset 0 in offset order, leaving a
    /// single trailing free run.
    pub fn defragment(&mut self) {
        let mut live: Vec<(usize, K)> = self.offsets.iter().map(|(&id, &off)| (off, id)).collect();
        live.sort_unstable_by_key(|&(offset, _)| offset);

        let mut cursor = 0;
        for (offset, id) in live {
            let len = self.lengths.get(&id).copied().unwrap_or_default();
            if offset != cursor {
                self.store.copy_within(offset..offset + len, cursor);
                self.offsets.insert(id, cursor);
            }
            cursor += len;
        }

        self.free.clear();
        let capacity = self.store.len();
        if cursor < capacity {
            self.free.insert(cursor, capacity - cursor);
        }
        tracing::debug!(live_bytes = cursor, capacity, "arena defragmented");
    }

    /// Offset of `id`'s slot.
    pub fn offset_of(&self, id: K) -> Option<usize> {
        self.offsets.get(&id).copied()
    }

    /// Length of `id`'s slot.
    pub fn len_of(&self, id: K) -> Option<usize> {
        self.lengths.get(&id).copied()
    }

    /// Byte range of `id`'s slot.
    pub fn range_of(&self, id: K) -> Option<Range<usize>> {
        let offset = self.offset_of(id)?;
        let len = self.len_of(id)?;
        Some(offset..offset + len)
    }

    /// Returns `true` if `id` has a slot.
    pub fn contains(&self, id: K) -> bool {
        self.offsets.contains_key(&id)
    }

    /// Number of live allocations.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` if nothing is allocated.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Current backing capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Bytes held by live allocations.
    pub fn live_bytes(&self) -> usize {
        self.lengths.values().sum()
    }

    /// Bytes in free runs.
    pub fn free_bytes(&self) -> usize {
        self.free.values().sum()
    }

    /// Free runs as `(offset, length)`, ascending by offset.
    pub fn free_ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.free.iter().map(|(&offset, &len)| (offset, len))
    }

    /// Length of the longest free run.
    pub fn largest_free_run(&self) -> usize {
        self.free.values().copied().max().unwrap_or(0)
    }

    /// `1 - largest_free_run / free_bytes`, or 0 when nothing is free.
    pub fn fragmentation(&self) -> f32 {
        let total = self.free_bytes();
        if total == 0 {
            return 0.0;
        }
        1.0 - self.largest_free_run() as f32 / total as f32
    }

    /// Frozen view of every live placement, ascending by offset.
    pub fn snapshot(&self) -> ArenaSnapshot<K> {
        let placements = self
            .offsets
            .iter()
            .map(|(&id, &offset)| Placement {
                id,
                offset,
                len: self.lengths.get(&id).copied().unwrap_or_default(),
            })
            .collect();
        ArenaSnapshot::new(placements, self.capacity())
    }

    /// Shared access to the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn first_fit(&self, len: usize) -> Option<usize> {
        self.free
            .iter()
            .find(|&(_, &run)| run >= len)
            .map(|(&offset, _)| offset)
    }

    /// Takes `len` bytes from the start of the free run at `offset`.
    fn carve(&mut self, offset: usize, len: usize) {
        if let Some(run) = self.free.remove(&offset)
            && run > len
        {
            self.free.insert(offset + len, run - len);
        }
    }

    /// Returns `[offset, offset + len)` to the free list, merging with
    /// touching runs on either side.
    fn release(&mut self, offset: usize, len: usize) {
        let mut start = offset;
        let mut run = len;

        if let Some((&prev, &prev_len)) = self.free.range(..offset).next_back()
            && prev + prev_len == offset
        {
            self.free.remove(&prev);
            start = prev;
            run += prev_len;
        }
        if let Some(next_len) = self.free.remove(&(offset + len)) {
            run += next_len;
        }
        self.free.insert(start, run);
    }

    fn grow(&mut self, requested: usize) -> Result<(), StoreError> {
        let old = self.store.len();
        let new = old + old.max(requested);
        self.store.grow(new)?;
        tracing::debug!(old, new, requested, "arena grown");
        self.release(old, new - old);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Live and free ranges must tile `[0, capacity)` and no two free runs may touch.
    fn assert_partition<K: Copy + Eq + Hash + std::fmt::Debug>(arena: &BufferArena<K>) {
        let mut ranges: Vec<(usize, usize, bool)> = arena
            .offsets
            .iter()
            .map(|(id, &off)| (off, arena.lengths[id], true))
            .chain(arena.free_ranges().map(|(off, len)| (off, len, false)))
            .collect();
        ranges.sort_unstable();

        let mut cursor = 0;
        let mut prev_free = false;
        for (off, len, live) in ranges {
            assert_eq!(off, cursor, "gap or overlap at {off}");
            assert!(len > 0);
            assert!(!(prev_free && !live), "adjacent free runs at {off}");
            prev_free = !live;
            cursor += len;
        }
        assert_eq!(cursor, arena.capacity());
    }

    #[test]
    fn test_first_fit_reuses_freed_prefix() {
        let mut arena = BufferArena::<u32>::with_capacity(1024);
        assert_eq!(arena.add_data(1, &[1; 100]).unwrap(), 0);
        assert_eq!(arena.add_data(2, &[2; 50]).unwrap(), 100);
        arena.remove_data(1).unwrap();
        assert_eq!(arena.add_data(3, &[3; 90]).unwrap(), 0);

        let free: Vec<_> = arena.free_ranges().collect();
        assert_eq!(free, vec![(90, 10), (150, 874)]);
        assert_partition(&arena);
    }

    #[test]
    fn test_growth_preserves_existing_allocations() {
        let mut arena = BufferArena::<u32>::with_capacity(64);
        arena.add_data(1, &[0xAA; 40]).unwrap();
        arena.add_data(2, &[0xBB; 20]).unwrap();

        let offset = arena.add_data(3, &[0xCC; 100]).unwrap();
        assert_eq!(arena.capacity(), 64 + 100);
        assert_eq!(offset, 60);
        assert_eq!(arena.range_of(1), Some(0..40));
        assert_eq!(arena.range_of(2), Some(40..60));
        assert_eq!(arena.data(1).unwrap(), &[0xAA; 40]);
        assert_eq!(arena.data(2).unwrap(), &[0xBB; 20]);
        assert_eq!(arena.data(3).unwrap(), &[0xCC; 100]);
        assert_partition(&arena);
    }

    #[test]
    fn test_small_request_doubles_capacity() {
        let mut arena = BufferArena::<u32>::with_capacity(16);
        arena.add_data(1, &[1; 16]).unwrap();
        arena.add_data(2, &[2; 4]).unwrap();
        assert_eq!(arena.capacity(), 32);
        assert_eq!(arena.offset_of(2), Some(16));
        assert_partition(&arena);
    }

    #[test]
    fn test_growth_merges_with_trailing_free_run() {
        let mut arena = BufferArena::<u32>::with_capacity(100);
        arena.add_data(1, &[1; 90]).unwrap();
        // 10 free bytes at the end are too few; growth merges them with the new run.
        let offset = arena.add_data(2, &[2; 50]).unwrap();
        assert_eq!(offset, 90);
        assert_eq!(arena.capacity(), 200);
        assert_eq!(arena.free_ranges().collect::<Vec<_>>(), vec![(140, 60)]);
        assert_partition(&arena);
    }

    #[test]
    fn test_zero_capacity_arena_grows_on_first_add() {
        let mut arena = BufferArena::<u32>::with_capacity(0);
        assert_eq!(arena.add_data(1, &[9; 12]).unwrap(), 0);
        assert_eq!(arena.capacity(), 12);
        assert_eq!(arena.free_ranges().count(), 0);
    }

    #[test]
    fn test_remove_coalesces_both_sides() {
        let mut arena = BufferArena::<u32>::with_capacity(300);
        for id in 0..3 {
            arena.add_data(id, &[id as u8; 100]).unwrap();
        }
        arena.remove_data(0).unwrap();
        arena.remove_data(2).unwrap();
        assert_eq!(arena.free_ranges().count(), 2);
        arena.remove_data(1).unwrap();
        assert_eq!(arena.free_ranges().collect::<Vec<_>>(), vec![(0, 300)]);
        assert_partition(&arena);
    }

    #[test]
    fn test_interleaved_operations_never_overlap() {
        let mut arena = BufferArena::<u32>::with_capacity(256);
        let mut live = Vec::new();
        for step in 0u32..200 {
            let len = ((step * 37) % 61 + 1) as usize;
            if step % 3 == 2 && !live.is_empty() {
                let id = live.remove((step as usize * 7) % live.len());
                arena.remove_data(id).unwrap();
            } else {
                arena.add_data(step, &vec![step as u8; len]).unwrap();
                live.push(step);
            }
            assert_partition(&arena);
        }
        for id in live {
            let len = arena.len_of(id).unwrap();
            assert_eq!(arena.data(id).unwrap(), vec![id as u8; len].as_slice());
        }
    }

    #[test]
    fn test_update_in_place_and_too_small() {
        let mut arena = BufferArena::<u32>::with_capacity(64);
        arena.add_data(1, &[1; 16]).unwrap();
        arena.add_data(2, &[2; 16]).unwrap();

        arena.update_data(1, &[7; 16]).unwrap();
        assert_eq!(arena.data(1).unwrap(), &[7; 16]);

        let err = arena.update_data(1, &[8; 17]).unwrap_err();
        assert!(matches!(
            err,
            ArenaError::AllocationTooSmall {
                requested: 17,
                available: 16
            }
        ));
        assert_eq!(arena.data(1).unwrap(), &[7; 16]);
    }

    #[test]
    fn test_shrinking_update_frees_tail() {
        let mut arena = BufferArena::<u32>::with_capacity(64);
        arena.add_data(1, &[1; 32]).unwrap();
        arena.update_data(1, &[5; 8]).unwrap();
        assert_eq!(arena.range_of(1), Some(0..8));
        assert_eq!(arena.free_ranges().collect::<Vec<_>>(), vec![(8, 56)]);
        assert_partition(&arena);
    }

    #[test]
    fn test_rejected_operations() {
        let mut arena = BufferArena::<u32>::with_capacity(64);
        assert!(matches!(arena.add_data(1, &[]), Err(ArenaError::EmptyPayload)));
        arena.add_data(1, &[1; 4]).unwrap();
        assert!(matches!(arena.add_data(1, &[1; 4]), Err(ArenaError::AlreadyAllocated)));
        assert!(matches!(arena.remove_data(9), Err(ArenaError::UnknownId)));
        assert!(matches!(arena.update_data(9, &[1]), Err(ArenaError::UnknownId)));
    }

    #[test]
    fn test_growth_failure_surfaces_and_leaves_arena_intact() {
        let mut arena = BufferArena::<u32, _>::new(VecStore::with_limit(32, 48));
        arena.add_data(1, &[1; 32]).unwrap();
        let err = arena.add_data(2, &[2; 8]).unwrap_err();
        assert!(matches!(err, ArenaError::Grow(StoreError::CapacityExceeded { .. })));
        assert_eq!(arena.capacity(), 32);
        assert!(!arena.contains(2));
        assert_eq!(arena.range_of(1), Some(0..32));
    }

    #[test]
    fn test_defragment_packs_live_bytes() {
        let mut arena = BufferArena::<u32>::with_capacity(100);
        for id in 0..5 {
            arena.add_data(id, &[id as u8 + 1; 20]).unwrap();
        }
        arena.remove_data(1).unwrap();
        arena.remove_data(3).unwrap();
        let live_before = arena.live_bytes();
        assert!(arena.fragmentation() > 0.0);

        arena.defragment();
        assert_eq!(arena.live_bytes(), live_before);
        assert_eq!(arena.free_ranges().collect::<Vec<_>>(), vec![(60, 40)]);
        assert_eq!(arena.fragmentation(), 0.0);
        assert_eq!(arena.range_of(0), Some(0..20));
        assert_eq!(arena.range_of(2), Some(20..40));
        assert_eq!(arena.range_of(4), Some(40..60));
        assert_eq!(arena.data(4).unwrap(), &[5; 20]);
        assert_partition(&arena);
    }

    #[test]
    fn test_defragment_when_full_leaves_no_free_run() {
        let mut arena = BufferArena::<u32>::with_capacity(40);
        arena.add_data(1, &[1; 20]).unwrap();
        arena.add_data(2, &[2; 20]).unwrap();
        arena.defragment();
        assert_eq!(arena.free_ranges().count(), 0);
        assert_partition(&arena);
    }
}
