//! Backing storage for [`BufferArena`](crate::BufferArena).
//!
//! The arena only decides *where* payloads go. A [`BackingStore`] owns the
//! bytes and knows how to grow and shuffle them; on the render side this is
//! a GPU buffer, in host memory it is a [`VecStore`].

use std::collections::TryReserveError;
use std::ops::Range;

use thiserror::Error;

/// Errors raised when the backing store refuses to grow.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested capacity is above the store's hard limit.
    #[error("backing store cannot grow to {requested} bytes (limit {limit})")]
    CapacityExceeded {
        /// Capacity that was asked for.
        requested: usize,
        /// Largest capacity the store accepts.
        limit: usize,
    },
    /// The allocator could not reserve the additional memory.
    #[error("backing store allocation failed: {0}")]
    Reserve(#[from] TryReserveError),
}

/// One contiguous, growable byte buffer.
pub trait BackingStore {
    /// Current capacity in bytes.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows the store to `new_len` bytes. Existing bytes keep their offsets.
    fn grow(&mut self, new_len: usize) -> Result<(), StoreError>;

    /// Copies `bytes` into the store starting at `offset`.
    fn write(&mut self, offset: usize, bytes: &[u8]);

    /// Moves the bytes in `src` so they start at `dst`. Ranges may overlap.
    fn copy_within(&mut self, src: Range<usize>, dst: usize);
}

/// Host-memory backing store.
#[derive(Clone, Debug, Default)]
pub struct VecStore {
    bytes: Vec<u8>,
    max_len: Option<usize>,
}

impl VecStore {
    /// A zeroed store of `capacity` bytes with no growth limit.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            max_len: None,
        }
    }

    /// A zeroed store that refuses to grow beyond `max_len` bytes.
    pub fn with_limit(capacity: usize, max_len: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            max_len: Some(max_len),
        }
    }

    /// The hard growth limit, if any.
    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    /// The whole buffer, including free space.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl BackingStore for VecStore {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn grow(&mut self, new_len: usize) -> Result<(), StoreError> {
        if let Some(limit) = self.max_len
            && new_len > limit
        {
            return Err(StoreError::CapacityExceeded {
                requested: new_len,
                limit,
            });
        }
        let additional = new_len.saturating_sub(self.bytes.len());
        self.bytes.try_reserve_exact(additional)?;
        self.bytes.resize(new_len.max(self.bytes.len()), 0);
        Ok(())
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn copy_within(&mut self, src: Range<usize>, dst: usize) {
        self.bytes.copy_within(src, dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_keeps_existing_bytes() {
        let mut store = VecStore::new(4);
        store.write(0, &[1, 2, 3, 4]);
        store.grow(10).unwrap();
        assert_eq!(store.len(), 10);
        assert_eq!(&store.as_slice()[..4], &[1, 2, 3, 4]);
        assert!(store.as_slice()[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_limit_refuses_growth() {
        let mut store = VecStore::with_limit(8, 16);
        store.grow(16).unwrap();
        let err = store.grow(17).unwrap_err();
        assert!(matches!(
            err,
            StoreError::CapacityExceeded {
                requested: 17,
                limit: 16
            }
        ));
        assert_eq!(store.len(), 16);
    }

    #[test]
    fn test_copy_within_handles_overlap() {
        let mut store = VecStore::new(6);
        store.write(2, &[7, 8, 9]);
        store.copy_within(2..5, 1);
        assert_eq!(&store.as_slice()[1..4], &[7, 8, 9]);
    }
}
