/*!
 * Chunk
 * Unit of bytes moving from producer to consumer through the chunk queue
 */

use bytes::Bytes;
use serde::Serialize;

/// Where a chunk's storage came from, and therefore where it goes when drained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Fixed-capacity buffer recycled through the chunk pool
    PoolOwned,
    /// Caller-supplied bytes, used once and discarded
    ExternallyOwned,
}

enum Storage {
    Pooled(Box<[u8]>),
    External(Bytes),
}

/// A chunk of bytes with a read cursor
///
/// Invariant: `offset + remaining <= capacity`. A chunk is owned by exactly
/// one party at a time (producer, queue, or consumer) and is never shared.
pub struct Chunk {
    storage: Storage,
    offset: usize,
    remaining: usize,
}

impl Chunk {
    /// Empty pool-owned chunk of the given capacity
    pub(crate) fn pooled(capacity: usize) -> Self {
        Self {
            storage: Storage::Pooled(vec![0u8; capacity].into_boxed_slice()),
            offset: 0,
            remaining: 0,
        }
    }

    /// Wrap caller-supplied bytes without copying
    pub fn external(bytes: Bytes) -> Self {
        let remaining = bytes.len();
        Self {
            storage: Storage::External(bytes),
            offset: 0,
            remaining,
        }
    }

    /// Copy a borrowed slice into an externally-owned chunk
    pub fn from_slice(data: &[u8]) -> Self {
        Self::external(Bytes::copy_from_slice(data))
    }

    pub fn provenance(&self) -> Provenance {
        match self.storage {
            Storage::Pooled(_) => Provenance::PoolOwned,
            Storage::External(_) => Provenance::ExternallyOwned,
        }
    }

    #[inline]
    pub fn is_pool_owned(&self) -> bool {
        matches!(self.storage, Storage::Pooled(_))
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Pooled(buf) => buf.len(),
            Storage::External(bytes) => bytes.len(),
        }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    #[inline]
    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }

    /// Unread bytes
    pub fn as_slice(&self) -> &[u8] {
        let range = self.offset..self.offset + self.remaining;
        match &self.storage {
            Storage::Pooled(buf) => &buf[range],
            Storage::External(bytes) => &bytes[range],
        }
    }

    /// Whole backing buffer of a pooled chunk, for filling
    ///
    /// Externally-owned chunks are immutable and yield `None`.
    pub(crate) fn fill_buffer(&mut self) -> Option<&mut [u8]> {
        match &mut self.storage {
            Storage::Pooled(buf) => Some(&mut buf[..]),
            Storage::External(_) => None,
        }
    }

    /// Mark the first `len` bytes of the backing buffer as unread
    pub(crate) fn set_filled(&mut self, len: usize) {
        debug_assert!(len <= self.capacity(), "fill past chunk capacity");
        self.offset = 0;
        self.remaining = len.min(self.capacity());
    }

    /// Drop any unread bytes
    pub(crate) fn clear(&mut self) {
        self.offset = 0;
        self.remaining = 0;
    }

    /// Copy as many unread bytes as fit into `dest`, advancing the cursor
    pub fn copy_to(&mut self, dest: &mut [u8]) -> usize {
        let count = dest.len().min(self.remaining);
        dest[..count].copy_from_slice(&self.as_slice()[..count]);
        self.offset += count;
        self.remaining -= count;
        count
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("provenance", &self.provenance())
            .field("capacity", &self.capacity())
            .field("offset", &self.offset)
            .field("remaining", &self.remaining)
            .finish()
    }
}
