/*!
 * Chunk Pool
 * Lock-free free-list of fixed-capacity chunks reused across fill/drain cycles
 */

use super::chunk::Chunk;
use crossbeam_queue::SegQueue;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace, warn};

/// Pool of reusable pool-owned chunks
///
/// # Performance
///
/// - **Lock-free**: `SegQueue` handles concurrent acquire/release from any number of threads
/// - **Unbounded**: never blocks or fails; grows under sustained concurrent fills
///
/// Double release is ruled out by ownership: `release` consumes the chunk.
pub struct ChunkPool {
    chunk_size: usize,
    free: SegQueue<Chunk>,
    allocated: AtomicUsize,
    outstanding: AtomicUsize,
}

impl ChunkPool {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            free: SegQueue::new(),
            allocated: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Take a drained chunk, allocating only when the free-list is empty
    pub fn acquire(&self) -> Chunk {
        self.outstanding.fetch_add(1, Ordering::Relaxed);

        if let Some(chunk) = self.free.pop() {
            trace!(chunk_size = self.chunk_size, "Acquired chunk from pool");
            return chunk;
        }

        let allocated = self.allocated.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            chunk_size = self.chunk_size,
            allocated = allocated,
            "Allocated new pool chunk"
        );
        Chunk::pooled(self.chunk_size)
    }

    /// Return a drained pool-owned chunk to the free-list
    ///
    /// Externally-owned chunks are ignored. Chunks of a foreign capacity
    /// (from a differently sized pool) are dropped rather than pooled.
    pub fn release(&self, mut chunk: Chunk) {
        if !chunk.is_pool_owned() {
            warn!("Ignoring release of externally-owned chunk");
            return;
        }
        debug_assert!(chunk.is_drained(), "released chunk still holds unread bytes");

        if chunk.capacity() != self.chunk_size {
            debug_assert!(false, "released chunk of foreign capacity");
            warn!(
                capacity = chunk.capacity(),
                chunk_size = self.chunk_size,
                "Dropping chunk of foreign capacity"
            );
            return;
        }

        let previous = self.outstanding.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "more chunks released than acquired");

        chunk.clear();
        self.free.push(chunk);
        trace!(available = self.free.len(), "Released chunk to pool");
    }

    /// Chunks currently sitting in the free-list
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            chunk_size: self.chunk_size,
            allocated: self.allocated.load(Ordering::Relaxed),
            available: self.free.len(),
            outstanding: self.outstanding.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ChunkPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkPool")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PoolStats {
    pub chunk_size: usize,
    /// Chunks ever allocated by this pool
    pub allocated: usize,
    /// Chunks ready for reuse
    pub available: usize,
    /// Chunks acquired and not yet released
    pub outstanding: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_allocates_when_empty() {
        let pool = ChunkPool::new(128);
        let chunk = pool.acquire();
        assert!(chunk.is_pool_owned());
        assert_eq!(chunk.capacity(), 128);

        let stats = pool.stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.outstanding, 1);
        assert_eq!(stats.available, 0);
    }

    #[test]
    fn test_release_then_acquire_reuses() {
        let pool = ChunkPool::new(128);
        let chunk = pool.acquire();
        pool.release(chunk);
        assert_eq!(pool.available(), 1);

        let _again = pool.acquire();
        assert_eq!(pool.stats().allocated, 1);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_ignores_external_chunk() {
        let pool = ChunkPool::new(128);
        pool.release(Chunk::from_slice(&[]));
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "foreign capacity"))]
    fn test_foreign_capacity_is_not_pooled() {
        let small = ChunkPool::new(64);
        let large = ChunkPool::new(256);
        let chunk = small.acquire();
        let _held = large.acquire();
        large.release(chunk);

        assert_eq!(large.available(), 0);
        assert_eq!(large.stats().outstanding, 1);
        assert_eq!(small.stats().outstanding, 1);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = Arc::new(ChunkPool::new(64));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let chunk = pool.acquire();
                        pool.release(chunk);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.outstanding, 0);
        assert!(stats.allocated <= 4);
        assert_eq!(stats.available, stats.allocated);
    }
}
