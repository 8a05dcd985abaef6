/*!
 * Stream Bridge
 *
 * Producer/consumer façade over the chunk pool and chunk queue.
 *
 * The producer half ingests bytes by direct write or by filling pooled chunks
 * from a cancellable source. The consumer half serves them out through a
 * blocking read that only returns short at end-of-stream, and recycles pooled
 * chunks as soon as they are drained.
 *
 * Neither half can seek, flush, or report a length: those operations do not
 * exist on the types.
 */

use super::chunk::Chunk;
use super::pool::{ChunkPool, PoolStats};
use super::queue::ChunkQueue;
use super::source::{CancellableSource, SourceRead};
use crate::core::config::BridgeConfig;
use crate::core::errors::{BridgeError, BridgeResult};
use crate::core::sync::CancellationToken;
use bytes::Bytes;
use serde::Serialize;
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

#[derive(Default)]
struct Counters {
    chunks_enqueued: AtomicU64,
    bytes_enqueued: AtomicU64,
    bytes_read: AtomicU64,
}

struct Shared {
    queue: ChunkQueue,
    pool: Arc<ChunkPool>,
    counters: Counters,
    config: BridgeConfig,
}

impl Shared {
    fn push(&self, chunk: Chunk) -> Result<(), Chunk> {
        let len = chunk.remaining() as u64;
        self.queue.try_enqueue(chunk)?;
        self.counters.chunks_enqueued.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes_enqueued.fetch_add(len, Ordering::Relaxed);
        Ok(())
    }

    fn stats(&self) -> BridgeStats {
        BridgeStats {
            chunks_enqueued: self.counters.chunks_enqueued.load(Ordering::Relaxed),
            bytes_enqueued: self.counters.bytes_enqueued.load(Ordering::Relaxed),
            bytes_read: self.counters.bytes_read.load(Ordering::Relaxed),
            queued_chunks: self.queue.len(),
            completed: self.queue.is_adding_completed(),
            pool: self.pool.stats(),
        }
    }
}

/// Buffered transport between one producer thread and one consumer thread
///
/// # Example
///
/// ```ignore
/// let (writer, mut reader) = StreamBridge::new().split();
/// let fill = writer.spawn_fill_loop(ThreadedSource::spawn(pipe)?, token.clone())?;
///
/// let mut buf = [0u8; 4096];
/// loop {
///     let n = reader.read(&mut buf);
///     if n == 0 { break; }
///     handle(&buf[..n]);
/// }
/// fill.join()?;
/// ```
pub struct StreamBridge {
    shared: Arc<Shared>,
}

impl StreamBridge {
    /// Bridge with the default chunk size and a private pool
    pub fn new() -> Self {
        Self::build(BridgeConfig::default(), None)
    }

    /// Bridge with a validated configuration and a private pool
    pub fn with_config(config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        Ok(Self::build(config, None))
    }

    /// Bridge drawing chunks from a pool shared with other bridges
    pub fn with_pool(pool: Arc<ChunkPool>) -> Self {
        let config = BridgeConfig::default().with_chunk_size(pool.chunk_size());
        Self::build(config, Some(pool))
    }

    fn build(config: BridgeConfig, pool: Option<Arc<ChunkPool>>) -> Self {
        let pool = pool.unwrap_or_else(|| Arc::new(ChunkPool::new(config.chunk_size)));
        debug!(chunk_size = pool.chunk_size(), "Created stream bridge");
        Self {
            shared: Arc::new(Shared {
                queue: ChunkQueue::new(),
                pool,
                counters: Counters::default(),
                config,
            }),
        }
    }

    /// Separate into the producer and consumer halves
    pub fn split(self) -> (BridgeWriter, BridgeReader) {
        let writer = BridgeWriter {
            shared: self.shared.clone(),
        };
        let reader = BridgeReader {
            shared: self.shared,
            current: None,
        };
        (writer, reader)
    }

    pub fn pool(&self) -> &Arc<ChunkPool> {
        &self.shared.pool
    }

    pub fn stats(&self) -> BridgeStats {
        self.shared.stats()
    }
}

impl Default for StreamBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half
///
/// Dropping the writer signals completion, so a consumer is never left
/// blocked by a producer that went away.
pub struct BridgeWriter {
    shared: Arc<Shared>,
}

impl BridgeWriter {
    /// Enqueue a copy of `data` as an externally-owned chunk
    ///
    /// Never touches the pool. A zero-length write enqueues an empty chunk
    /// that the consumer skips.
    pub fn write(&mut self, data: &[u8]) -> BridgeResult<()> {
        self.write_chunk(Chunk::from_slice(data))
    }

    /// Enqueue `data` without copying
    pub fn write_bytes(&mut self, data: Bytes) -> BridgeResult<()> {
        self.write_chunk(Chunk::external(data))
    }

    fn write_chunk(&mut self, chunk: Chunk) -> BridgeResult<()> {
        self.shared
            .push(chunk)
            .map_err(|_| BridgeError::AlreadyCompleted)
    }

    /// Fill one pooled chunk from `source` and enqueue it
    ///
    /// Returns `Ok(false)` when no bytes were produced, either because the
    /// source ended or because `token` was cancelled first. The caller should
    /// then stop and call `signal_completion`.
    ///
    /// # Errors
    ///
    /// - `AlreadyCompleted` if completion was already signaled
    /// - `SourceReadFailed` if the source failed for any reason other than cancellation
    pub fn fill_from_source<S>(
        &mut self,
        source: &mut S,
        token: &CancellationToken,
    ) -> BridgeResult<bool>
    where
        S: CancellableSource + ?Sized,
    {
        if self.shared.queue.is_adding_completed() {
            return Err(BridgeError::AlreadyCompleted);
        }

        let pool = &self.shared.pool;
        let mut chunk = pool.acquire();
        let capacity = chunk.capacity();

        let outcome = match chunk.fill_buffer() {
            Some(buf) => source.read_cancellable(buf, token),
            None => Ok(SourceRead::Ended),
        };

        match outcome {
            Ok(SourceRead::Data(n)) if n > capacity => {
                pool.release(chunk);
                Err(BridgeError::SourceReadFailed(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("source reported {} bytes for a {} byte chunk", n, capacity),
                )))
            }
            Ok(SourceRead::Data(n)) if n > 0 => {
                chunk.set_filled(n);
                match self.shared.push(chunk) {
                    Ok(()) => {
                        trace!(bytes = n, "Enqueued filled chunk");
                        Ok(true)
                    }
                    Err(mut rejected) => {
                        rejected.clear();
                        pool.release(rejected);
                        Err(BridgeError::AlreadyCompleted)
                    }
                }
            }
            Ok(read) => {
                debug!(outcome = ?read, "Source produced no data");
                pool.release(chunk);
                Ok(false)
            }
            Err(e) => {
                pool.release(chunk);
                error!(error = %e, "Source read failed");
                Err(BridgeError::SourceReadFailed(e))
            }
        }
    }

    /// Close the ingestion side; blocked and future reads return 0 once drained
    pub fn signal_completion(&self) {
        self.shared.queue.signal_completion();
    }

    pub fn is_completed(&self) -> bool {
        self.shared.queue.is_adding_completed()
    }

    pub fn stats(&self) -> BridgeStats {
        self.shared.stats()
    }

    /// Run the fill loop on a background thread
    ///
    /// The thread fills until the source ends, `token` is cancelled, or the
    /// source fails, then signals completion in every case. The handle
    /// reports the number of bytes ingested.
    pub fn spawn_fill_loop<S>(
        mut self,
        mut source: S,
        token: CancellationToken,
    ) -> BridgeResult<FillHandle>
    where
        S: CancellableSource + 'static,
    {
        let name = self.shared.config.fill_thread_name.clone();
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let mut ingested = 0u64;
                let result = loop {
                    let before = self.shared.counters.bytes_enqueued.load(Ordering::Relaxed);
                    match self.fill_from_source(&mut source, &token) {
                        Ok(true) => {
                            ingested += self.shared.counters.bytes_enqueued.load(Ordering::Relaxed)
                                - before;
                        }
                        Ok(false) => break Ok(ingested),
                        Err(e) => break Err(e),
                    }
                };
                self.signal_completion();
                debug!(
                    bytes = ingested,
                    cancelled = token.is_cancelled(),
                    "Fill loop finished"
                );
                result
            })
            .map_err(BridgeError::ThreadSpawnFailed)?;

        Ok(FillHandle { handle })
    }
}

impl Drop for BridgeWriter {
    fn drop(&mut self) {
        self.shared.queue.signal_completion();
    }
}

/// Handle to a background fill loop
pub struct FillHandle {
    handle: JoinHandle<BridgeResult<u64>>,
}

impl FillHandle {
    /// Wait for the fill loop and return the bytes it ingested
    pub fn join(self) -> BridgeResult<u64> {
        self.handle
            .join()
            .map_err(|_| BridgeError::FillThreadPanicked)?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Consumer half
pub struct BridgeReader {
    shared: Arc<Shared>,
    /// Head-of-line chunk; always holds unread bytes when present
    current: Option<Chunk>,
}

impl BridgeReader {
    /// Copy up to `buf.len()` bytes, blocking until the buffer is full or the
    /// stream ends
    ///
    /// Returns fewer bytes than requested only at end-of-stream; returns 0
    /// once the producer has signaled completion and everything was read.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut read = 0;
        while read < buf.len() {
            if self.current.is_none() {
                self.current = self.shared.queue.dequeue_blocking();
            }
            let Some(chunk) = self.current.as_mut() else {
                break;
            };

            read += chunk.copy_to(&mut buf[read..]);

            if chunk.is_drained() {
                if let Some(drained) = self.current.take() {
                    if drained.is_pool_owned() {
                        self.shared.pool.release(drained);
                    }
                }
            }
        }

        self.shared
            .counters
            .bytes_read
            .fetch_add(read as u64, Ordering::Relaxed);
        read
    }

    /// Read until end-of-stream, appending to `out`
    pub fn drain_to_end(&mut self, out: &mut Vec<u8>) -> usize {
        let mut buf = vec![0u8; self.shared.pool.chunk_size()];
        let mut total = 0;
        loop {
            let n = BridgeReader::read(self, &mut buf);
            if n == 0 {
                return total;
            }
            out.extend_from_slice(&buf[..n]);
            total += n;
        }
    }

    /// True once the stream has ended and every byte was read
    pub fn is_completed(&self) -> bool {
        self.current.is_none() && self.shared.queue.is_completed()
    }

    pub fn stats(&self) -> BridgeStats {
        self.shared.stats()
    }
}

impl Read for BridgeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(BridgeReader::read(self, buf))
    }
}

impl Drop for BridgeReader {
    fn drop(&mut self) {
        // Nobody will consume what is left: stop further fills, then give
        // pooled chunks back.
        self.shared.queue.signal_completion();
        let pending = self.shared.queue.take_pending();
        for mut chunk in self.current.take().into_iter().chain(pending) {
            if chunk.is_pool_owned() {
                chunk.clear();
                self.shared.pool.release(chunk);
            }
        }
    }
}

/// Bridge statistics snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BridgeStats {
    pub chunks_enqueued: u64,
    pub bytes_enqueued: u64,
    pub bytes_read: u64,
    pub queued_chunks: usize,
    pub completed: bool,
    pub pool: PoolStats,
}

impl BridgeStats {
    /// Serialize for diagnostics output
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
