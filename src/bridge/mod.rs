/*!
 * Bridge Module
 * Buffered cross-thread transport from a pull-based byte source to a blocking reader
 */

pub mod chunk;
pub mod pool;
pub mod queue;
pub mod source;
pub mod stream;

// Re-export public API
pub use chunk::{Chunk, Provenance};
pub use pool::{ChunkPool, PoolStats};
pub use queue::{ChunkQueue, Dequeue};
pub use source::{CancellableSource, ReaderSource, SourceRead, ThreadedSource};
pub use stream::{BridgeReader, BridgeStats, BridgeWriter, FillHandle, StreamBridge};
