/*!
 * Pipe Bridge
 *
 * Buffered, cross-thread transport that turns a pull-based byte source (an
 * interprocess pipe) into a queue of pooled chunks, served to a consumer
 * through a blocking read.
 */

pub mod bridge;
pub mod core;
pub mod monitoring;

// Re-exports
pub use bridge::{
    BridgeReader, BridgeStats, BridgeWriter, CancellableSource, Chunk, ChunkPool, ChunkQueue,
    FillHandle, PoolStats, Provenance, ReaderSource, SourceRead, StreamBridge, ThreadedSource,
};
pub use self::core::{BridgeConfig, BridgeError, BridgeResult, CancellationToken};
pub use monitoring::init_tracing;
