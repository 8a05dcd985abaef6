/*!
 * Bridge Limits and Constants
 *
 * Centralized location for chunk sizing bounds and thread naming.
 *
 * ## Design Philosophy
 * - Values are grouped by domain (chunks, threads)
 * - Performance-critical constants are marked with [PERF]
 */

// =============================================================================
// CHUNK LIMITS
// =============================================================================

/// Default pooled chunk capacity (8KB)
/// One fill-from-source call reads at most this many bytes
/// [PERF] Matches typical OS pipe buffer granularity
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Smallest configurable chunk capacity (64 bytes)
/// Below this, per-chunk queue overhead dominates the copy cost
pub const MIN_CHUNK_SIZE: usize = 64;

/// Largest configurable chunk capacity (16MB)
/// The pool is unbounded, so oversized chunks multiply memory use quickly
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// THREADS
// =============================================================================

/// Name of the background thread performing blocking source reads
pub const READER_THREAD_NAME: &str = "pipe-bridge-reader";

/// Default name of the background thread driving the fill loop
pub const FILL_THREAD_NAME: &str = "pipe-bridge-fill";

/// Name of the timer thread behind `CancellationToken::cancel_after`
pub const CANCEL_TIMER_THREAD_NAME: &str = "pipe-bridge-cancel-timer";

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides the chunk capacity in `BridgeConfig::from_env`
pub const CHUNK_SIZE_ENV: &str = "PIPE_BRIDGE_CHUNK_SIZE";

/// Enables JSON trace output in `init_tracing`
pub const TRACE_JSON_ENV: &str = "PIPE_BRIDGE_TRACE_JSON";
