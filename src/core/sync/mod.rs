/*!
 * Synchronization Primitives
 *
 * Cooperative cancellation for blocking operations.
 */

mod cancel;

pub use cancel::CancellationToken;
