/*!
 * Monitoring
 * Tracing setup for the bridge
 */

mod tracer;

pub use tracer::init_tracing;
