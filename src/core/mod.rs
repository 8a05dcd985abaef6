/*!
 * Core Module
 * Fundamental bridge types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod sync;

// Re-export for convenience
pub use config::BridgeConfig;
pub use errors::*;
pub use sync::CancellationToken;
