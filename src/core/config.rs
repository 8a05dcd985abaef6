/*!
 * Bridge Configuration
 *
 * Runtime configuration for chunk sizing and background threads
 */

use super::errors::{BridgeError, BridgeResult};
use super::limits::{
    CHUNK_SIZE_ENV, DEFAULT_CHUNK_SIZE, FILL_THREAD_NAME, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};
use tracing::warn;

/// Stream bridge configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Capacity of every pooled chunk
    pub chunk_size: usize,
    /// Thread name used by `BridgeWriter::spawn_fill_loop`
    pub fill_thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fill_thread_name: FILL_THREAD_NAME.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Override the pooled chunk capacity
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Override the fill loop thread name
    pub fn with_fill_thread_name(mut self, name: impl Into<String>) -> Self {
        self.fill_thread_name = name.into();
        self
    }

    /// Defaults with environment overrides applied
    ///
    /// Environment variables:
    /// - PIPE_BRIDGE_CHUNK_SIZE: pooled chunk capacity in bytes
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(CHUNK_SIZE_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(size) => config.chunk_size = size,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring unparsable {}", CHUNK_SIZE_ENV),
            }
        }
        config
    }

    /// Reject chunk sizes outside the supported bounds
    pub fn validate(&self) -> BridgeResult<()> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(BridgeError::InvalidConfig(format!(
                "chunk size {} outside {}..={}",
                self.chunk_size, MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BridgeConfig::default();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_chunk_size() {
        let too_small = BridgeConfig::default().with_chunk_size(MIN_CHUNK_SIZE - 1);
        assert!(matches!(too_small.validate(), Err(BridgeError::InvalidConfig(_))));

        let too_large = BridgeConfig::default().with_chunk_size(MAX_CHUNK_SIZE + 1);
        assert!(matches!(too_large.validate(), Err(BridgeError::InvalidConfig(_))));

        let bounds = BridgeConfig::default().with_chunk_size(MIN_CHUNK_SIZE);
        assert!(bounds.validate().is_ok());
    }
}
