//! Per-cache-instance configuration

use crate::error::{CacheError, CacheResult};

/// Default maximum entry count for the in-process tier
const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Configuration for a cache instance
///
/// `max_entries` only applies to the in-process tier; remote tiers bound
/// their own storage behind their protocol.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Identifier used for logging and registration
    pub name: String,
    /// Maximum entry count for the in-process tier
    pub max_entries: usize,
    /// Whether stale responses may be served within their grace windows
    pub allow_stale_response: bool,
}

impl CacheConfig {
    /// Create a configuration with defaults
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_entries: DEFAULT_MAX_ENTRIES,
            allow_stale_response: true,
        }
    }

    /// Set the maximum entry count for the in-process tier
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Enable or disable serving stale responses
    pub fn with_allow_stale_response(mut self, allow: bool) -> Self {
        self.allow_stale_response = allow;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> CacheResult<()> {
        if self.name.is_empty() {
            return Err(CacheError::InvalidConfiguration(
                "cache name must not be empty".to_string(),
            ));
        }
        if self.max_entries == 0 {
            return Err(CacheError::InvalidConfiguration(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::new("responses");
        assert_eq!(config.name, "responses");
        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
        assert!(config.allow_stale_response);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = CacheConfig::new("small")
            .with_max_entries(4)
            .with_allow_stale_response(false);
        assert_eq!(config.max_entries, 4);
        assert!(!config.allow_stale_response);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(CacheConfig::new("").validate().is_err());
        assert!(CacheConfig::new("x").with_max_entries(0).validate().is_err());
    }
}
