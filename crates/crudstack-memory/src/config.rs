//! Memory engine configuration.

use std::env;

/// Default maximum item size (400 KiB).
pub const DEFAULT_MAX_ITEM_SIZE_BYTES: u64 = 400 * 1024;

/// Memory engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Largest item, in bytes, a write may store.
    pub max_item_size_bytes: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_item_size_bytes: DEFAULT_MAX_ITEM_SIZE_BYTES,
        }
    }
}

impl MemoryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_item_size_bytes: env::var("CRUDSTACK_MEMORY_MAX_ITEM_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_ITEM_SIZE_BYTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_default_to_400_kib() {
        assert_eq!(MemoryConfig::default().max_item_size_bytes, 409_600);
    }
}
