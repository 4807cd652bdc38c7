//! Compiler configuration.
//!
//! All configuration is driven by environment variables.

use std::env;

/// Settings applied to every compiled request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrudConfig {
    /// Prepended to every logical table name.
    pub table_prefix: String,
    /// Request strongly consistent reads for get, query and scan.
    pub consistent_read: bool,
    /// Upper bound on pages drained for a non-paging query or scan.
    pub max_pages: Option<usize>,
}

impl CrudConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            table_prefix: env::var("CRUDSTACK_TABLE_PREFIX").unwrap_or_default(),
            consistent_read: env_bool("CRUDSTACK_CONSISTENT_READ", false),
            max_pages: env::var("CRUDSTACK_MAX_PAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0),
        }
    }

    /// Physical table name for a logical one.
    #[must_use]
    pub fn physical_table_name(&self, table: &str) -> String {
        format!("{}{table}", self.table_prefix)
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
