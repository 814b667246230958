//! Storage configuration types.

use serde::Deserialize;

/// In-memory database path understood by [`ContextOptions::connect`](crate::context::ContextOptions::connect).
pub const IN_MEMORY_PATH: &str = ":memory:";

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
    /// Create the database file when it does not exist.
    pub create_if_missing: bool,
    /// Upper bound on pooled connections. In-memory databases always use one.
    pub max_connections: u32,
    /// How long a connection waits on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "bookstore.db".to_string(),
            create_if_missing: true,
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StorageConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}
