//! Context error taxonomy.

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors surfaced by a [`BookContext`](crate::context::BookContext).
///
/// Constraint violations are reported by the store at write time and
/// translated here; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Duplicate key for {entity}: {key}")]
    DuplicateKey { entity: &'static str, key: String },

    #[error("Cannot delete {entity} {key}: still referenced by {referenced_by}")]
    RestrictedDelete {
        entity: &'static str,
        key: String,
        referenced_by: String,
    },

    #[error("Foreign key violation writing {entity}: {message}")]
    ForeignKey { entity: &'static str, message: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid value in column {column}: {message}")]
    InvalidRow {
        column: &'static str,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Whether the store rejected a write for repeating an existing key.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() || db.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}

/// Whether the store rejected a write on referential integrity.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_foreign_key_violation() || db.message().contains("FOREIGN KEY constraint failed")
        }
        _ => false,
    }
}
