//! Database-specific error types and conversions.

use quotaplane_core::error::QuotaplaneError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for QuotaplaneError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => QuotaplaneError::NotFound { entity, id },
            other => QuotaplaneError::Database(other.to_string()),
        }
    }
}
