//! Error types for the PostGIS store.

use agsload_core::StoreError;
use thiserror::Error;

/// Database operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, query, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (runtime setup)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value cannot be written to the column's declared type
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// Target table lacks a column after schema sync
    #[error("Column {column} missing from {table}")]
    MissingColumn { table: String, column: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DbError {
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::with_source(err.to_string(), err)
    }
}
