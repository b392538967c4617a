//! Catalog error types.

use common::ErrorKind;
use thiserror::Error;

/// Errors raised by catalog store implementations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The relational store failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// Classifies the error for the request layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Database(_) => ErrorKind::Infrastructure,
        }
    }
}
