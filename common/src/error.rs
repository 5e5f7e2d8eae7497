use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Generation error: {0}")]
    Generation(String),
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing error: {0}")]
    Processing(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn document_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("Document {id} was not found"))
    }

    /// True for the optimistic-concurrency failures SurrealDB reports when two
    /// transactions touch the same keys; the whole statement can be re-run.
    pub fn is_retryable_conflict(&self) -> bool {
        matches!(self, Self::Database(err) if err
            .to_string()
            .contains("Failed to commit transaction due to a read or write conflict"))
    }
}
