//! Error types for the runners.

use thiserror::Error;
use workload_core::ConfigError;
use workload_template::TemplateError;

/// Errors raised by a document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// MongoDB connection or query error.
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    /// Failure reported by a non-MongoDB store.
    #[error("Store error: {0}")]
    Other(String),
}

/// Errors that end a runner invocation.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Malformed or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configured mode is not implemented.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Database operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Worker task panicked, was cancelled, or the pool is closed.
    #[error("Concurrency error: {0}")]
    Concurrency(String),
}

impl RunnerError {
    /// Whether this is a configuration-class error.
    ///
    /// These do not go away by retrying: the step has to be fixed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RunnerError::Config(_) | RunnerError::Unsupported(_) | RunnerError::Template(_)
        )
    }
}
