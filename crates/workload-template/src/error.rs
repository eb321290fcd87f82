//! Error types for template rendering.

/// Error type for template operations.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// `$gen` expression does not describe a generator
    #[error("Invalid generator expression: {0}")]
    InvalidExpression(#[from] bson::de::Error),

    /// Template not defined in the workload
    #[error("Template not found: {0}")]
    UnknownTemplate(String),

    /// Generator references an undefined dictionary
    #[error("Dictionary not found: {0}")]
    UnknownDictionary(String),

    /// Generator parameters that cannot produce a value
    #[error("Invalid {generator} generator: {reason}")]
    InvalidGenerator {
        generator: &'static str,
        reason: String,
    },

    /// Rendered value has the wrong shape for its use
    #[error("Expression for '{field}' rendered to {found}, expected {expected}")]
    UnexpectedShape {
        field: String,
        expected: &'static str,
        found: String,
    },
}
