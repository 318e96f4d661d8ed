/// Convenience result type used across the crate.
pub type SwrastResult<T> = Result<T, SwrastError>;

/// Top-level error taxonomy used by the rendering context APIs.
#[derive(thiserror::Error, Debug)]
pub enum SwrastError {
    /// Invalid caller-provided data (dimensions, buffer lengths, config).
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation was invoked against a consumer or backend that cannot
    /// support it. A programming error on the caller's side; never retried.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Texture or scratch allocation failed (e.g. device out of memory).
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SwrastError {
    /// Build a [`SwrastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SwrastError::Unsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Build a [`SwrastError::ResourceExhausted`] value.
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }
}
