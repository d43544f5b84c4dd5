use thiserror::Error;

/// Caller-facing failures raised by the core services.
///
/// Services return `anyhow::Result`; these variants travel inside the
/// `anyhow::Error` and are recovered with `downcast_ref` by the HTTP layer
/// to pick a status code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A write request is missing required fields or carries bad values.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }
}
