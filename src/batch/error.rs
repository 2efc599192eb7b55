use crate::compositor::RenderError;
use crate::decode::DecodeError;
use thiserror::Error;

/// Errors that end a whole batch. Per-item problems are [`ItemError`]s and
/// never abort the batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch was cancelled")]
    Cancelled,

    #[error("Batch was superseded by a newer one")]
    Superseded,
}

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("Render error: {0}")]
    RenderError(#[from] RenderError),

    #[error("Worker task failed: {0}")]
    TaskError(String),
}
