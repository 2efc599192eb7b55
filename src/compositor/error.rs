use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot allocate a {0}x{1} canvas")]
    EmptyCanvas(u32, u32),

    #[error("Encode error: {0}")]
    EncodeError(#[from] image::ImageError),

    #[error("Render task failed: {0}")]
    TaskError(String),
}
