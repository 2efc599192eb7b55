use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    StatusError(u16),

    #[error("Response has no place name")]
    MissingPlace,

    #[error("Geocoding is disabled")]
    Offline,

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}
