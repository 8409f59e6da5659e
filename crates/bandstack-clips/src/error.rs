//! Clips client error types.

use thiserror::Error;

pub type ClipsResult<T> = Result<T, ClipsError>;

#[derive(Debug, Error)]
pub enum ClipsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
