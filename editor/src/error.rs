//! Error types for the recommender client.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the recommender server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },

    /// The record was saved but the server could not rebuild the index.
    #[error("saved, but the index is stale: {0}")]
    StaleIndex(String),

    /// A field was empty; nothing was sent.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// The server URL could not be used.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    /// Transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// HTTP status of a server-side failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::StaleIndex(_) => Some(500),
            _ => None,
        }
    }
}
