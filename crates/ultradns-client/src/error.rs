//! Error types for API connection operations

/// Errors from authenticated API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Authorization failed, or the API answered with a failure status.
    #[error(transparent)]
    Auth(#[from] ultradns_auth::Error),

    /// The request could not be built or sent.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl Error {
    /// The normalized API error, if the server returned one.
    pub fn api(&self) -> Option<&ultradns_auth::ApiError> {
        match self {
            Error::Auth(e) => e.api(),
            Error::Request(_) => None,
        }
    }
}

/// Result alias for API connection operations.
pub type Result<T> = std::result::Result<T, Error>;
