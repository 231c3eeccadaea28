//! Error types for the cobranca client library.

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, CobrancaError>;

/// All errors that can occur while talking to the cobranca API.
#[derive(Debug, thiserror::Error)]
pub enum CobrancaError {
    /// The HTTP exchange itself failed (connection, timeout, TLS, body read).
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A builder or configuration input is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CobrancaError {
    /// Returns the HTTP status for [`CobrancaError::Api`] errors.
    #[inline]
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match *self {
            Self::Api { status, .. } => Some(status),
            #[cfg(any(feature = "async", feature = "blocking"))]
            Self::Http(_) => None,
            Self::Serialization(_) | Self::Config(_) => None,
        }
    }
}
