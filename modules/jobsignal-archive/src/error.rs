/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Why a fetch produced nothing. Connectors never surface these; they decide
/// whether to retry and then fall back to an empty result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Unreadable body: {0}")]
    Body(String),
}

impl FetchError {
    /// Worth retrying: timeouts, connection failures, throttling and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
            FetchError::Body(_) => false,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else if err.is_body() || err.is_decode() {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
