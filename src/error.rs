//! Error types for the catalog client

use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Error types that can occur while fetching catalog data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be built (malformed URL or parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered with a status outside 200..300
    #[error("Unexpected HTTP status: {0}")]
    BadStatus(u16),

    /// Connection, timeout or body transfer failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The payload does not match the expected schema
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

impl FetchError {
    /// HTTP status code carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::BadStatus(status) => Some(*status),
            _ => None,
        }
    }

    /// Whether the error came from a payload that failed to decode
    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }

    /// Build an error for a non-2xx HTTP status
    ///
    /// Returns `None` for statuses in the success range.
    pub fn from_http_status(status: u16) -> Option<Self> {
        if (200..300).contains(&status) {
            None
        } else {
            Some(FetchError::BadStatus(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert_eq!(FetchError::from_http_status(200), None);
        assert_eq!(FetchError::from_http_status(299), None);
        assert_eq!(
            FetchError::from_http_status(404),
            Some(FetchError::BadStatus(404))
        );
        assert_eq!(
            FetchError::from_http_status(199),
            Some(FetchError::BadStatus(199))
        );
        assert_eq!(
            FetchError::from_http_status(300),
            Some(FetchError::BadStatus(300))
        );
    }

    #[test]
    fn test_status_code() {
        assert_eq!(FetchError::BadStatus(503).status_code(), Some(503));
        assert_eq!(FetchError::Transport("reset".into()).status_code(), None);
    }

    #[test]
    fn test_json_error_is_decode() {
        let err: FetchError = serde_json::from_str::<u32>("\"nope\"").unwrap_err().into();
        assert!(err.is_decode());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FetchError::BadStatus(503).to_string(),
            "Unexpected HTTP status: 503"
        );
        assert_eq!(
            FetchError::InvalidRequest("limit".into()).to_string(),
            "Invalid request: limit"
        );
    }
}
