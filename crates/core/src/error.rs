//! Unified error types for the Wallai offline shell.
//!
//! Every variant renders as `CODE: detail`; [`Error::code`] exposes the bare
//! code for structured JSON error bodies.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the cache, worker and budget layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., caching a non-GET request).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unsupported URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Network failure: no connectivity, DNS failure, timeout, reset.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Response body exceeded the configured limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error status surfaced to a caller that requires success.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Precache population failed; nothing was written.
    #[error("PRECACHE_FAILED: {0}")]
    PrecacheFailed(String),

    /// Lifecycle operation called from the wrong worker state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// No usable response was available, neither from the network nor the cache.
    #[error("OFFLINE_ERROR: {0}")]
    Offline(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// CSRF token not configured for a mutating request.
    #[error("CSRF_MISSING: CSRF token not found")]
    CsrfMissing,

    /// Server answered with an unexpected body.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),
}

impl Error {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Network(_) => "NETWORK_ERROR",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::HttpError(_) => "HTTP_ERROR",
            Error::PrecacheFailed(_) => "PRECACHE_FAILED",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::Offline(_) => "OFFLINE_ERROR",
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => "CACHE_ERROR",
            Error::CsrfMissing => "CSRF_MISSING",
            Error::Parse(_) => "PARSE_ERROR",
        }
    }

    /// True for failures where the network could not deliver any response.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Offline("no cached copy".to_string());
        assert!(err.to_string().starts_with("OFFLINE_ERROR"));
        assert!(err.to_string().contains("no cached copy"));
    }

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Network("dns".into()).code(), "NETWORK_ERROR");
        assert_eq!(Error::CorruptEntry("x".into()).code(), "CACHE_ERROR");
        assert_eq!(Error::CsrfMissing.code(), "CSRF_MISSING");
    }

    #[test]
    fn test_is_network() {
        assert!(Error::Network("reset".into()).is_network());
        assert!(!Error::HttpError("status 500".into()).is_network());
    }
}
