//! Error types for the perun-core library

use thiserror::Error;

/// Main error type for perun operations
#[derive(Error, Debug)]
pub enum PerunError {
    /// The backend answered with a non-2xx status
    #[error("{message}: {status} {status_text}")]
    Api {
        message: String,
        status: u16,
        status_text: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias for perun operations
pub type Result<T> = std::result::Result<T, PerunError>;

impl PerunError {
    /// Wrap a failed HTTP response the way the banner shows it.
    pub fn api(message: impl Into<String>, status: reqwest::StatusCode) -> Self {
        PerunError::Api {
            message: message.into(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
        }
    }

    /// HTTP status of an API failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PerunError::Api { status, .. } => Some(*status),
            PerunError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the error belongs in a dismissible banner.
    ///
    /// Media and timestamp problems degrade a single widget instead.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, PerunError::Media(_) | PerunError::Timestamp(_))
    }
}

impl From<hound::Error> for PerunError {
    fn from(err: hound::Error) -> Self {
        PerunError::Media(err.to_string())
    }
}

impl From<symphonia::core::errors::Error> for PerunError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        PerunError::Media(err.to_string())
    }
}

impl PartialEq for PerunError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                PerunError::Api {
                    message: m1,
                    status: s1,
                    status_text: t1,
                },
                PerunError::Api {
                    message: m2,
                    status: s2,
                    status_text: t2,
                },
            ) => m1 == m2 && s1 == s2 && t1 == t2,
            (PerunError::Http(a), PerunError::Http(b)) => a.to_string() == b.to_string(),
            (PerunError::Json(a), PerunError::Json(b)) => a.to_string() == b.to_string(),
            (PerunError::Io(a), PerunError::Io(b)) => a.to_string() == b.to_string(),
            (PerunError::Media(a), PerunError::Media(b)) => a == b,
            (PerunError::Timestamp(a), PerunError::Timestamp(b)) => a == b,
            (PerunError::Configuration(a), PerunError::Configuration(b)) => a == b,
            (PerunError::Storage(a), PerunError::Storage(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_carries_status_text() {
        let err = PerunError::api("Failed to fetch batch", reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Failed to fetch batch: 404 Not Found");
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_media_errors_stay_local() {
        assert!(!PerunError::Media("autoplay blocked".into()).is_user_facing());
        assert_eq!(PerunError::Media("a".into()).status(), None);
    }
}
