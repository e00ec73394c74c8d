//! Labels API errors

use thiserror::Error;

/// How a failed fetch is handled at the view boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 401: show the license notice and stop
    Authorization,
    /// Anything else: re-raised to the host
    Other,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request rejected with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("label {0:?} has no id")]
    MissingId(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Status { status: 401, .. } => FailureKind::Authorization,
            _ => FailureKind::Other,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == FailureKind::Authorization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_401_is_authorization_failure() {
        assert_eq!(ApiError::status(401, "license").kind(), FailureKind::Authorization);
        assert!(ApiError::status(401, "").is_unauthorized());
    }

    #[test]
    fn test_other_statuses_are_other_failures() {
        for status in [400, 403, 404, 500, 503] {
            assert_eq!(ApiError::status(status, "").kind(), FailureKind::Other);
        }
        assert_eq!(ApiError::InvalidUrl("x".into()).kind(), FailureKind::Other);
        assert_eq!(ApiError::MissingId("bug".into()).kind(), FailureKind::Other);
    }

    #[test]
    fn test_display() {
        let err = ApiError::status(500, "boom");
        assert_eq!(err.to_string(), "request rejected with status 500: boom");
    }
}
