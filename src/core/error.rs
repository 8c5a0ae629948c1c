/// Errors a generation attempt can end with.
///
/// Transport failures (`Backend*`) come from a capability, parse-level failures
/// (`MalformedResponse`, `IncompleteBatch`, `DuplicateDetected`) come from the
/// engine itself and are remedied by re-dispatching the request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Authentication failed, check the API key: {0}")]
    BackendAuth(String),

    #[error("Rate limited by the backend, try again shortly: {0}")]
    BackendRateLimited(String),

    #[error("Backend server error (HTTP {status}): {message}")]
    BackendServer { status: u16, message: String },

    #[error("Backend rejected the request: {0}")]
    BackendInvalidRequest(String),

    #[error("Backend error: {0}")]
    BackendGeneric(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Incomplete batch: expected {expected} stories, got {actual}")]
    IncompleteBatch { expected: usize, actual: usize },

    #[error(
        "Near-duplicate stories detected: #{} and #{} are {:.1}% similar",
        .first + 1,
        .second + 1,
        .similarity * 100.0
    )]
    DuplicateDetected {
        first: usize,
        second: usize,
        similarity: f64,
    },
}

pub type Result<T> = std::result::Result<T, GenerationError>;

impl GenerationError {
    /// Maps an HTTP status from a vendor envelope into the shared taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::BackendAuth(message),
            429 => Self::BackendRateLimited(message),
            400 | 404 | 413 | 422 => Self::BackendInvalidRequest(message),
            500..=599 => Self::BackendServer { status, message },
            _ => Self::BackendGeneric(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Whether the dispatcher may retry the same call after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendRateLimited(_) | Self::BackendServer { .. } | Self::BackendGeneric(_)
        )
    }

    /// Whether the reply was delivered but unusable, so the request should be sent again.
    pub fn needs_redispatch(&self) -> bool {
        matches!(
            self,
            Self::MalformedResponse(_) | Self::IncompleteBatch { .. } | Self::DuplicateDetected { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Message for a transient notification. `None` means stay silent.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Cancelled => None,
            other => Some(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::from_status(status.as_u16(), e.to_string()),
            None => Self::BackendGeneric(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_taxonomy() {
        assert_eq!(
            GenerationError::from_status(401, "bad key"),
            GenerationError::BackendAuth("bad key".to_string())
        );
        assert!(matches!(
            GenerationError::from_status(403, ""),
            GenerationError::BackendAuth(_)
        ));
        assert!(matches!(
            GenerationError::from_status(429, ""),
            GenerationError::BackendRateLimited(_)
        ));
        assert!(matches!(
            GenerationError::from_status(503, ""),
            GenerationError::BackendServer { status: 503, .. }
        ));
        assert!(matches!(
            GenerationError::from_status(400, ""),
            GenerationError::BackendInvalidRequest(_)
        ));
        assert!(matches!(
            GenerationError::from_status(418, ""),
            GenerationError::BackendGeneric(_)
        ));
    }

    #[test]
    fn test_retry_classification() {
        assert!(GenerationError::from_status(500, "").is_retryable());
        assert!(GenerationError::from_status(429, "").is_retryable());
        assert!(!GenerationError::from_status(401, "").is_retryable());
        assert!(!GenerationError::from_status(400, "").is_retryable());
        assert!(!GenerationError::Cancelled.is_retryable());
        assert!(!GenerationError::MalformedResponse("x".into()).is_retryable());

        assert!(GenerationError::IncompleteBatch { expected: 3, actual: 2 }.needs_redispatch());
        assert!(!GenerationError::BackendAuth(String::new()).needs_redispatch());
    }

    #[test]
    fn test_duplicate_message_reports_percentage() {
        let err = GenerationError::DuplicateDetected {
            first: 0,
            second: 2,
            similarity: 0.8,
        };
        assert_eq!(
            err.to_string(),
            "Near-duplicate stories detected: #1 and #3 are 80.0% similar"
        );
    }

    #[test]
    fn test_cancelled_is_silent() {
        assert_eq!(GenerationError::Cancelled.user_message(), None);
        assert!(GenerationError::BackendGeneric("boom".into()).user_message().is_some());
    }
}
