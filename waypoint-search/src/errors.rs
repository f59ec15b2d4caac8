//! The tagged error type crossing every provider boundary.
//!
//! Providers never let a transport or runtime error escape `search_places`,
//! `initialize`, or `health_check`; everything is translated into
//! [`ProviderError`] here. The `status_code` and `kind` fields exist so a
//! hosting layer can derive its own transport-level response without
//! inspecting message strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy shared by every provider and the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The request was malformed or failed validation.
    InvalidRequest,
    /// Credentials missing, rejected, or permission denied upstream.
    AuthenticationFailed,
    /// The upstream rate limit tripped for this caller.
    RateLimitExceeded,
    /// The backend cannot currently serve requests.
    ServiceUnavailable,
    /// The per-call deadline elapsed before a response arrived.
    Timeout,
    /// Transport-level failure before any upstream response.
    NetworkError,
    /// The upstream usage quota is exhausted.
    QuotaExceeded,
    /// Anything the taxonomy does not classify.
    UnknownError,
}

impl ProviderErrorKind {
    /// HTTP status code a hosting layer would typically map this kind to.
    pub fn default_status_code(self) -> u16 {
        match self {
            ProviderErrorKind::InvalidRequest => 400,
            ProviderErrorKind::AuthenticationFailed => 401,
            ProviderErrorKind::RateLimitExceeded => 429,
            ProviderErrorKind::ServiceUnavailable => 503,
            ProviderErrorKind::Timeout => 504,
            ProviderErrorKind::NetworkError => 502,
            ProviderErrorKind::QuotaExceeded => 429,
            ProviderErrorKind::UnknownError => 500,
        }
    }

    /// Whether a failure of this kind is worth retrying by default.
    pub fn default_retryable(self) -> bool {
        matches!(
            self,
            ProviderErrorKind::ServiceUnavailable
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::NetworkError
        )
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderErrorKind::InvalidRequest => "invalid_request",
            ProviderErrorKind::AuthenticationFailed => "authentication_failed",
            ProviderErrorKind::RateLimitExceeded => "rate_limit_exceeded",
            ProviderErrorKind::ServiceUnavailable => "service_unavailable",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::NetworkError => "network_error",
            ProviderErrorKind::QuotaExceeded => "quota_exceeded",
            ProviderErrorKind::UnknownError => "unknown_error",
        };
        write!(f, "{name}")
    }
}

/// The only error shape that crosses the provider boundary.
#[derive(Debug, Error)]
#[error("[{provider}] {kind}: {message}")]
pub struct ProviderError {
    /// Classified failure kind.
    pub kind: ProviderErrorKind,
    /// Suggested HTTP status for a hosting layer.
    pub status_code: u16,
    /// Whether retrying the operation may succeed.
    pub retryable: bool,
    /// Name of the provider (or `"factory"`) that produced the error.
    pub provider: String,
    /// Human-readable failure description.
    pub message: String,
    /// Underlying error, when one exists.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates an error of the given kind with its default status code and
    /// retryability.
    pub fn new(
        kind: ProviderErrorKind,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            status_code: kind.default_status_code(),
            retryable: kind.default_retryable(),
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying error.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Overrides the retryable flag.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Overrides the status code.
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Classifies a non-2xx upstream HTTP status.
    ///
    /// Retryable is true only for statuses >= 500; the reported status code
    /// is the upstream one, not the kind's default.
    pub fn from_http_status(status: u16, provider: impl Into<String>) -> Self {
        let kind = match status {
            400 => ProviderErrorKind::InvalidRequest,
            401 | 403 => ProviderErrorKind::AuthenticationFailed,
            429 => ProviderErrorKind::RateLimitExceeded,
            500 | 502 | 503 => ProviderErrorKind::ServiceUnavailable,
            504 => ProviderErrorKind::Timeout,
            _ => ProviderErrorKind::UnknownError,
        };

        Self::new(kind, provider, format!("Upstream returned HTTP {status}"))
            .with_status_code(status)
            .with_retryable(status >= 500)
    }

    /// Classifies a soft error status reported inside a successful upstream
    /// payload. `"OK"` and `"ZERO_RESULTS"` never reach this function.
    pub fn from_search_status(
        status: &str,
        error_message: Option<&str>,
        provider: impl Into<String>,
    ) -> Self {
        let kind = match status {
            "OVER_QUERY_LIMIT" => ProviderErrorKind::QuotaExceeded,
            "INVALID_REQUEST" => ProviderErrorKind::InvalidRequest,
            "REQUEST_DENIED" => ProviderErrorKind::AuthenticationFailed,
            _ => ProviderErrorKind::ServiceUnavailable,
        };

        let message = match error_message {
            Some(detail) => format!("Upstream status {status}: {detail}"),
            None => format!("Upstream status {status}"),
        };

        Self::new(kind, provider, message)
    }

    /// Shorthand for an invalid-request error.
    pub fn invalid_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, provider, message)
    }

    /// Shorthand for an authentication failure.
    pub fn authentication_failed(
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ProviderErrorKind::AuthenticationFailed, provider, message)
    }

    /// Shorthand for a service-unavailable error.
    pub fn service_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ServiceUnavailable, provider, message)
    }

    /// Shorthand for a deadline-elapsed error.
    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, provider, message)
    }

    /// Shorthand for a transport failure.
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NetworkError, provider, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_kind() {
        let error = ProviderError::new(ProviderErrorKind::RateLimitExceeded, "mock", "slow down");
        assert_eq!(error.status_code, 429);
        assert!(!error.retryable);

        let error = ProviderError::timeout("mock", "deadline elapsed");
        assert_eq!(error.status_code, 504);
        assert!(error.retryable);
    }

    #[test]
    fn test_http_status_mapping() {
        let cases = [
            (400, ProviderErrorKind::InvalidRequest, false),
            (401, ProviderErrorKind::AuthenticationFailed, false),
            (403, ProviderErrorKind::AuthenticationFailed, false),
            (429, ProviderErrorKind::RateLimitExceeded, false),
            (500, ProviderErrorKind::ServiceUnavailable, true),
            (502, ProviderErrorKind::ServiceUnavailable, true),
            (503, ProviderErrorKind::ServiceUnavailable, true),
            (504, ProviderErrorKind::Timeout, true),
            (418, ProviderErrorKind::UnknownError, false),
            (501, ProviderErrorKind::UnknownError, true),
        ];

        for (status, kind, retryable) in cases {
            let error = ProviderError::from_http_status(status, "google_places");
            assert_eq!(error.kind, kind, "status {status}");
            assert_eq!(error.retryable, retryable, "status {status}");
            assert_eq!(error.status_code, status);
        }
    }

    #[test]
    fn test_soft_status_mapping() {
        let error = ProviderError::from_search_status("OVER_QUERY_LIMIT", None, "google_places");
        assert_eq!(error.kind, ProviderErrorKind::QuotaExceeded);
        assert!(!error.retryable);

        let error =
            ProviderError::from_search_status("REQUEST_DENIED", Some("bad key"), "google_places");
        assert_eq!(error.kind, ProviderErrorKind::AuthenticationFailed);
        assert!(error.message.contains("bad key"));

        let error = ProviderError::from_search_status("SOMETHING_NEW", None, "google_places");
        assert_eq!(error.kind, ProviderErrorKind::ServiceUnavailable);
        assert!(error.retryable);
    }

    #[test]
    fn test_display_includes_provider_and_kind() {
        let error = ProviderError::invalid_request("factory", "query must not be empty");
        let rendered = error.to_string();
        assert!(rendered.contains("factory"));
        assert!(rendered.contains("invalid_request"));
        assert!(rendered.contains("query must not be empty"));
    }
}
