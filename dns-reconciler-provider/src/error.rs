use serde::{Deserialize, Serialize};

/// Unified error type for all remote provider operations.
///
/// Each variant includes a `provider` field identifying which provider produced the error,
/// plus variant-specific context. All variants are serializable for structured error reporting.
///
/// # Retryable Errors
///
/// The following variants represent transient failures that may succeed on retry:
/// - [`NetworkError`](Self::NetworkError): network connectivity issues
/// - [`Timeout`](Self::Timeout): request timed out
/// - [`RateLimited`](Self::RateLimited): API rate limit exceeded
///
/// Retrying is the transport's business. The reconciler never retries and treats any
/// error as terminal for the current apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ProviderError {
    /// A network-level error occurred (DNS resolution failure, connection refused, etc.).
    NetworkError {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    Timeout {
        /// Provider that produced the error.
        provider: String,
        /// Error details.
        detail: String,
    },

    /// The API rate limit has been exceeded.
    RateLimited {
        /// Provider that produced the error.
        provider: String,
        /// Suggested wait time in seconds before retrying, if provided by the API.
        retry_after: Option<u64>,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// The authenticated principal lacks permission for the requested operation.
    PermissionDenied {
        /// Provider that produced the error.
        provider: String,
        /// Original error message from the provider API, if available.
        raw_message: Option<String>,
    },

    /// The specified hosted zone was not found.
    HostedZoneNotFound {
        /// Provider that produced the error.
        provider: String,
        /// Zone id that was not found.
        zone_id: String,
    },

    /// The provider rejected a change batch. Nothing in the batch was applied.
    InvalidChangeBatch {
        /// Provider that produced the error.
        provider: String,
        /// One message per offending change.
        messages: Vec<String>,
    },

    /// The specified health check was not found.
    HealthCheckNotFound {
        /// Provider that produced the error.
        provider: String,
        /// Health check id.
        health_check_id: String,
    },

    /// A health check with the same caller reference already exists.
    HealthCheckAlreadyExists {
        /// Provider that produced the error.
        provider: String,
        /// The duplicated caller reference.
        caller_reference: String,
    },

    /// A request parameter is invalid.
    InvalidParameter {
        /// Provider that produced the error.
        provider: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// Failed to parse the provider's API response.
    ParseError {
        /// Provider that produced the error.
        provider: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// An unrecognized error from the provider API.
    Unknown {
        /// Provider that produced the error.
        provider: String,
        /// Raw error code from the API, if available.
        raw_code: Option<String>,
        /// Raw error message from the API.
        raw_message: String,
    },
}

impl ProviderError {
    /// Whether this is expected behavior (bad input, missing resources, rejected
    /// batches), used to pick the log level.
    ///
    /// `true` should be logged at `warn`, `false` at `error`.
    /// **Keep this in sync when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. }
                | Self::HostedZoneNotFound { .. }
                | Self::InvalidChangeBatch { .. }
                | Self::HealthCheckNotFound { .. }
                | Self::HealthCheckAlreadyExists { .. }
                | Self::InvalidParameter { .. }
        )
    }

    /// Whether a transport could reasonably retry the failed call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { provider, detail } => {
                write!(f, "[{provider}] Network error: {detail}")
            }
            Self::Timeout { provider, detail } => {
                write!(f, "[{provider}] Request timeout: {detail}")
            }
            Self::RateLimited {
                provider,
                retry_after,
                ..
            } => {
                if let Some(secs) = retry_after {
                    write!(f, "[{provider}] Rate limited (retry after {secs}s)")
                } else {
                    write!(f, "[{provider}] Rate limited")
                }
            }
            Self::PermissionDenied {
                provider,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "[{provider}] Permission denied: {msg}")
                } else {
                    write!(f, "[{provider}] Permission denied")
                }
            }
            Self::HostedZoneNotFound { provider, zone_id } => {
                write!(f, "[{provider}] Hosted zone '{zone_id}' not found")
            }
            Self::InvalidChangeBatch { provider, messages } => {
                write!(
                    f,
                    "[{provider}] Invalid change batch: {}",
                    messages.join("; ")
                )
            }
            Self::HealthCheckNotFound {
                provider,
                health_check_id,
            } => {
                write!(f, "[{provider}] Health check '{health_check_id}' not found")
            }
            Self::HealthCheckAlreadyExists {
                provider,
                caller_reference,
            } => {
                write!(
                    f,
                    "[{provider}] Health check with reference '{caller_reference}' already exists"
                )
            }
            Self::InvalidParameter {
                provider,
                param,
                detail,
            } => {
                write!(f, "[{provider}] Invalid parameter '{param}': {detail}")
            }
            Self::ParseError { provider, detail } => {
                write!(f, "[{provider}] Parse error: {detail}")
            }
            Self::Unknown {
                provider,
                raw_message,
                ..
            } => {
                write!(f, "[{provider}] {raw_message}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Convenience type alias for `Result<T, ProviderError>`.
pub type Result<T> = std::result::Result<T, ProviderError>;
