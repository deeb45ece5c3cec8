//! Error types for ONTAP REST calls.
//!
//! REST failures are classified into the gateway categories the apply
//! driver understands: a missing entry, a conflict, a rejected request, or an
//! unreachable cluster.

use declarative::{ErrorCategory, GatewayError};
use thiserror::Error;

/// ONTAP error code for "entry doesn't exist"
const ENTRY_NOT_FOUND_CODE: &str = "4";

/// Errors that can occur talking to the ONTAP REST API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The cluster answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// ONTAP error code from the response body, if any
        code: Option<String>,
        /// ONTAP error message, or the raw body
        message: String,
    },

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// An asynchronous job ended in failure
    #[error("job {uuid} failed: {message}")]
    JobFailed {
        /// Job identifier
        uuid: String,
        /// ONTAP error code reported by the job, if any
        code: Option<String>,
        /// Failure message reported by the job
        message: String,
    },

    /// An asynchronous job did not reach a terminal state in time
    #[error("job {uuid} did not finish within {timeout_secs}s")]
    JobTimeout {
        /// Job identifier
        uuid: String,
        /// Configured job timeout
        timeout_secs: u64,
    },

    /// The named SVM does not exist on the cluster
    #[error("SVM not found: {0}")]
    SvmNotFound(String),
}

impl ClientError {
    /// Get the gateway category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api { status, code, .. } => {
                if *status == 404 || code.as_deref() == Some(ENTRY_NOT_FOUND_CODE) {
                    ErrorCategory::NotFound
                } else if *status == 409 {
                    ErrorCategory::Conflict
                } else if (400..500).contains(status) {
                    ErrorCategory::Rejected
                } else {
                    ErrorCategory::Unavailable
                }
            }
            Self::Transport(_) | Self::InvalidResponse(_) | Self::JobTimeout { .. } => {
                ErrorCategory::Unavailable
            }
            Self::JobFailed { code, .. } => {
                if code.as_deref() == Some(ENTRY_NOT_FOUND_CODE) {
                    ErrorCategory::NotFound
                } else {
                    ErrorCategory::Rejected
                }
            }
            Self::SvmNotFound(_) => ErrorCategory::NotFound,
        }
    }
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        let message = err.to_string();
        match err.category() {
            ErrorCategory::NotFound => Self::NotFound { message },
            ErrorCategory::Conflict => Self::Conflict { message },
            ErrorCategory::Rejected => Self::Rejected { message },
            ErrorCategory::Unavailable => Self::Unavailable { message },
        }
    }
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::Api {
                status,
                code: None,
                message: format!("HTTP {status}"),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
