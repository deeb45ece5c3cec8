//! Error types for reconciliation and apply cycles.
//!
//! Gateway errors are categorized so the apply driver can tell a recoverable
//! outcome (deleting something already gone) from a fatal one.

use std::fmt;
use thiserror::Error;

/// Categories of remote gateway errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The addressed sub-resource does not exist
    NotFound,
    /// The remote refused because of conflicting existing state
    Conflict,
    /// The remote rejected the request as invalid or forbidden
    Rejected,
    /// Transport-level failure or remote unavailable
    Unavailable,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Sub-resource not found",
            Self::Conflict => "Conflicting remote state",
            Self::Rejected => "Request rejected",
            Self::Unavailable => "Remote unavailable",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Refresh recorded state and apply again",
            Self::Conflict => "Refresh recorded state so the next plan sees the remote entry",
            Self::Rejected => "Check the declared values and account privileges",
            Self::Unavailable => "Check connectivity to the remote system and apply again",
        }
    }
}

/// Errors returned by a remote sub-resource gateway.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The addressed sub-resource does not exist
    #[error("not found: {message}")]
    NotFound {
        /// Detail reported by the remote
        message: String,
    },

    /// The remote already holds conflicting state
    #[error("conflict: {message}")]
    Conflict {
        /// Detail reported by the remote
        message: String,
    },

    /// The remote rejected the request
    #[error("rejected: {message}")]
    Rejected {
        /// Detail reported by the remote
        message: String,
    },

    /// Transport failure or remote unavailable
    #[error("unavailable: {message}")]
    Unavailable {
        /// Transport or remote detail
        message: String,
    },
}

impl GatewayError {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Rejected { .. } => ErrorCategory::Rejected,
            Self::Unavailable { .. } => ErrorCategory::Unavailable,
        }
    }

    /// Whether the addressed sub-resource was reported absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Shorthand constructors
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Errors raised while computing a reconciliation plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The desired collection declares the same key more than once
    #[error("duplicate key in desired collection: {key}")]
    DuplicateKey {
        /// Display form of the repeated key
        key: String,
    },
}

/// Kind of a plan operation, used to give failures context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Fatal errors ending an apply cycle.
#[derive(Debug, Clone, Error)]
pub enum ApplyError {
    /// The plan could not be computed
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// A gateway call failed; the rest of the plan was not attempted
    #[error("failed to {kind} {key}: {source}")]
    Operation {
        /// Which operation failed
        kind: OperationKind,
        /// Display form of the key the operation addressed
        key: String,
        /// Underlying gateway error
        source: GatewayError,
    },
}

impl ApplyError {
    /// Category of the underlying gateway error, if any.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Reconcile(_) => None,
            Self::Operation { source, .. } => Some(source.category()),
        }
    }
}

/// Result type for gateway calls.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
