//! Error types for the tap service
//!
//! Request-level failures are `ServiceError` and map onto HTTP responses.
//! Chain transport failures are `ChainError` and collapse into
//! `ServiceError::UpstreamUnavailable` or `ServiceError::SubmissionFailed`.
//! Per-log decode failures are `DecodeError`; they are counted and skipped
//! and never fail a request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for request handling
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Chain RPC unreachable, timing out or returning garbage
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Malformed address or payload
    #[error("{0}")]
    InvalidArgument(String),

    /// No sponsor key configured
    #[error("Sponsor disabled")]
    SponsorshipDisabled,

    /// The signed transaction was rejected on submission
    #[error("Transaction submission failed: {0}")]
    SubmissionFailed(String),
}

/// Chain client errors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("RPC request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("{0}")]
    Submission(String),

    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid private key")]
    InvalidPrivateKey,
}

/// Reasons a single log is skipped during aggregation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("log has no topics")]
    MissingTopic,

    #[error("log does not match Clicked: {0}")]
    Abi(String),

    #[error("log was removed by a reorg")]
    Removed,
}

/// Error severity levels for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Transient errors that may resolve on retry
    Transient,
    /// Caller mistakes, nothing for the operator to do
    Warning,
    /// Errors requiring operator attention
    Critical,
}

impl ServiceError {
    /// Get the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ServiceError::UpstreamUnavailable(_) => ErrorSeverity::Transient,
            ServiceError::InvalidArgument(_) => ErrorSeverity::Warning,
            ServiceError::SponsorshipDisabled => ErrorSeverity::Warning,
            ServiceError::SubmissionFailed(_) => ErrorSeverity::Critical,
        }
    }

    /// Get a short error code for metrics/logging
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            ServiceError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ServiceError::SponsorshipDisabled => "SPONSORSHIP_DISABLED",
            ServiceError::SubmissionFailed(_) => "SUBMISSION_FAILED",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidArgument(_) | ServiceError::SponsorshipDisabled => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::UpstreamUnavailable(_) | ServiceError::SubmissionFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ChainError> for ServiceError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Submission(message) => ServiceError::SubmissionFailed(message),
            other => ServiceError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// JSON error body returned to callers
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias using ServiceError
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
