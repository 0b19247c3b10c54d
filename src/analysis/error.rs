//! Failure modes of an analysis call.

use std::time::Duration;

/// The only text end users ever see when an analysis fails.
pub const USER_FACING_FAILURE: &str = "We could not analyze this document. Please try again.";

/// Errors that can occur while analyzing a report.
///
/// The variants carry diagnostic detail for logs. Callers surface
/// [`USER_FACING_FAILURE`] instead of the `Display` output.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The request never produced a response.
    #[error("request to inference service failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("inference service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },

    /// The service answered but produced no candidate text.
    #[error("inference service returned no content ({0})")]
    EmptyResponse(String),

    /// The payload was not JSON.
    #[error("response is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The JSON did not satisfy the analysis result contract.
    #[error("response does not match the analysis schema: {0}")]
    Schema(String),

    /// The call exceeded the configured deadline.
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
}

impl AnalysisError {
    /// Message safe to show to a patient.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        USER_FACING_FAILURE
    }

    /// Short machine-readable kind for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::EmptyResponse(_) => "empty_response",
            Self::MalformedJson(_) => "malformed_json",
            Self::Schema(_) => "schema",
            Self::Timeout(_) => "timeout",
        }
    }
}
