//! Report analysis against an external inference service.
//!
//! The [`ReportAnalyzer`] trait is the single seam between the session
//! lifecycle and the model. [`GeminiClient`] is the production
//! implementation; [`WithTimeout`] layers a deadline over any analyzer
//! without changing the contract.
//!
//! # Contract
//!
//! - One outbound request per call, no internal retry.
//! - The request declares a strict output schema ([`schema::response_schema`]).
//! - The response is re-validated on receipt; any deviation is an
//!   [`AnalysisError`] and no partial [`AnalysisResult`] escapes.

pub mod error;
pub mod gemini;
pub mod result;
pub mod schema;

pub use error::{AnalysisError, USER_FACING_FAILURE};
pub use gemini::GeminiClient;
pub use result::{AnalysisResult, KeyFinding};

use std::time::Duration;

use crate::upload::EncodedPayload;

/// Public Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Connection settings for the inference service.
#[derive(Clone)]
pub struct GeminiSettings {
    api_key: String,
    /// Base URL, without the `/v1beta` path.
    pub base_url: String,
    /// Model identifier (e.g. `gemini-2.5-flash`).
    pub model: String,
}

impl GeminiSettings {
    /// Create settings from explicit values.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// The API credential.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Turns an encoded report into a validated analysis.
#[async_trait::async_trait]
pub trait ReportAnalyzer: Send + Sync + std::fmt::Debug {
    /// Analyze one report.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalysisError`] on network failure, non-success
    /// responses, malformed JSON, or JSON that breaks the result contract.
    async fn analyze(&self, payload: &EncodedPayload) -> Result<AnalysisResult, AnalysisError>;
}

/// Applies a deadline to an inner analyzer.
#[derive(Debug, Clone)]
pub struct WithTimeout<A> {
    inner: A,
    limit: Duration,
}

impl<A> WithTimeout<A> {
    /// Wrap `inner` so each call fails after `limit`.
    pub fn new(inner: A, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait::async_trait]
impl<A: ReportAnalyzer> ReportAnalyzer for WithTimeout<A> {
    async fn analyze(&self, payload: &EncodedPayload) -> Result<AnalysisResult, AnalysisError> {
        tokio::time::timeout(self.limit, self.inner.analyze(payload))
            .await
            .unwrap_or(Err(AnalysisError::Timeout(self.limit)))
    }
}
