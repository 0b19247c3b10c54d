//! Runs analysis attempts in the background and reports back to the session.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{Instrument, info_span};

use super::machine::{AttemptId, Outcome, TransitionError};
use super::store::Session;
use crate::analysis::ReportAnalyzer;
use crate::upload::{UploadedFile, encode};

/// A launched attempt.
#[derive(Debug)]
pub struct Launch {
    /// Tag of the attempt.
    pub attempt: AttemptId,
    /// Resolves once the outcome has been applied to the session.
    pub handle: JoinHandle<Outcome>,
}

/// Launches analysis attempts on the tokio runtime.
#[derive(Debug, Clone)]
pub struct AnalysisRunner {
    analyzer: Arc<dyn ReportAnalyzer>,
}

impl AnalysisRunner {
    /// Create a runner around an analyzer.
    #[must_use]
    pub fn new(analyzer: Arc<dyn ReportAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Move `session` into `Analyzing` and spawn the call.
    ///
    /// Returns immediately; the session leaves `Analyzing` when the call
    /// completes or the session is reset.
    pub fn start(&self, session: &Session) -> Result<Launch, TransitionError> {
        let (attempt, file) = session.begin_analysis()?;

        let span = info_span!(
            "analysis",
            session_id = %session.id(),
            attempt = %attempt,
            file = %file.name(),
            media_type = %file.media_type(),
            size = file.size(),
        );
        let handle = tokio::spawn(
            run_attempt(Arc::clone(&self.analyzer), session.clone(), attempt, file).instrument(span),
        );
        session.track_task(attempt, handle.abort_handle());

        Ok(Launch { attempt, handle })
    }
}

async fn run_attempt(
    analyzer: Arc<dyn ReportAnalyzer>,
    session: Session,
    attempt: AttemptId,
    file: UploadedFile,
) -> Outcome {
    let payload = encode(&file);
    drop(file);

    let started = Instant::now();
    let outcome = analyzer.analyze(&payload).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &outcome {
        Ok(result) => tracing::info!(
            name: "analysis.succeeded",
            elapsed_ms,
            key_findings = result.key_findings().len(),
            "Analysis completed"
        ),
        Err(err) => tracing::error!(
            name: "analysis.failed",
            elapsed_ms,
            kind = err.kind(),
            error = %err,
            "Analysis failed"
        ),
    }

    let applied = session.finish(attempt, outcome);
    if applied == Outcome::Discarded {
        tracing::debug!("Session moved on; outcome dropped");
    }
    applied
}
