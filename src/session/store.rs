//! Thread-safe session handles and the in-memory session store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

use super::machine::{AttemptId, Event, Outcome, Phase, SessionMachine, SessionState, TransitionError};
use crate::analysis::{AnalysisError, AnalysisResult};
use crate::upload::{DecodeError, FileSummary, UploadedFile};

/// Default idle timeout (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Snapshot of a session for rendering and the JSON API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session identifier.
    pub id: String,
    /// Current phase.
    pub phase: Phase,
    /// The selected file, without its bytes.
    pub file: Option<FileSummary>,
    /// Present only in `Ready`.
    pub result: Option<AnalysisResult>,
    /// Present only in `Failed`.
    pub error: Option<String>,
    /// One-shot message from the previous request.
    pub notice: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// A single upload-and-analyze session.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    created_at: DateTime<Utc>,
    core: Mutex<SessionCore>,
}

#[derive(Debug)]
struct SessionCore {
    machine: SessionMachine,
    notice: Option<String>,
    task: Option<(AttemptId, AbortHandle)>,
    last_activity: DateTime<Utc>,
}

impl SessionCore {
    fn apply(&mut self, event: Event) -> Result<(), TransitionError> {
        self.last_activity = Utc::now();
        match self.machine.dispatch(event) {
            Outcome::Applied | Outcome::Discarded => Ok(()),
            Outcome::Rejected(err) => Err(err),
        }
    }

    fn abort_task(&mut self) {
        if let Some((attempt, handle)) = self.task.take() {
            tracing::debug!(attempt = %attempt, "Aborting in-flight analysis");
            handle.abort();
        }
    }
}

impl Session {
    /// Create a new session with the given ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(SessionInner {
                id: id.into(),
                created_at: now,
                core: Mutex::new(SessionCore {
                    machine: SessionMachine::new(),
                    notice: None,
                    task: None,
                    last_activity: now,
                }),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.core.lock().machine.state().phase()
    }

    /// Clone of the live state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.core.lock().machine.state().clone()
    }

    /// Snapshot without consuming the pending notice.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let core = self.inner.core.lock();
        self.build_view(&core, core.notice.clone())
    }

    /// Snapshot that consumes the pending notice.
    #[must_use]
    pub fn take_view(&self) -> SessionView {
        let mut core = self.inner.core.lock();
        let notice = core.notice.take();
        self.build_view(&core, notice)
    }

    fn build_view(&self, core: &SessionCore, notice: Option<String>) -> SessionView {
        let state = core.machine.state();
        let (result, error) = match state {
            SessionState::Ready { result, .. } => (Some(result.clone()), None),
            SessionState::Failed { message, .. } => (None, Some(message.clone())),
            _ => (None, None),
        };
        SessionView {
            id: self.inner.id.clone(),
            phase: state.phase(),
            file: state.file().map(UploadedFile::summary),
            result,
            error,
            notice,
            created_at: self.inner.created_at,
        }
    }

    /// Replace the pending notice.
    pub fn notify(&self, message: impl Into<String>) {
        self.inner.core.lock().notice = Some(message.into());
    }

    /// Select a file, replacing any previous selection.
    pub fn select_file(&self, file: UploadedFile) -> Result<(), TransitionError> {
        let mut core = self.inner.core.lock();
        core.apply(Event::SelectFile(file))?;
        core.notice = None;
        Ok(())
    }

    /// Clear the selection after a failed upload and leave a notice.
    pub fn reject_upload(&self, error: &DecodeError) -> Result<(), TransitionError> {
        let mut core = self.inner.core.lock();
        core.apply(Event::UploadRejected)?;
        core.notice = Some(error.user_message().to_string());
        Ok(())
    }

    /// Enter `Analyzing` and hand back what the attempt needs.
    pub fn begin_analysis(&self) -> Result<(AttemptId, UploadedFile), TransitionError> {
        let mut core = self.inner.core.lock();
        core.apply(Event::StartAnalysis)?;
        core.notice = None;
        match core.machine.state() {
            SessionState::Analyzing { file, attempt } => Ok((*attempt, file.clone())),
            _ => unreachable!("StartAnalysis applied without entering Analyzing"),
        }
    }

    /// Remember the task running `attempt` so a reset can abort it.
    ///
    /// If the attempt is no longer live the task is aborted immediately.
    pub fn track_task(&self, attempt: AttemptId, handle: AbortHandle) {
        let mut core = self.inner.core.lock();
        if core.machine.current_attempt() == Some(attempt) {
            core.task = Some((attempt, handle));
        } else {
            handle.abort();
        }
    }

    /// Feed an attempt's outcome back into the machine.
    ///
    /// Failures are reduced to their user-facing message here.
    pub fn finish(
        &self,
        attempt: AttemptId,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> Outcome {
        let event = match outcome {
            Ok(result) => Event::Succeed { attempt, result },
            Err(err) => Event::Fail {
                attempt,
                message: err.user_message().to_string(),
            },
        };

        let mut core = self.inner.core.lock();
        if core.task.as_ref().is_some_and(|(a, _)| *a == attempt) {
            core.task = None;
        }
        core.last_activity = Utc::now();
        core.machine.dispatch(event)
    }

    /// Return to `Idle`, aborting any in-flight attempt.
    pub fn reset(&self) {
        let mut core = self.inner.core.lock();
        core.abort_task();
        core.notice = None;
        // Reset is accepted from every state.
        let _ = core.apply(Event::Reset);
    }

    /// Update the last activity timestamp.
    pub fn touch(&self) {
        self.inner.core.lock().last_activity = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = self.inner.core.lock().last_activity;
        // Negative means clock skew; treat as fresh.
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }

    fn shutdown(&self) {
        self.inner.core.lock().abort_task();
    }
}

/// Thread-safe store for sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug, Default)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session with a random UUID.
    #[must_use]
    pub fn create(&self) -> Session {
        let session = Session::new(Uuid::new_v4().to_string());
        self.inner
            .sessions
            .write()
            .insert(session.id().to_string(), session.clone());
        tracing::debug!(session_id = %session.id(), "Session created");
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner.sessions.read().get(id).cloned()
    }

    /// Remove a session, aborting its in-flight attempt.
    pub fn remove(&self, id: &str) -> Option<Session> {
        let session = self.inner.sessions.write().remove(id)?;
        session.shutdown();
        Some(session)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.inner.sessions.write();
        let before = guard.len();
        guard.retain(|_, session| {
            let expired = session.is_expired_with_timeout(timeout);
            if expired {
                session.shutdown();
            }
            !expired
        });
        before - guard.len()
    }

    /// Periodically drop idle sessions.
    pub fn spawn_janitor(&self, every: Duration, idle_timeout: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.cleanup_expired_with_timeout(idle_timeout);
                if removed > 0 {
                    tracing::info!(
                        name: "session.expired",
                        removed,
                        remaining = store.len(),
                        "Expired idle sessions"
                    );
                }
            }
        })
    }
}
