//! The session lifecycle as a pure finite-state machine.
//!
//! ```text
//! Idle ──select──▶ FileSelected ──start──▶ Analyzing ──succeed──▶ Ready
//!                      ▲  │                    │
//!                      └──┘ select             └──fail──▶ Failed ──start──▶ Analyzing
//!
//! any ──reset──▶ Idle
//! ```
//!
//! [`SessionMachine::dispatch`] is total: every (state, event) pair either
//! transitions, stays put with a [`TransitionError`], or is discarded as a
//! stale analysis outcome.

use serde::Serialize;

use crate::analysis::AnalysisResult;
use crate::upload::UploadedFile;

/// Identifies one analysis attempt within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AttemptId(u64);

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The live state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing selected.
    #[default]
    Idle,
    /// A file is waiting to be analyzed.
    FileSelected(UploadedFile),
    /// An analysis call is in flight.
    Analyzing {
        /// The file being analyzed.
        file: UploadedFile,
        /// Tag of the in-flight attempt.
        attempt: AttemptId,
    },
    /// The analysis finished.
    Ready {
        /// The analyzed file.
        file: UploadedFile,
        /// Validated result.
        result: AnalysisResult,
    },
    /// The analysis failed; the file is kept for a retry.
    Failed {
        /// The file that failed.
        file: UploadedFile,
        /// User-facing message.
        message: String,
    },
}

/// Stable names used by views and the JSON API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    FileSelected,
    Analyzing,
    Ready,
    Failed,
}

impl SessionState {
    /// The phase of this state.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::FileSelected(_) => Phase::FileSelected,
            Self::Analyzing { .. } => Phase::Analyzing,
            Self::Ready { .. } => Phase::Ready,
            Self::Failed { .. } => Phase::Failed,
        }
    }

    /// The file held by this state, if any.
    #[must_use]
    pub fn file(&self) -> Option<&UploadedFile> {
        match self {
            Self::Idle => None,
            Self::FileSelected(file)
            | Self::Analyzing { file, .. }
            | Self::Ready { file, .. }
            | Self::Failed { file, .. } => Some(file),
        }
    }
}

/// Inputs to the machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// The user chose a file.
    SelectFile(UploadedFile),
    /// The chosen file could not be read; clear the selection.
    UploadRejected,
    /// The user asked for an analysis.
    StartAnalysis,
    /// An attempt finished successfully.
    Succeed {
        /// Attempt the result belongs to.
        attempt: AttemptId,
        /// Validated result.
        result: AnalysisResult,
    },
    /// An attempt failed.
    Fail {
        /// Attempt the failure belongs to.
        attempt: AttemptId,
        /// User-facing message.
        message: String,
    },
    /// Return to `Idle`.
    Reset,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Self::SelectFile(_) => "select_file",
            Self::UploadRejected => "upload_rejected",
            Self::StartAnalysis => "start_analysis",
            Self::Succeed { .. } => "succeed",
            Self::Fail { .. } => "fail",
            Self::Reset => "reset",
        }
    }
}

/// Caller errors: the event is not valid in the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// `StartAnalysis` with nothing selected.
    #[error("Please upload a file first.")]
    NoFile,

    /// Anything but `Reset` while an attempt is in flight.
    #[error("An analysis is already in progress. Please wait or start over.")]
    AnalysisInProgress,

    /// `StartAnalysis` after a result was produced.
    #[error("This report has already been analyzed. Start over to analyze another.")]
    AlreadyAnalyzed,
}

impl TransitionError {
    /// Stable code for API clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoFile => "no_file",
            Self::AnalysisInProgress => "analysis_in_progress",
            Self::AlreadyAnalyzed => "already_analyzed",
        }
    }
}

/// What `dispatch` did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The state changed (or was re-entered, e.g. reset from `Idle`).
    Applied,
    /// An analysis outcome for an attempt that is no longer live.
    Discarded,
    /// The event is invalid here; the state is unchanged.
    Rejected(TransitionError),
}

/// Holds the live state and hands out attempt identifiers.
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
    last_attempt: u64,
}

impl SessionMachine {
    /// A machine in `Idle`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The in-flight attempt, if analyzing.
    #[must_use]
    pub fn current_attempt(&self) -> Option<AttemptId> {
        match self.state {
            SessionState::Analyzing { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    /// Apply one event.
    pub fn dispatch(&mut self, event: Event) -> Outcome {
        let event_name = event.name();
        let from = self.state.phase();
        let state = std::mem::take(&mut self.state);

        let (next, outcome) = self.step(state, event);
        self.state = next;

        match &outcome {
            Outcome::Applied => tracing::debug!(
                event = event_name,
                from = ?from,
                to = ?self.state.phase(),
                "Session transition"
            ),
            Outcome::Discarded => tracing::debug!(
                event = event_name,
                state = ?from,
                "Discarded stale analysis outcome"
            ),
            Outcome::Rejected(err) => tracing::debug!(
                event = event_name,
                state = ?from,
                reason = %err,
                "Rejected session event"
            ),
        }
        outcome
    }

    fn step(&mut self, state: SessionState, event: Event) -> (SessionState, Outcome) {
        use SessionState as S;

        match (state, event) {
            (_, Event::Reset) => (S::Idle, Outcome::Applied),

            // Nothing but reset is accepted while an attempt is in flight.
            (S::Analyzing { file, attempt }, Event::Succeed { attempt: a, result }) if a == attempt => {
                (S::Ready { file, result }, Outcome::Applied)
            }
            (S::Analyzing { file, attempt }, Event::Fail { attempt: a, message }) if a == attempt => {
                (S::Failed { file, message }, Outcome::Applied)
            }
            (state, Event::Succeed { .. } | Event::Fail { .. }) => (state, Outcome::Discarded),
            (state @ S::Analyzing { .. }, _) => (
                state,
                Outcome::Rejected(TransitionError::AnalysisInProgress),
            ),

            (_, Event::SelectFile(file)) => (S::FileSelected(file), Outcome::Applied),
            (_, Event::UploadRejected) => (S::Idle, Outcome::Applied),

            (S::FileSelected(file) | S::Failed { file, .. }, Event::StartAnalysis) => {
                let attempt = self.next_attempt();
                (S::Analyzing { file, attempt }, Outcome::Applied)
            }
            (S::Idle, Event::StartAnalysis) => (S::Idle, Outcome::Rejected(TransitionError::NoFile)),
            (state @ S::Ready { .. }, Event::StartAnalysis) => (
                state,
                Outcome::Rejected(TransitionError::AlreadyAnalyzed),
            ),
        }
    }

    fn next_attempt(&mut self) -> AttemptId {
        self.last_attempt += 1;
        AttemptId(self.last_attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::MediaType;

    fn report() -> UploadedFile {
        UploadedFile::new("report.pdf", MediaType::Pdf, vec![0u8; 2 * 1024 * 1024])
    }

    fn other() -> UploadedFile {
        UploadedFile::new("scan.png", MediaType::Png, vec![1, 2, 3])
    }

    fn result() -> AnalysisResult {
        AnalysisResult::new(
            "A short summary.",
            vec![crate::analysis::KeyFinding {
                term: "Spina bifida S1".into(),
                explanation: "A small gap in a lower spine bone.".into(),
            }],
            vec!["May contribute to lower back pain".into()],
            vec!["Discuss with your doctor".into()],
        )
        .unwrap()
    }

    fn analyzing() -> (SessionMachine, AttemptId) {
        let mut m = SessionMachine::new();
        m.dispatch(Event::SelectFile(report()));
        assert_eq!(m.dispatch(Event::StartAnalysis), Outcome::Applied);
        let attempt = m.current_attempt().unwrap();
        (m, attempt)
    }

    #[test]
    fn test_happy_path() {
        let (mut m, attempt) = analyzing();
        assert_eq!(
            m.dispatch(Event::Succeed {
                attempt,
                result: result()
            }),
            Outcome::Applied
        );
        match m.state() {
            SessionState::Ready { file, result } => {
                assert_eq!(file.name(), "report.pdf");
                assert_eq!(result.key_findings().len(), 1);
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_failure_then_reselect() {
        let (mut m, attempt) = analyzing();
        m.dispatch(Event::Fail {
            attempt,
            message: "try again".into(),
        });
        assert!(matches!(
            m.state(),
            SessionState::Failed { file, message } if file.name() == "report.pdf" && message == "try again"
        ));

        assert_eq!(m.dispatch(Event::SelectFile(other())), Outcome::Applied);
        assert_eq!(m.state(), &SessionState::FileSelected(other()));
    }

    #[test]
    fn test_retry_from_failed_uses_new_attempt() {
        let (mut m, first) = analyzing();
        m.dispatch(Event::Fail {
            attempt: first,
            message: "x".into(),
        });
        assert_eq!(m.dispatch(Event::StartAnalysis), Outcome::Applied);
        let second = m.current_attempt().unwrap();
        assert!(second > first);
        assert_eq!(m.state().file().unwrap().name(), "report.pdf");
    }

    #[test]
    fn test_start_without_file_is_rejected() {
        let mut m = SessionMachine::new();
        assert_eq!(
            m.dispatch(Event::StartAnalysis),
            Outcome::Rejected(TransitionError::NoFile)
        );
        assert_eq!(m.state(), &SessionState::Idle);
        assert_eq!(TransitionError::NoFile.to_string(), "Please upload a file first.");
    }

    #[test]
    fn test_single_in_flight() {
        let (mut m, attempt) = analyzing();
        assert_eq!(
            m.dispatch(Event::StartAnalysis),
            Outcome::Rejected(TransitionError::AnalysisInProgress)
        );
        assert_eq!(
            m.dispatch(Event::SelectFile(other())),
            Outcome::Rejected(TransitionError::AnalysisInProgress)
        );
        assert_eq!(
            m.dispatch(Event::UploadRejected),
            Outcome::Rejected(TransitionError::AnalysisInProgress)
        );
        assert_eq!(m.current_attempt(), Some(attempt));
    }

    #[test]
    fn test_reset_discards_late_success() {
        let (mut m, attempt) = analyzing();
        assert_eq!(m.dispatch(Event::Reset), Outcome::Applied);
        assert_eq!(
            m.dispatch(Event::Succeed {
                attempt,
                result: result()
            }),
            Outcome::Discarded
        );
        assert_eq!(m.state(), &SessionState::Idle);
    }

    #[test]
    fn test_stale_attempt_ignored_after_restart() {
        let (mut m, stale) = analyzing();
        m.dispatch(Event::Reset);
        m.dispatch(Event::SelectFile(other()));
        m.dispatch(Event::StartAnalysis);
        let live = m.current_attempt().unwrap();
        assert_ne!(stale, live);

        assert_eq!(
            m.dispatch(Event::Fail {
                attempt: stale,
                message: "late".into()
            }),
            Outcome::Discarded
        );
        assert_eq!(m.current_attempt(), Some(live));
    }

    #[test]
    fn test_reset_from_ready_leaves_nothing() {
        let (mut m, attempt) = analyzing();
        m.dispatch(Event::Succeed {
            attempt,
            result: result(),
        });
        m.dispatch(Event::Reset);
        assert_eq!(m.state(), &SessionState::Idle);
        assert!(m.state().file().is_none());
    }

    #[test]
    fn test_upload_rejected_clears_selection() {
        let mut m = SessionMachine::new();
        m.dispatch(Event::SelectFile(report()));
        assert_eq!(m.dispatch(Event::UploadRejected), Outcome::Applied);
        assert_eq!(m.state(), &SessionState::Idle);
    }

    #[test]
    fn test_ready_rejects_start() {
        let (mut m, attempt) = analyzing();
        m.dispatch(Event::Succeed {
            attempt,
            result: result(),
        });
        assert_eq!(
            m.dispatch(Event::StartAnalysis),
            Outcome::Rejected(TransitionError::AlreadyAnalyzed)
        );
        assert_eq!(m.state().phase(), Phase::Ready);
    }

    /// Every (state, event) pair resolves without panicking and only the
    /// documented transitions change the phase.
    #[test]
    fn test_totality() {
        fn in_phase(phase: Phase) -> SessionMachine {
            let mut m = SessionMachine::new();
            match phase {
                Phase::Idle => {}
                Phase::FileSelected => {
                    m.dispatch(Event::SelectFile(report()));
                }
                Phase::Analyzing => {
                    m.dispatch(Event::SelectFile(report()));
                    m.dispatch(Event::StartAnalysis);
                }
                Phase::Ready | Phase::Failed => {
                    m.dispatch(Event::SelectFile(report()));
                    m.dispatch(Event::StartAnalysis);
                    let attempt = m.current_attempt().unwrap();
                    if phase == Phase::Ready {
                        m.dispatch(Event::Succeed {
                            attempt,
                            result: result(),
                        });
                    } else {
                        m.dispatch(Event::Fail {
                            attempt,
                            message: "x".into(),
                        });
                    }
                }
            }
            assert_eq!(m.state().phase(), phase);
            m
        }

        let phases = [
            Phase::Idle,
            Phase::FileSelected,
            Phase::Analyzing,
            Phase::Ready,
            Phase::Failed,
        ];

        for phase in phases {
            let events = |m: &SessionMachine| {
                let live = m.current_attempt().unwrap_or(AttemptId(1));
                vec![
                    Event::SelectFile(other()),
                    Event::UploadRejected,
                    Event::StartAnalysis,
                    Event::Succeed {
                        attempt: live,
                        result: result(),
                    },
                    Event::Succeed {
                        attempt: AttemptId(999),
                        result: result(),
                    },
                    Event::Fail {
                        attempt: live,
                        message: "x".into(),
                    },
                    Event::Fail {
                        attempt: AttemptId(999),
                        message: "x".into(),
                    },
                    Event::Reset,
                ]
            };

            let count = events(&in_phase(phase)).len();
            for i in 0..count {
                let mut m = in_phase(phase);
                let event = events(&m).swap_remove(i);
                let name = event.name();
                let outcome = m.dispatch(event);
                let to = m.state().phase();

                let expected = match (phase, name) {
                    (_, "reset") => Some(Phase::Idle),
                    (Phase::Analyzing, "succeed") if i == 3 => Some(Phase::Ready),
                    (Phase::Analyzing, "fail") if i == 5 => Some(Phase::Failed),
                    (Phase::Analyzing, _) => None,
                    (_, "select_file") => Some(Phase::FileSelected),
                    (_, "upload_rejected") => Some(Phase::Idle),
                    (Phase::FileSelected | Phase::Failed, "start_analysis") => {
                        Some(Phase::Analyzing)
                    }
                    _ => None,
                };

                match expected {
                    Some(p) => {
                        assert_eq!(outcome, Outcome::Applied, "{phase:?} + {name}");
                        assert_eq!(to, p, "{phase:?} + {name}");
                    }
                    None => {
                        assert_ne!(outcome, Outcome::Applied, "{phase:?} + {name}");
                        assert_eq!(to, phase, "{phase:?} + {name}");
                    }
                }
            }
        }
    }
}
