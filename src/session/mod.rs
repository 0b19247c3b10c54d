//! Session lifecycle and storage.
//!
//! Each browser session owns one report at a time and walks it through
//! upload, analysis, and display.
//!
//! # Architecture
//!
//! - [`SessionMachine`]: pure state machine over [`SessionState`] and [`Event`]
//! - [`Session`]: thread-safe handle wrapping one machine
//! - [`SessionStore`]: all live sessions, with idle expiry
//! - [`AnalysisRunner`]: spawns analysis attempts and feeds outcomes back
//!
//! # Example
//!
//! ```rust
//! use report_lens::session::{Phase, SessionStore};
//! use report_lens::upload::{MediaType, UploadedFile};
//!
//! let store = SessionStore::new();
//! let session = store.create();
//! session
//!     .select_file(UploadedFile::new("scan.png", MediaType::Png, vec![0x89, b'P']))
//!     .unwrap();
//! assert_eq!(session.phase(), Phase::FileSelected);
//!
//! session.reset();
//! assert_eq!(session.phase(), Phase::Idle);
//! ```

mod machine;
mod runner;
mod store;

pub use machine::{
    AttemptId, Event, Outcome, Phase, SessionMachine, SessionState, TransitionError,
};
pub use runner::{AnalysisRunner, Launch};
pub use store::{DEFAULT_SESSION_TIMEOUT, Session, SessionStore, SessionView};
