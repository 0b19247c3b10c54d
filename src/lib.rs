//! Report Lens
//!
//! Upload a medical report (image or PDF), have it interpreted by a
//! generative model under a strict output schema, and read the result in
//! plain language.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server with server-rendered pages and a JSON API
//! - **Analysis**: schema-constrained Gemini client behind a trait seam
//! - **Sessions**: explicit state machine per session, in memory only
//! - **UI**: plain HTML forms, redirects, and a meta refresh while analyzing
//!
//! # Modules
//!
//! - [`upload`]: ingestion, media types, base64 transport encoding
//! - [`analysis`]: prompt, response schema, client, validated result
//! - [`session`]: lifecycle state machine, store, background runner
//! - [`ui`]: HTML rendering and form handlers
//! - [`api`]: JSON handlers
//! - [`config`]: layered configuration and credential loading

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod analysis;
pub mod api;
pub mod config;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod ui;
pub mod upload;

use std::sync::Arc;

use crate::analysis::ReportAnalyzer;
use crate::config::AppConfig;
use crate::rate_limit::SimpleRateLimiter;
use crate::session::{AnalysisRunner, Session, SessionStore};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live sessions.
    pub sessions: SessionStore,
    /// Launches analysis attempts.
    pub runner: AnalysisRunner,
    /// Global Rate Limiter
    pub rate_limiter: Arc<SimpleRateLimiter>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire up state around an analyzer.
    pub fn new(config: Arc<AppConfig>, analyzer: Arc<dyn ReportAnalyzer>) -> Self {
        let rate_limiter = Arc::new(SimpleRateLimiter::new(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        ));
        Self {
            sessions: SessionStore::new(),
            runner: AnalysisRunner::new(analyzer),
            rate_limiter,
            config,
        }
    }

    /// Look up a session and mark it active.
    #[must_use]
    pub fn session(&self, id: &str) -> Option<Session> {
        let session = self.sessions.get(id)?;
        session.touch();
        Some(session)
    }
}
