//! Server-rendered HTML pages.
//!
//! The browser flow is plain forms and redirects: every POST applies one
//! session event and answers `303 See Other` back to the session page, which
//! re-renders from the current state. Caller errors become a one-shot notice
//! on the next render.
//!
//! # Structure
//!
//! - [`page`]: document shell and escaping
//! - [`views`]: session state to HTML

pub mod page;
pub mod views;

use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::{info, warn};

use crate::AppState;
use crate::session::Phase;
use crate::upload::read_report;
use page::html_shell;
use views::{REFRESH_SECS, session_page};

/// HTML routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/sessions/{id}", get(session_handler))
        .route("/sessions/{id}/preview", get(preview_handler))
        .route("/sessions/{id}/file", post(upload_handler))
        .route("/sessions/{id}/analyze", post(analyze_handler))
        .route("/sessions/{id}/reset", post(reset_handler))
}

fn session_url(id: &str) -> String {
    format!("/sessions/{id}")
}

fn not_found_page() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(html_shell(
            "Session not found",
            r#"<div class="card"><p>This session has expired or does not exist.</p><p><a href="/">Start a new analysis</a></p></div>"#,
            None,
        )),
    )
        .into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - start a fresh session.
async fn index_handler(State(state): State<AppState>) -> Redirect {
    let session = state.sessions.create();
    Redirect::to(&session_url(session.id()))
}

/// GET /sessions/{id} - render the session.
async fn session_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(session) = state.session(&id) else {
        return not_found_page();
    };

    let view = session.take_view();
    let refresh = (view.phase == Phase::Analyzing).then_some(REFRESH_SECS);
    let title = match view.phase {
        Phase::Ready => "Analysis Results",
        Phase::Analyzing => "Analyzing",
        _ => "Upload Report",
    };

    Html(html_shell(
        title,
        &session_page(&view, state.config.upload.max_bytes),
        refresh,
    ))
    .into_response()
}

/// GET /sessions/{id}/preview - the selected file's bytes.
async fn preview_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(session) = state.session(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let session_state = session.state();
    let Some(file) = session_state.file() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    (
        [
            (header::CONTENT_TYPE, file.media_type().as_mime()),
            (header::CACHE_CONTROL, "no-store"),
        ],
        file.content(),
    )
        .into_response()
}

/// POST /sessions/{id}/file - select a file.
async fn upload_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let Some(session) = state.session(&id) else {
        return not_found_page();
    };

    match read_report(&mut multipart, state.config.upload_limits()).await {
        Ok(file) => {
            info!(
                name: "upload.accepted",
                session_id = %id,
                file = %file.name(),
                media_type = %file.media_type(),
                size = file.size(),
                "Report uploaded"
            );
            if let Err(err) = session.select_file(file) {
                session.notify(err.to_string());
            }
        }
        Err(err) => {
            warn!(name: "upload.rejected", session_id = %id, error = %err, "Upload rejected");
            if let Err(transition) = session.reject_upload(&err) {
                session.notify(transition.to_string());
            }
        }
    }

    Redirect::to(&session_url(&id)).into_response()
}

/// POST /sessions/{id}/analyze - start an analysis.
async fn analyze_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(session) = state.session(&id) else {
        return not_found_page();
    };

    if let Err(err) = state.runner.start(&session) {
        session.notify(err.to_string());
    }
    Redirect::to(&session_url(&id)).into_response()
}

/// POST /sessions/{id}/reset - back to the upload step.
async fn reset_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(session) = state.session(&id) else {
        return not_found_page();
    };

    session.reset();
    Redirect::to(&session_url(&id)).into_response()
}
