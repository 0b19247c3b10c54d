//! JSON API over the same session operations as the HTML flow.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use crate::AppState;
use crate::session::{Session, SessionView, TransitionError};
use crate::upload::{DecodeError, read_report};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Diagnostic detail, when safe to expose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn not_found(id: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: format!("Session {id} not found"),
            code: "session_not_found",
            detail: None,
        }),
    )
}

fn conflict(err: &TransitionError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::CONFLICT,
        Json(ApiError {
            error: err.to_string(),
            code: err.code(),
            detail: None,
        }),
    )
}

fn unreadable(err: &DecodeError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiError {
            error: err.user_message().to_string(),
            code: "unreadable_file",
            detail: Some(err.to_string()),
        }),
    )
}

fn lookup(state: &AppState, id: &str) -> ApiResult<Session> {
    state.session(id).ok_or_else(|| not_found(id))
}

/// JSON routes, mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/file", post(upload_file))
        .route("/sessions/{id}/analyze", post(start_analysis))
        .route("/sessions/{id}/reset", post(reset_session))
}

/// POST /api/sessions
async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let session = state.sessions.create();
    (StatusCode::CREATED, Json(session.view()))
}

/// GET /api/sessions/{id}
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(lookup(&state, &id)?.view()))
}

/// DELETE /api/sessions/{id}
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .sessions
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| not_found(&id))
}

/// POST /api/sessions/{id}/file
async fn upload_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<SessionView>> {
    let session = lookup(&state, &id)?;

    match read_report(&mut multipart, state.config.upload_limits()).await {
        Ok(file) => {
            tracing::info!(
                name: "upload.accepted",
                session_id = %id,
                file = %file.name(),
                media_type = %file.media_type(),
                size = file.size(),
                "Report uploaded"
            );
            session.select_file(file).map_err(|e| conflict(&e))?;
            Ok(Json(session.view()))
        }
        Err(err) => {
            tracing::warn!(name: "upload.rejected", session_id = %id, error = %err, "Upload rejected");
            session.reject_upload(&err).map_err(|e| conflict(&e))?;
            Err(unreadable(&err))
        }
    }
}

/// POST /api/sessions/{id}/analyze
async fn start_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let session = lookup(&state, &id)?;
    state.runner.start(&session).map_err(|e| conflict(&e))?;
    Ok((StatusCode::ACCEPTED, Json(session.view())))
}

/// POST /api/sessions/{id}/reset
async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let session = lookup(&state, &id)?;
    session.reset();
    Ok(Json(session.view()))
}
