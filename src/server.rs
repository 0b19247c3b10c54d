use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::analysis::{ReportAnalyzer, WithTimeout};
use crate::config::AppConfig;
use crate::rate_limit::rate_limit_middleware;

/// Wrap `analyzer` in the configured per-call deadline, if any.
pub fn with_configured_timeout(
    config: &AppConfig,
    analyzer: impl ReportAnalyzer + 'static,
) -> Arc<dyn ReportAnalyzer> {
    match config.analysis_timeout() {
        Some(limit) => Arc::new(WithTimeout::new(analyzer, limit)),
        None => Arc::new(analyzer),
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // A very long deadline stands in for "disabled" so the layer stack keeps one type.
    let timeout_duration = if config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        config.request_timeout()
    };

    Router::new()
        .merge(crate::ui::routes())
        .nest("/api", crate::api::routes())
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(
    config: Arc<AppConfig>,
    analyzer: Arc<dyn ReportAnalyzer>,
) -> anyhow::Result<()> {
    info!(
        name: "analysis.config.loaded",
        base_url = %config.analysis.base_url,
        model = %config.analysis.model,
        timeout_secs = config.analysis.timeout_secs,
        "Analysis configuration loaded"
    );

    let state = AppState::new(Arc::clone(&config), analyzer);

    let janitor = state.sessions.spawn_janitor(
        config.session_sweep_interval(),
        config.session_idle_timeout(),
    );

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        max_upload_bytes = config.upload.max_bytes,
        rate_limit_enabled = config.resilience.rate_limit_enabled,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    janitor.abort();
    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

/// GET /healthz
async fn healthz() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
