//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use report_lens::AppState;
use report_lens::analysis::{AnalysisError, AnalysisResult, KeyFinding, ReportAnalyzer};
use report_lens::config::{
    AnalysisConfig, AppConfig, ResilienceConfig, ServerConfig, SessionConfig, UploadConfig,
};
use report_lens::server::build_router;
use report_lens::upload::EncodedPayload;
use tokio::sync::Notify;

pub const PDF: &[u8] = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".into(),
        },
        upload: UploadConfig {
            max_bytes: 64 * 1024,
            verify_content_type: true,
        },
        analysis: AnalysisConfig {
            base_url: "http://127.0.0.1:9".into(),
            model: "test-model".into(),
            timeout_secs: 0,
        },
        resilience: ResilienceConfig {
            rate_limit_enabled: false,
            timeout_disabled: false,
            requests_per_second: 5.0,
            burst_size: 10.0,
            request_timeout_secs: 30,
        },
        session: SessionConfig {
            idle_timeout_secs: 1800,
            sweep_interval_secs: 60,
        },
    }
}

pub fn one_finding() -> AnalysisResult {
    AnalysisResult::new(
        "The report describes a small, common variation in the lower spine.",
        vec![KeyFinding {
            term: "Spina bifida S1".into(),
            explanation: "A small gap in one of the bones at the base of the spine.".into(),
        }],
        vec!["May contribute to lower back pain".into()],
        vec!["Discuss with your doctor".into()],
    )
    .unwrap()
}

/// Analyzer with a scripted outcome and an optional gate.
#[derive(Debug)]
pub struct FakeAnalyzer {
    pub fail: bool,
    pub gate: Option<Arc<Notify>>,
}

impl FakeAnalyzer {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            gate: None,
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            fail: false,
            gate: Some(gate),
        }
    }
}

#[async_trait::async_trait]
impl ReportAnalyzer for FakeAnalyzer {
    async fn analyze(&self, _payload: &EncodedPayload) -> Result<AnalysisResult, AnalysisError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(AnalysisError::Status {
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok(one_finding())
    }
}

pub fn server_with(config: AppConfig, analyzer: FakeAnalyzer) -> TestServer {
    let state = AppState::new(Arc::new(config), Arc::new(analyzer));
    TestServer::new(build_router(state)).unwrap()
}

pub fn server(analyzer: FakeAnalyzer) -> TestServer {
    server_with(test_config(), analyzer)
}

pub fn file_form(name: &str, mime: &str, bytes: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes.to_vec()).file_name(name).mime_type(mime),
    )
}

/// Poll the JSON view until it leaves `analyzing`.
pub async fn wait_until_settled(server: &TestServer, id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let view = server
            .get(&format!("/api/sessions/{id}"))
            .await
            .json::<serde_json::Value>();
        if view["phase"] != "analyzing" {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session {id} never left analyzing");
}
