//! Gemini `generateContent` client.
//!
//! Sends the report as an inline attachment together with
//! [`ANALYSIS_PROMPT`] and a `responseSchema`, then validates the returned
//! JSON into an [`AnalysisResult`].

use serde::{Deserialize, Serialize};

use super::error::AnalysisError;
use super::result::AnalysisResult;
use super::schema::{ANALYSIS_PROMPT, response_schema};
use super::{GeminiSettings, ReportAnalyzer};
use crate::upload::EncodedPayload;

/// Longest slice of an error body kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 512;

/// Gemini content container used in both requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Untagged union of inline media and text parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    /// Anything else the service may return (function calls, thoughts).
    Other(serde_json::Value),
}

/// Base64 inline payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Structured-output settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

/// Top-level `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Request for one report: attachment first, then the instructions.
    #[must_use]
    pub fn for_report(payload: &EncodedPayload) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: payload.media_type().to_string(),
                            data: payload.data().to_string(),
                        },
                    },
                    Part::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        }
    }
}

/// Top-level `generateContent` response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// Candidate completion item.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Present when the prompt itself was blocked.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Result<String, AnalysisError> {
        let Some(candidate) = self.candidates.first() else {
            let reason = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(AnalysisError::EmptyResponse(reason));
        };

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| &c.parts)
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if text.trim().is_empty() {
            let reason = candidate
                .finish_reason
                .clone()
                .unwrap_or_else(|| "empty candidate".to_string());
            return Err(AnalysisError::EmptyResponse(reason));
        }
        Ok(text)
    }
}

/// [`ReportAnalyzer`] backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("settings", &self.settings)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client with the given settings.
    #[must_use]
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    /// Full `generateContent` URL for the configured model.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait::async_trait]
impl ReportAnalyzer for GeminiClient {
    async fn analyze(&self, payload: &EncodedPayload) -> Result<AnalysisResult, AnalysisError> {
        let url = self.endpoint();
        let body = GenerateContentRequest::for_report(payload);

        tracing::debug!(
            url = %url,
            media_type = %payload.media_type(),
            payload_len = payload.data().len(),
            "Sending generateContent request"
        );

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.settings.api_key())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let envelope: GenerateContentResponse = serde_json::from_str(&text)?;
        let json_text = envelope.text()?;

        AnalysisResult::from_json(&json_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{MediaType, UploadedFile, encode};
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let file = UploadedFile::new("report.pdf", MediaType::Pdf, b"%PDF-1.4".to_vec());
        let body = serde_json::to_value(GenerateContentRequest::for_report(&encode(&file))).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[0]["inlineData"]["data"], "JVBERi0xLjQ=");
        assert_eq!(parts[1]["text"], ANALYSIS_PROMPT);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"], response_schema());
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": " 1}"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(resp.text().unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_blocked_prompt_is_empty_response() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(matches!(resp.text(), Err(AnalysisError::EmptyResponse(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_candidate_without_text() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        assert!(matches!(resp.text(), Err(AnalysisError::EmptyResponse(r)) if r == "MAX_TOKENS"));
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(GeminiSettings::new(
            "key",
            "https://generativelanguage.googleapis.com/",
            "gemini-2.5-flash",
        ));
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = GeminiClient::new(GeminiSettings::new("super-secret", "http://x", "m"));
        assert!(!format!("{client:?}").contains("super-secret"));
    }
}
