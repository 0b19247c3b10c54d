//! The validated analysis result.

use serde::{Deserialize, Serialize};

use super::error::AnalysisError;

/// One medical term from the report and its plain-language meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFinding {
    /// The term as written in the report (e.g. "Spina bifida S1").
    pub term: String,
    /// What it means for a non-medical reader.
    pub explanation: String,
}

/// Structured, patient-friendly interpretation of a report.
///
/// Values of this type are always fully valid: every string is non-empty
/// and all four sections are present. Construct it through
/// [`AnalysisResult::from_json`] or [`AnalysisResult::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    summary: String,
    key_findings: Vec<KeyFinding>,
    potential_problems: Vec<String>,
    recommended_actions: Vec<String>,
}

/// Wire shape before validation. Every field is required; no defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    summary: String,
    key_findings: Vec<KeyFinding>,
    potential_problems: Vec<String>,
    recommended_actions: Vec<String>,
}

impl AnalysisResult {
    /// Build a result from parts, applying the same validation as parsing.
    pub fn new(
        summary: impl Into<String>,
        key_findings: Vec<KeyFinding>,
        potential_problems: Vec<String>,
        recommended_actions: Vec<String>,
    ) -> Result<Self, AnalysisError> {
        Self::validate(RawAnalysis {
            summary: summary.into(),
            key_findings,
            potential_problems,
            recommended_actions,
        })
    }

    /// Parse and validate the model's JSON text.
    ///
    /// Incidental surrounding whitespace is trimmed first. Any deviation
    /// from the contract fails the whole result.
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        let value: serde_json::Value = serde_json::from_str(text.trim())?;
        let raw: RawAnalysis =
            serde_json::from_value(value).map_err(|e| AnalysisError::Schema(e.to_string()))?;
        Self::validate(raw)
    }

    fn validate(raw: RawAnalysis) -> Result<Self, AnalysisError> {
        let summary = non_empty(raw.summary, "summary")?;

        let key_findings = raw
            .key_findings
            .into_iter()
            .enumerate()
            .map(|(i, f)| {
                Ok(KeyFinding {
                    term: non_empty(f.term, &format!("keyFindings[{i}].term"))?,
                    explanation: non_empty(f.explanation, &format!("keyFindings[{i}].explanation"))?,
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;

        let potential_problems = non_empty_items(raw.potential_problems, "potentialProblems")?;
        let recommended_actions = non_empty_items(raw.recommended_actions, "recommendedActions")?;

        Ok(Self {
            summary,
            key_findings,
            potential_problems,
            recommended_actions,
        })
    }

    /// One-paragraph overview.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Findings in document order.
    #[must_use]
    pub fn key_findings(&self) -> &[KeyFinding] {
        &self.key_findings
    }

    /// Possible issues, phrased as possibilities.
    #[must_use]
    pub fn potential_problems(&self) -> &[String] {
        &self.potential_problems
    }

    /// Next steps pointing toward a professional.
    #[must_use]
    pub fn recommended_actions(&self) -> &[String] {
        &self.recommended_actions
    }
}

fn non_empty(value: String, field: &str) -> Result<String, AnalysisError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::Schema(format!("{field} is empty")));
    }
    Ok(trimmed.to_string())
}

fn non_empty_items(items: Vec<String>, field: &str) -> Result<Vec<String>, AnalysisError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| non_empty(item, &format!("{field}[{i}]")))
        .collect()
}
