//! Instruction prompt and structured-output schema sent with every request.
//!
//! The schema is declared here independently of [`AnalysisResult`]; the
//! tests below keep the two in step field-for-field.
//!
//! [`AnalysisResult`]: super::AnalysisResult

use serde_json::{Value, json};

/// Fixed instruction text sent alongside the report.
///
/// The phrasing rules (possibilities not diagnoses, every action pointing to
/// a qualified professional) are a safety requirement.
pub const ANALYSIS_PROMPT: &str = "\
Analyze the provided medical report. Your role is to act as a helpful AI assistant that simplifies complex medical information for a patient.
Follow these instructions carefully:
1. Extract all key medical findings mentioned in the report.
2. For each finding, provide a simple, easy-to-understand explanation. Avoid overly technical jargon.
3. Based on the collective findings, list potential problems or symptoms a person might experience. Frame these as possibilities, not certainties or diagnoses.
4. Suggest general next steps a patient could take. Every suggestion must point towards consulting a qualified healthcare professional. Do not provide any medical advice or diagnosis.
5. Return the entire analysis in the specified JSON format.";

/// Names of the top-level fields, in declaration order.
pub const REQUIRED_FIELDS: [&str; 4] = [
    "summary",
    "keyFindings",
    "potentialProblems",
    "recommendedActions",
];

/// The `responseSchema` declared to the inference service.
#[must_use]
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "A brief, one-paragraph overview of the report's main points in simple, patient-friendly terms."
            },
            "keyFindings": {
                "type": "ARRAY",
                "description": "A list of key medical findings extracted from the report, in the order they appear.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "term": {
                            "type": "STRING",
                            "description": "The medical term or finding from the report (e.g., 'Spina bifida S1')."
                        },
                        "explanation": {
                            "type": "STRING",
                            "description": "A simple, easy-to-understand explanation of what the term means for a non-medical person."
                        }
                    },
                    "required": ["term", "explanation"],
                    "propertyOrdering": ["term", "explanation"]
                }
            },
            "potentialProblems": {
                "type": "ARRAY",
                "description": "Potential health issues suggested by the findings, phrased as possibilities rather than diagnoses. For example, 'May contribute to lower back pain' instead of 'You have lower back pain'.",
                "items": { "type": "STRING" }
            },
            "recommendedActions": {
                "type": "ARRAY",
                "description": "General, non-prescriptive next steps that point the patient toward a qualified healthcare professional, for instance 'Discuss these findings with your referring doctor or an orthopedic specialist.'",
                "items": { "type": "STRING" }
            }
        },
        "required": REQUIRED_FIELDS,
        "propertyOrdering": REQUIRED_FIELDS
    })
}
